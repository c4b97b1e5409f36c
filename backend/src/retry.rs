//! Retry policy for rate-limited remote calls.
//!
//! Only failures reporting [`RateLimited::is_rate_limited`] are retried;
//! any other error is returned after the first attempt. The delay starts
//! at `initial_delay` and doubles after every rate-limited attempt.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

/// Errors that can tell whether they were caused by request throttling.
pub trait RateLimited {
    fn is_rate_limited(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every attempt was rate limited
    #[error("Max retries reached after {attempts} attempts")]
    MaxRetriesReached { attempts: u32 },
    /// The operation failed with an error that is not retried
    #[error(transparent)]
    Failed(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: config.initial_delay(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// Run `operation` until it succeeds, fails with a non-rate-limit
    /// error, or exhausts `max_attempts`.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        E: RateLimited + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempts = 0;
        let mut delay = self.initial_delay;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limited() => {
                    attempts += 1;
                    if attempts >= self.max_attempts {
                        tracing::warn!("Giving up after {} rate-limited attempts: {}", attempts, e);
                        return Err(RetryError::MaxRetriesReached { attempts });
                    }
                    tracing::warn!(
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(RetryError::Failed(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Throttled,
        Broken,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl std::error::Error for TestError {}

    impl RateLimited for TestError {
        fn is_rate_limited(&self) -> bool {
            matches!(self, TestError::Throttled)
        }
    }

    /// Records the instant of every invocation and replays scripted results.
    fn scripted(
        script: Vec<Result<u32, TestError>>,
    ) -> (Arc<Mutex<Vec<Instant>>>, impl FnMut() -> std::future::Ready<Result<u32, TestError>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();
        let mut script = script.into_iter();
        let op = move || {
            recorded.lock().unwrap().push(Instant::now());
            std::future::ready(script.next().unwrap_or(Err(TestError::Throttled)))
        };
        (calls, op)
    }

    fn gaps(calls: &[Instant]) -> Vec<Duration> {
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_rate_limits() {
        let (calls, op) = scripted(vec![
            Err(TestError::Throttled),
            Err(TestError::Throttled),
            Ok(42),
        ]);

        let result = RetryPolicy::default().run(op).await;

        assert_eq!(result.unwrap(), 42);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            gaps(&calls),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_retries_reached() {
        let (calls, op) = scripted(vec![]);

        let result = RetryPolicy::default().run(op).await;

        assert!(matches!(result, Err(RetryError::MaxRetriesReached { attempts: 3 })));
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_rate_limit_error_fails_immediately() {
        let (calls, op) = scripted(vec![Err(TestError::Broken), Ok(1)]);
        let start = Instant::now();

        let result = RetryPolicy::default().run(op).await;

        assert!(matches!(result, Err(RetryError::Failed(TestError::Broken))));
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_try_has_no_delay() {
        let (calls, op) = scripted(vec![Ok(7)]);
        let start = Instant::now();

        assert_eq!(RetryPolicy::default().run(op).await.unwrap(), 7);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy_doubles_delay() {
        let (calls, op) = scripted(vec![]);
        let policy = RetryPolicy::new(4, Duration::from_millis(50));

        let result = policy.run(op).await;

        assert!(matches!(result, Err(RetryError::MaxRetriesReached { attempts: 4 })));
        let calls = calls.lock().unwrap();
        assert_eq!(
            gaps(&calls),
            vec![
                Duration::from_millis(50),
                Duration::from_millis(100),
                Duration::from_millis(200),
            ]
        );
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn test_max_retries_error_is_distinct() {
        let err: RetryError<TestError> = RetryError::MaxRetriesReached { attempts: 3 };
        assert_eq!(err.to_string(), "Max retries reached after 3 attempts");
    }
}
