pub mod avatar;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod profiles;
pub mod retry;
pub mod routes;
pub mod session;
pub mod signin;
pub mod test_util;

pub use config::Config;
pub use identity::{HttpIdentityProvider, IdentityProvider};
pub use retry::RetryPolicy;
pub use session::SessionRegistry;
pub use signin::{Destination, SignInFlow, SignInOutcome};

use std::sync::Arc;

use avatar::AvatarResolver;
use profiles::ProfileStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub provider: Arc<dyn IdentityProvider>,
    pub profiles: ProfileStore,
    /// Sessions published by successful sign-ins.
    pub sessions: Arc<SessionRegistry>,
    pub signin: SignInFlow,
    /// Retry policy for calls made outside the sign-in flow.
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn IdentityProvider>) -> Self {
        let profiles = ProfileStore::new(provider.clone(), &config.identity.profiles_collection);
        let sessions = Arc::new(SessionRegistry::new(config.session.ttl()));
        let retry = RetryPolicy::from(&config.retry);
        let avatars = AvatarResolver::new(&config.avatar.provider_image_template, &config.initials_url());

        let signin = SignInFlow::new(
            provider.clone(),
            profiles.clone(),
            sessions.clone(),
            avatars,
            retry,
            config.oauth.clone(),
        );

        Self {
            config,
            provider,
            profiles,
            sessions,
            signin,
            retry,
        }
    }
}
