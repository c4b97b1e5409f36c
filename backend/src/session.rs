//! In-memory registry of published sessions.
//!
//! Sessions are keyed by an opaque id handed to the browser in a cookie.
//! A principal holds at most one session: publishing replaces the previous
//! one. Sessions older than the configured TTL are treated as gone and are
//! pruned on the next publish. Everything is lost on restart.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use petcare_common::Session;
use tokio::sync::RwLock;

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "petcare_session";

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_expired(&self, session: &Session) -> bool {
        // A creation time in the future yields an error here; keep such sessions.
        Utc::now()
            .signed_duration_since(session.created_at)
            .to_std()
            .map(|age| age >= self.ttl)
            .unwrap_or(false)
    }

    /// Publish a session and return its id. Earlier sessions of the same
    /// principal and expired sessions are dropped.
    pub async fn publish(&self, session: Session) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, s| s.principal_id != session.principal_id && !self.is_expired(s));
        let dropped = before - sessions.len();

        sessions.insert(id.clone(), session);
        tracing::debug!(
            "Published session {} ({} active, {} dropped)",
            id,
            sessions.len(),
            dropped
        );
        id
    }

    /// Look up a live session. An expired session is removed.
    pub async fn get(&self, id: &str) -> Option<Session> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                None => return None,
                Some(session) if !self.is_expired(session) => return Some(session.clone()),
                Some(_) => {}
            }
        }

        if let Some(session) = self.sessions.write().await.remove(id) {
            tracing::debug!("Session of {} expired", session.principal_id);
        }
        None
    }

    /// Remove a session. Returns the removed session, if any.
    pub async fn clear(&self, id: &str) -> Option<Session> {
        let removed = self.sessions.write().await.remove(id);
        if let Some(ref session) = removed {
            tracing::info!("Session cleared for {}", session.principal_id);
        }
        removed
    }

    /// Drop every session of a principal, e.g. after their profile changed.
    /// Returns how many were removed.
    pub async fn revoke_principal(&self, principal_id: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.principal_id != principal_id);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!("Revoked {} session(s) of {}", removed, principal_id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
