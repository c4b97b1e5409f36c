pub mod fake_identity;

pub use fake_identity::FakeIdentityProvider;

use std::sync::Arc;

use chrono::Utc;
use petcare_common::Session;

use crate::config::{
    AvatarConfig, Config, CorsConfig, DestinationsConfig, IdentityConfig, LoggingConfig,
    OAuthConfig, RetryConfig, SessionConfig,
};
use crate::identity::IdentityProvider;
use crate::AppState;

/// Configuration pointing at the given provider endpoint.
pub fn test_config(endpoint: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8080,
        identity: IdentityConfig {
            endpoint: endpoint.to_string(),
            project_id: "petcare-test".to_string(),
            api_key: "test-api-key".to_string(),
            database_id: "test-db".to_string(),
            profiles_collection: "profiles".to_string(),
            session_cookie: None,
        },
        oauth: OAuthConfig {
            provider: "google".to_string(),
            success_url: "https://app.test/auth/callback".to_string(),
            failure_url: "https://app.test/login".to_string(),
        },
        avatar: AvatarConfig::default(),
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
        },
        session: SessionConfig {
            ttl_secs: 3600,
            secure_cookies: false,
        },
        destinations: DestinationsConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        cors: CorsConfig::default(),
    }
}

pub fn create_test_state(provider: Arc<dyn IdentityProvider>) -> Arc<AppState> {
    Arc::new(AppState::new(test_config("https://baas.test/v1"), provider))
}

pub fn test_session(principal_id: &str, role: &str) -> Session {
    Session {
        principal_id: principal_id.to_string(),
        email: format!("{}@x.com", principal_id),
        name: principal_id.to_string(),
        role: role.to_string(),
        status: vec!["active".to_string()],
        avatar: String::new(),
        created_at: Utc::now(),
    }
}
