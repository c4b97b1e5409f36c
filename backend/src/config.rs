//! Configuration for the sign-in gateway.

use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub identity: IdentityConfig,
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub avatar: AvatarConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub destinations: DestinationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Hosted backend connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// REST endpoint, e.g. "https://cloud.example.io/v1"
    pub endpoint: String,
    pub project_id: String,
    /// Server API key used for document access
    pub api_key: String,
    pub database_id: String,
    #[serde(default = "default_profiles_collection")]
    pub profiles_collection: String,
    /// Name of the provider's session cookie forwarded on session lookup.
    /// Defaults to `a_session_<project_id>` when unset.
    #[serde(default)]
    pub session_cookie: Option<String>,
}

impl IdentityConfig {
    pub fn session_cookie_name(&self) -> String {
        self.session_cookie
            .clone()
            .unwrap_or_else(|| format!("a_session_{}", self.project_id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    #[serde(default = "default_oauth_provider")]
    pub provider: String,
    /// Where the provider sends the browser after a successful login
    pub success_url: String,
    /// Where the provider sends the browser after a failed login
    pub failure_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvatarConfig {
    /// Template for provider-hosted images; `{token}` is replaced
    #[serde(default = "default_provider_image_template")]
    pub provider_image_template: String,
    /// Base URL of the initials-avatar generator. Empty means
    /// `{identity.endpoint}/avatars/initials`.
    #[serde(default)]
    pub initials_url: String,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            provider_image_template: default_provider_image_template(),
            initials_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

/// Gateway session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a published session
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    /// Mark cookies `Secure`. Turn off only for local HTTP.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

/// Landing paths for each routing destination.
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationsConfig {
    #[serde(default = "default_admin_path")]
    pub admin: String,
    #[serde(default = "default_boarding_path")]
    pub boarding: String,
    #[serde(default = "default_dashboard_path")]
    pub dashboard: String,
    #[serde(default = "default_login_path")]
    pub login: String,
    #[serde(default = "default_landing_path")]
    pub landing: String,
}

impl Default for DestinationsConfig {
    fn default() -> Self {
        Self {
            admin: default_admin_path(),
            boarding: default_boarding_path(),
            dashboard: default_dashboard_path(),
            login: default_login_path(),
            landing: default_landing_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of origins, or "*"
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_profiles_collection() -> String {
    "profiles".to_string()
}
fn default_oauth_provider() -> String {
    "google".to_string()
}
fn default_provider_image_template() -> String {
    "https://lh3.googleusercontent.com/a/{token}".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_session_ttl_secs() -> u64 {
    8 * 60 * 60
}
fn default_secure_cookies() -> bool {
    true
}
fn default_admin_path() -> String {
    "/admin".to_string()
}
fn default_boarding_path() -> String {
    "/boarding".to_string()
}
fn default_dashboard_path() -> String {
    "/dashboard".to_string()
}
fn default_login_path() -> String {
    "/login".to_string()
}
fn default_landing_path() -> String {
    "/".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_cors_origins() -> String {
    "*".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (PETCARE__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("host", default_host())?
            .set_default("port", default_port() as i64)?
            .set_default("retry.max_attempts", default_max_attempts() as i64)?
            .set_default("retry.initial_delay_ms", default_initial_delay_ms() as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("PETCARE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Initials-avatar base URL, falling back to the provider endpoint.
    pub fn initials_url(&self) -> String {
        if self.avatar.initials_url.is_empty() {
            format!("{}/avatars/initials", self.identity.endpoint.trim_end_matches('/'))
        } else {
            self.avatar.initials_url.clone()
        }
    }
}
