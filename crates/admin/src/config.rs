//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_BASE_URL` - Public URL for the admin console
//! - Backend selection, see [`chocolatier_backend::config`]
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `SESSION_DATABASE_URL` - `PostgreSQL` session store (default: in-memory)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};

use chocolatier_backend::config::{
    BackendConfig, ConfigError, SentryConfig, get_env_or_default, get_optional_env,
    get_required_env,
};
use secrecy::SecretString;

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin console
    pub base_url: String,
    /// Data store and auth provider
    pub backend: BackendConfig,
    /// `PostgreSQL` URL for persistent sessions (contains password)
    pub session_database_url: Option<SecretString>,
    pub sentry: SentryConfig,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        Ok(Self {
            host,
            port,
            base_url: get_required_env("ADMIN_BASE_URL")?,
            backend: BackendConfig::from_env()?,
            session_database_url: get_optional_env("SESSION_DATABASE_URL").map(SecretString::from),
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the session cookie should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Configuration for tests and local runs against the in-memory backend.
    #[must_use]
    pub fn local(backend: BackendConfig) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            backend,
            session_database_url: None,
            sentry: SentryConfig::disabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chocolatier_backend::config::MemoryConfig;

    use super::*;

    #[test]
    fn test_local_defaults() {
        let config = AdminConfig::local(BackendConfig::Memory(MemoryConfig::default()));
        assert_eq!(config.socket_addr().port(), 3001);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_https_base_url_is_secure() {
        let mut config = AdminConfig::local(BackendConfig::Memory(MemoryConfig::default()));
        config.base_url = "https://admin.chocolatier.test".to_string();
        assert!(config.is_secure());
    }
}
