//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - Backend selection, see [`chocolatier_backend::config`]
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Data store and auth provider
    pub backend: BackendConfig,
    /// `PostgreSQL` URL for persistent sessions
    pub session_database_url: Option<SecretString>,
    pub sentry: SentryConfig,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if backend secrets fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        Ok(Self {
            host,
            port,
            base_url,
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

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Configuration for tests and local runs against the in-memory backend.
    #[must_use]
    pub fn local(backend: BackendConfig) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            backend,
            session_database_url: None,
            sentry: SentryConfig::disabled(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chocolatier_backend::config::MemoryConfig;

    use super::*;

    #[test]
    fn test_socket_addr() {
        let mut config = StorefrontConfig::local(BackendConfig::Memory(MemoryConfig::default()));
        config.port = 8080;
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_is_secure() {
        let mut config = StorefrontConfig::local(BackendConfig::Memory(MemoryConfig::default()));
        assert!(!config.is_secure());
        config.base_url = "https://shop.chocolatier.test".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_debug_redacts_session_database_url() {
        let mut config = StorefrontConfig::local(BackendConfig::Memory(MemoryConfig::default()));
        config.session_database_url = Some(SecretString::from("postgres://user:hunter2@db/sessions"));
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
