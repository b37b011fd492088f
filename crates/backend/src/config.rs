//! Backend configuration and shared environment helpers.
//!
//! # Environment Variables
//!
//! - `CHOCOLATIER_BACKEND` - `hosted` (default) or `memory`
//!
//! ## Hosted backend
//! - `BACKEND_URL` - Base URL of the hosted backend (required)
//! - `BACKEND_ANON_KEY` - Public API key sent with every request (required)
//! - `BACKEND_SERVICE_KEY` - Server-side key used for data access (optional)
//! - `BACKEND_CACHE_TTL_SECS` - Catalog cache lifetime (default: 60)
//!
//! ## In-memory backend
//! - `MEMORY_SEED` - Load the demo catalog at startup (default: true)
//! - `MEMORY_ADMIN_EMAIL` / `MEMORY_ADMIN_PASSWORD` - Create an admin account at startup
//!
//! ## Error tracking
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE` (default: 1.0),
//!   `SENTRY_TRACES_SAMPLE_RATE` (default: 0.1)
//!
//! The helpers at the bottom of this module are shared by the storefront and
//! admin configuration loaders.

use std::collections::HashMap;
use std::time::Duration;

use chocolatier_core::Email;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which backend implementation to connect to.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// The hosted relational backend with built-in auth.
    Hosted(HostedConfig),
    /// Process-local placeholder backend.
    Memory(MemoryConfig),
}

/// Hosted backend connection settings.
///
/// Implements `Debug` manually to redact keys.
#[derive(Clone)]
pub struct HostedConfig {
    /// Base URL, always ending in `/`
    pub url: Url,
    /// Public API key
    pub anon_key: SecretString,
    /// Privileged key for server-side data access
    pub service_key: Option<SecretString>,
    /// Lifetime of cached catalog reads
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for HostedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field(
                "service_key",
                &self.service_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl HostedConfig {
    /// Build a config for `url`, normalizing the path to end in `/` so that
    /// relative API paths join beneath it.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` cannot be parsed.
    pub fn new(url: &str, anon_key: SecretString) -> Result<Self, url::ParseError> {
        let mut url = Url::parse(url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            url,
            anon_key,
            service_key: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        })
    }

    /// Key used for table access: the service key when configured.
    #[must_use]
    pub fn data_key(&self) -> &str {
        self.service_key
            .as_ref()
            .unwrap_or(&self.anon_key)
            .expose_secret()
    }
}

/// In-memory backend settings.
///
/// Implements `Debug` manually to redact the admin password.
#[derive(Clone, Default)]
pub struct MemoryConfig {
    /// Load the demo catalog at startup
    pub seed: bool,
    /// Admin account created at startup
    pub admin: Option<(Email, SecretString)>,
}

impl std::fmt::Debug for MemoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConfig")
            .field("seed", &self.seed)
            .field("admin", &self.admin.as_ref().map(|(email, _)| email.as_str()))
            .finish()
    }
}

impl BackendConfig {
    /// Load the backend selection from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the service key fails secret validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let kind = get_env_or_default("CHOCOLATIER_BACKEND", "hosted");
        match kind.as_str() {
            "hosted" => Ok(Self::Hosted(HostedConfig::from_env()?)),
            "memory" => Ok(Self::Memory(MemoryConfig::from_env()?)),
            other => Err(ConfigError::InvalidEnvVar(
                "CHOCOLATIER_BACKEND".to_string(),
                format!("expected 'hosted' or 'memory', got '{other}'"),
            )),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Hosted(_) => "hosted",
            Self::Memory(_) => "memory",
        }
    }
}

impl HostedConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = get_required_env("BACKEND_URL")?;
        let anon_key = SecretString::from(get_required_env("BACKEND_ANON_KEY")?);
        let mut config = Self::new(&url, anon_key)
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_URL".to_string(), e.to_string()))?;
        config.service_key = get_optional_validated_secret("BACKEND_SERVICE_KEY")?;
        config.cache_ttl = Duration::from_secs(parse_env_or_default(
            "BACKEND_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )?);
        Ok(config)
    }
}

impl MemoryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let seed = parse_env_or_default("MEMORY_SEED", true)?;
        let admin = match get_optional_env("MEMORY_ADMIN_EMAIL") {
            Some(email) => {
                let email = Email::parse(&email).map_err(|e| {
                    ConfigError::InvalidEnvVar("MEMORY_ADMIN_EMAIL".to_string(), e.to_string())
                })?;
                let password = SecretString::from(get_required_env("MEMORY_ADMIN_PASSWORD")?);
                Some((email, password))
            }
            None => None,
        };
        Ok(Self { seed, admin })
    }
}

/// Sentry settings for the web binaries.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl SentryConfig {
    /// Load Sentry settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a sample rate is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", 1.0)?,
            traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        })
    }

    /// No DSN: error tracking off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if the variable is unset.
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
#[must_use]
pub fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
#[must_use]
pub fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if the value does not parse.
pub fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
#[must_use]
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` describing the failed check.
pub fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a required secret from the environment.
///
/// # Errors
///
/// Returns `ConfigError` if the variable is missing or fails validation.
pub fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Load and validate an optional secret from the environment.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` if the variable is set but weak.
pub fn get_optional_validated_secret(key: &str) -> Result<Option<SecretString>, ConfigError> {
    get_optional_env(key)
        .map(|value| {
            validate_secret_strength(&value, key)?;
            Ok(SecretString::from(value))
        })
        .transpose()
}
