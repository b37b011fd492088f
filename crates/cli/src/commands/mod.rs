//! Command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use chocolatier_backend::config::{BackendConfig, ConfigError};
use chocolatier_backend::{Backend, BackendError};
use chocolatier_core::EmailError;
use chocolatier_core::store::StoreError;
use thiserror::Error;
use tracing::info;

/// Errors surfaced by any command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("data store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("session database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the backend selected by the environment.
async fn connect() -> Result<Backend, CliError> {
    let config = BackendConfig::from_env()?;
    if matches!(config, BackendConfig::Memory(_)) {
        tracing::warn!("Using the in-memory backend; changes are discarded when the command exits");
    }
    let backend = chocolatier_backend::connect(&config).await?;
    info!(backend = config.kind(), "Connected");
    Ok(backend)
}

/// Load configuration and ping the backend.
///
/// # Errors
///
/// Returns `CliError` if configuration is invalid or the backend is unreachable.
pub async fn check() -> Result<(), CliError> {
    let backend = connect().await?;
    backend.store.ping().await?;
    let seasons = backend.store.list_seasons().await?;
    info!(seasons = seasons.len(), "Backend is reachable");
    Ok(())
}
