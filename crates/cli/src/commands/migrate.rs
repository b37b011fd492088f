//! Database migrations.
//!
//! The hosted backend owns the catalog schema, so the only table this
//! project manages is the `PostgreSQL` session store.
//!
//! # Environment Variables
//!
//! - `SESSION_DATABASE_URL` - `PostgreSQL` connection string for sessions

use chocolatier_backend::config::get_required_env;
use chocolatier_backend::sessions::SessionBackend;
use secrecy::SecretString;
use tracing::info;

use super::CliError;

/// Create the session table.
///
/// # Errors
///
/// Returns `CliError` if `SESSION_DATABASE_URL` is missing or the migration fails.
pub async fn sessions() -> Result<(), CliError> {
    let url = SecretString::from(get_required_env("SESSION_DATABASE_URL")?);

    info!("Connecting to session database...");
    let store = SessionBackend::connect(Some(&url)).await?;

    info!("Creating session table...");
    store.migrate().await?;
    info!("Session migrations complete");
    Ok(())
}
