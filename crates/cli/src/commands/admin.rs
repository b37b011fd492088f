//! Admin account management.
//!
//! # Usage
//!
//! ```bash
//! # Sign up a new admin
//! chocolatier-cli admin create -e owner@example.com -p '...' -n "Head Chocolatier"
//!
//! # Promote someone who already has a customer account
//! chocolatier-cli admin promote -e staff@example.com
//! ```

use chocolatier_core::Email;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use super::{CliError, connect};

/// Sign up `email` and give the new profile the admin role.
///
/// # Errors
///
/// Returns `CliError` for an invalid email, a taken email or a backend failure.
pub async fn create(
    email: &str,
    password: SecretString,
    name: Option<String>,
) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let backend = connect().await?;

    let profile =
        chocolatier_backend::create_admin(&backend, &email, password.expose_secret(), name)
            .await?;
    info!(user_id = %profile.id, email = %profile.email, "Admin account ready");
    Ok(())
}

/// Give the existing profile for `email` the admin role.
///
/// # Errors
///
/// Returns `CliError` if no profile has this email or the write fails.
pub async fn promote(email: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let backend = connect().await?;

    let profile = chocolatier_backend::promote_admin(&backend, &email).await?;
    info!(user_id = %profile.id, "{} is now an admin", profile.display_name());
    Ok(())
}
