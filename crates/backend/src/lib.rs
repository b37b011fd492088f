//! Chocolatier data-access backends.
//!
//! Both binaries talk to their data only through the
//! [`DataStore`](chocolatier_core::store::DataStore) and
//! [`AuthProvider`](chocolatier_core::auth::AuthProvider) traits. This crate
//! provides two implementations of each:
//!
//! - [`hosted`]: the hosted relational backend's REST and auth APIs
//! - [`memory`]: a process-local placeholder used for development and tests
//!
//! [`sessions`] holds the session store shared by the storefront and admin.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod hosted;
pub mod memory;
pub mod sessions;

use std::sync::Arc;

use chocolatier_core::auth::{AuthError, AuthProvider};
use chocolatier_core::models::{Profile, ProfileInput};
use chocolatier_core::store::{DataStore, StoreError};
use chocolatier_core::{Email, UserRole};
use chrono::Utc;
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use crate::config::{BackendConfig, MemoryConfig};
use crate::hosted::HostedClient;
use crate::memory::{MemoryAuth, MemoryStore};

/// Errors raised while connecting to or bootstrapping a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("data store error: {0}")]
    Store(#[from] StoreError),

    #[error("auth provider error: {0}")]
    Auth(#[from] AuthError),

    /// Sign-up succeeded but the provider did not hand back a usable account.
    #[error("could not bootstrap admin account: {0}")]
    Bootstrap(String),
}

/// The data store and auth provider a binary runs against.
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn DataStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Backend {
    /// Fresh, empty in-memory backend.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            auth: Arc::new(MemoryAuth::new()),
        }
    }

    /// Backend over the hosted API.
    #[must_use]
    pub fn hosted(client: HostedClient) -> Self {
        let client = Arc::new(client);
        Self {
            store: client.clone(),
            auth: client,
        }
    }
}

/// Build the backend selected by `config`.
///
/// The in-memory backend is seeded with the demo catalog and the configured
/// admin account before it is returned.
///
/// # Errors
///
/// Returns `BackendError` if seeding or the admin bootstrap fails.
pub async fn connect(config: &BackendConfig) -> Result<Backend, BackendError> {
    match config {
        BackendConfig::Hosted(hosted) => {
            info!(url = %hosted.url, "Using hosted backend");
            Ok(Backend::hosted(HostedClient::new(hosted)))
        }
        BackendConfig::Memory(memory) => {
            let backend = Backend::memory();
            prepare_memory(&backend, memory).await?;
            Ok(backend)
        }
    }
}

async fn prepare_memory(backend: &Backend, config: &MemoryConfig) -> Result<(), BackendError> {
    info!(seed = config.seed, "Using in-memory backend");
    if config.seed {
        memory::seed::seed_demo_catalog(backend.store.as_ref(), Utc::now().date_naive(), false)
            .await?;
    }
    if let Some((email, password)) = &config.admin {
        create_admin(backend, email, password.expose_secret(), None).await?;
    }
    Ok(())
}

/// Register a new account and give its profile the admin role.
///
/// # Errors
///
/// Returns `BackendError::Auth` if sign-up fails (for example because the
/// email is taken) and `BackendError::Store` if the profile cannot be written.
pub async fn create_admin(
    backend: &Backend,
    email: &Email,
    password: &str,
    full_name: Option<String>,
) -> Result<Profile, BackendError> {
    let outcome = backend.auth.sign_up(email, password).await?;
    if let Some(session) = &outcome.session {
        backend.auth.sign_out(&session.access_token).await?;
    }
    let profile = backend
        .store
        .upsert_profile(&ProfileInput {
            id: outcome.user.id,
            email: outcome.user.email,
            full_name,
            role: UserRole::Admin,
        })
        .await?;
    info!(user_id = %profile.id, "Admin account created");
    Ok(profile)
}

/// Give an existing profile the admin role.
///
/// # Errors
///
/// Returns `BackendError::Bootstrap` when no profile has this email.
pub async fn promote_admin(backend: &Backend, email: &Email) -> Result<Profile, BackendError> {
    let profile = backend
        .store
        .find_profile_by_email(email)
        .await?
        .ok_or_else(|| BackendError::Bootstrap(format!("no profile for {email}")))?;
    let profile = backend
        .store
        .set_profile_role(profile.id, UserRole::Admin)
        .await?;
    info!(user_id = %profile.id, "Profile promoted to admin");
    Ok(profile)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[tokio::test]
    async fn test_memory_backend_seeds_and_creates_admin() {
        let email = Email::parse("owner@example.com").unwrap();
        let config = BackendConfig::Memory(MemoryConfig {
            seed: true,
            admin: Some((email.clone(), SecretString::from("bonbon-master-1"))),
        });
        let backend = connect(&config).await.unwrap();

        assert!(!backend.store.list_seasons().await.unwrap().is_empty());
        let profile = backend
            .store
            .find_profile_by_email(&email)
            .await
            .unwrap()
            .unwrap();
        assert!(profile.is_admin());

        let session = backend.auth.sign_in(&email, "bonbon-master-1").await.unwrap();
        assert_eq!(session.user.id, profile.id);
    }

    #[tokio::test]
    async fn test_promote_admin() {
        let backend = Backend::memory();
        let email = Email::parse("fan@example.com").unwrap();
        assert!(matches!(
            promote_admin(&backend, &email).await,
            Err(BackendError::Bootstrap(_))
        ));

        let outcome = backend.auth.sign_up(&email, "milk-chocolate").await.unwrap();
        backend
            .store
            .upsert_profile(&ProfileInput {
                id: outcome.user.id,
                email: email.clone(),
                full_name: None,
                role: UserRole::Customer,
            })
            .await
            .unwrap();
        let promoted = promote_admin(&backend, &email).await.unwrap();
        assert_eq!(promoted.role, UserRole::Admin);
    }
}
