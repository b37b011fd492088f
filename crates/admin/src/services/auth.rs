//! Admin authentication service.
//!
//! Admins sign in with the same provider accounts as customers. A successful
//! sign-in only counts when the profile carries the admin role; otherwise the
//! provider session is revoked straight away.

use chocolatier_core::Email;
use chocolatier_core::auth::{AuthError, AuthProvider};
use chocolatier_core::store::{DataStore, StoreError};
use thiserror::Error;
use tracing::instrument;

use crate::models::CurrentAdmin;

/// Errors that can occur during admin authentication operations.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Valid credentials, but the profile is missing or not an admin.
    #[error("account is not an admin")]
    NotAdmin,
}

impl AdminAuthError {
    /// Message safe to show on the login form.
    ///
    /// A non-admin account gets the same message as bad credentials so the
    /// login form does not reveal which emails have customer accounts.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(err) => err.user_message(),
            Self::NotAdmin => AuthError::InvalidCredentials.user_message(),
            Self::Store(_) => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Whether this is an infrastructure failure rather than bad input.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Auth(AuthError::Backend(_)))
    }
}

/// Sign-in and sign-out for admins.
pub struct AdminAuthService<'a> {
    store: &'a dyn DataStore,
    auth: &'a dyn AuthProvider,
}

impl<'a> AdminAuthService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DataStore, auth: &'a dyn AuthProvider) -> Self {
        Self { store, auth }
    }

    /// Sign in and confirm the admin role.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::NotAdmin` for accounts without the admin role,
    /// and provider or store errors otherwise.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentAdmin, AdminAuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let session = self.auth.sign_in(&email, password).await?;

        let profile = match self.store.get_profile(session.user.id).await {
            Ok(Some(profile)) if profile.is_admin() => profile,
            Ok(_) => {
                tracing::warn!(user_id = %session.user.id, "Non-admin attempted admin login");
                self.revoke(&session.access_token).await;
                return Err(AdminAuthError::NotAdmin);
            }
            Err(e) => {
                self.revoke(&session.access_token).await;
                return Err(e.into());
            }
        };

        tracing::info!(user_id = %profile.id, "Admin signed in");
        Ok(CurrentAdmin::new(session, &profile))
    }

    /// Revoke the provider session. Failures are logged, not returned, so the
    /// local session is always cleared.
    #[instrument(skip_all, fields(user_id = %admin.id))]
    pub async fn logout(&self, admin: &CurrentAdmin) {
        self.revoke(&admin.access_token).await;
    }

    async fn revoke(&self, access_token: &str) {
        if let Err(e) = self.auth.sign_out(access_token).await {
            tracing::warn!("Failed to revoke provider session: {e}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chocolatier_backend::memory::{MemoryAuth, MemoryStore};
    use chocolatier_core::UserRole;
    use chocolatier_core::models::ProfileInput;

    use super::*;

    async fn account(store: &MemoryStore, auth: &MemoryAuth, email: &str, role: UserRole) {
        let email = Email::parse(email).unwrap();
        let outcome = auth.sign_up(&email, "tempered-77").await.unwrap();
        store
            .upsert_profile(&ProfileInput {
                id: outcome.user.id,
                email,
                full_name: Some("Maître".to_string()),
                role,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_admin_login() {
        let store = MemoryStore::new();
        let auth = MemoryAuth::new();
        account(&store, &auth, "boss@example.com", UserRole::Admin).await;

        let service = AdminAuthService::new(&store, &auth);
        let admin = service.login("boss@example.com", "tempered-77").await.unwrap();
        assert_eq!(admin.name, "Maître");
        assert!(auth.current_user(&admin.access_token).await.unwrap().is_some());

        service.logout(&admin).await;
        assert!(auth.current_user(&admin.access_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_customer_cannot_sign_in() {
        let store = MemoryStore::new();
        let auth = MemoryAuth::new();
        account(&store, &auth, "fan@example.com", UserRole::Customer).await;

        let service = AdminAuthService::new(&store, &auth);
        let err = service.login("fan@example.com", "tempered-77").await.unwrap_err();
        assert!(matches!(err, AdminAuthError::NotAdmin));
        assert_eq!(
            err.user_message(),
            AuthError::InvalidCredentials.user_message()
        );
    }

    #[tokio::test]
    async fn test_bad_password_and_bad_email() {
        let store = MemoryStore::new();
        let auth = MemoryAuth::new();
        account(&store, &auth, "boss@example.com", UserRole::Admin).await;

        let service = AdminAuthService::new(&store, &auth);
        let err = service.login("boss@example.com", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, AdminAuthError::Auth(AuthError::InvalidCredentials)));

        let err = service.login("not an email", "tempered-77").await.unwrap_err();
        assert!(matches!(err, AdminAuthError::Auth(AuthError::InvalidCredentials)));
        assert!(!err.is_server_error());
    }
}
