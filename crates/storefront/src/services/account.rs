//! Account service.
//!
//! Sign-up and sign-in are delegated to the auth provider. Each successful
//! sign-in makes sure a profile row exists for the user, so orders and the
//! admin customer list always have a name and email to show.

use chocolatier_core::auth::{AuthError, AuthProvider};
use chocolatier_core::models::{Profile, ProfileInput};
use chocolatier_core::store::{DataStore, StoreError};
use chocolatier_core::validation::non_blank;
use chocolatier_core::{Email, UserRole};
use thiserror::Error;
use tracing::instrument;

use crate::models::CurrentUser;

/// Errors from account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,
}

impl AccountError {
    /// Message safe to show on the login and registration forms.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(err) => err.user_message(),
            Self::Store(_) => "Something went wrong. Please try again.".to_string(),
            Self::PasswordMismatch => "Passwords do not match.".to_string(),
        }
    }

    /// Whether this is an infrastructure failure rather than bad input.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Auth(AuthError::Backend(_)))
    }
}

/// Result of a registration.
#[derive(Debug)]
pub enum Registration {
    /// The provider issued a session right away.
    SignedIn(CurrentUser),
    /// The provider wants the email confirmed before the first sign-in.
    ConfirmationRequired(Email),
}

/// Account operations for storefront customers.
pub struct AccountService<'a> {
    store: &'a dyn DataStore,
    auth: &'a dyn AuthProvider,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DataStore, auth: &'a dyn AuthProvider) -> Self {
        Self { store, auth }
    }

    /// Register a new customer.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::PasswordMismatch` when the confirmation differs,
    /// and provider or store errors otherwise.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        password_confirm: &str,
        full_name: &str,
    ) -> Result<Registration, AccountError> {
        let email = Email::parse(email).map_err(AuthError::from)?;
        if password != password_confirm {
            return Err(AccountError::PasswordMismatch);
        }
        let full_name = non_blank(full_name);

        let outcome = self.auth.sign_up(&email, password).await?;
        self.store
            .upsert_profile(&ProfileInput {
                id: outcome.user.id,
                email: outcome.user.email.clone(),
                full_name: full_name.clone(),
                role: UserRole::Customer,
            })
            .await?;
        tracing::info!(user_id = %outcome.user.id, "Customer registered");

        Ok(match outcome.session {
            Some(session) => Registration::SignedIn(CurrentUser::from_session(session, full_name)),
            None => Registration::ConfirmationRequired(email),
        })
    }

    /// Sign in an existing customer.
    ///
    /// # Errors
    ///
    /// Returns the provider error for bad credentials and store errors if the
    /// profile cannot be read or created.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AccountError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let session = self.auth.sign_in(&email, password).await?;
        let profile = self.ensure_profile(&session.user.id, &session.user.email).await?;
        Ok(CurrentUser::from_session(session, profile.full_name))
    }

    /// Revoke the provider session. Failures are logged, not returned, so the
    /// local session is always cleared.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn logout(&self, user: &CurrentUser) {
        if let Err(e) = self.auth.sign_out(&user.access_token).await {
            tracing::warn!("Failed to revoke provider session: {e}");
        }
    }

    /// Existing profile, or a new customer profile for a user that signed up
    /// elsewhere. An existing role is never changed.
    async fn ensure_profile(
        &self,
        id: &chocolatier_core::UserId,
        email: &Email,
    ) -> Result<Profile, AccountError> {
        if let Some(profile) = self.store.get_profile(*id).await? {
            return Ok(profile);
        }
        Ok(self
            .store
            .upsert_profile(&ProfileInput {
                id: *id,
                email: email.clone(),
                full_name: None,
                role: UserRole::Customer,
            })
            .await?)
    }
}
