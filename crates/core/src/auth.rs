//! Authentication provider trait.
//!
//! The hosted backend owns user accounts and passwords. The storefront and
//! admin console only ever see the provider's user id, the email, and an
//! opaque access token that they keep in the server-side session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Email, EmailError, UserId};

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length accepted at sign-up.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Errors returned by an [`AuthProvider`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The account exists but the email address has not been confirmed yet.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// The access token is no longer valid.
    #[error("session expired")]
    SessionExpired,

    #[error("too many attempts")]
    RateLimited,

    #[error("auth provider error: {0}")]
    Backend(String),
}

impl AuthError {
    /// Message that is safe to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(e) => format!("Please enter a valid email address ({e})."),
            Self::InvalidCredentials => "Invalid email or password.".to_owned(),
            Self::UserAlreadyExists => "An account with this email already exists.".to_owned(),
            Self::WeakPassword(reason) => reason.clone(),
            Self::EmailNotConfirmed => {
                "Please confirm your email address before signing in.".to_owned()
            }
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_owned(),
            Self::RateLimited => "Too many attempts. Please wait a moment and try again.".to_owned(),
            Self::Backend(_) => "We couldn't reach the sign-in service. Please try again.".to_owned(),
        }
    }
}

/// The signed-in user as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Email,
}

/// A provider session: the access token plus the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

/// Result of a sign-up.
///
/// `session` is `None` when the provider requires the user to confirm their
/// email before the first sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

/// Authentication operations delegated to the hosted backend.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &Email, password: &str) -> Result<SignUpOutcome, AuthError>;

    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, AuthError>;

    /// Revoke the access token. Unknown tokens are not an error.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// The user owning `access_token`, or `None` if it is invalid or expired.
    async fn current_user(&self, access_token: &str) -> Result<Option<AuthUser>, AuthError>;
}

/// Check a new password against the sign-up policy.
///
/// # Errors
///
/// Returns [`AuthError::WeakPassword`] describing the first failed rule.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters."
        )));
    }
    if password.trim().is_empty() {
        return Err(AuthError::WeakPassword(
            "Password cannot be only whitespace.".to_owned(),
        ));
    }
    Ok(())
}
