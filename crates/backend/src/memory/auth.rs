//! In-memory [`AuthProvider`] with Argon2 password hashes.

use std::collections::HashMap;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chocolatier_core::auth::{
    AuthError, AuthProvider, AuthSession, AuthUser, SignUpOutcome, validate_password,
};
use chocolatier_core::{Email, UserId};
use rand::RngCore;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

struct Account {
    user: AuthUser,
    password_hash: String,
    confirmed: bool,
}

#[derive(Default)]
struct AuthTables {
    accounts: HashMap<Email, Account>,
    tokens: HashMap<String, UserId>,
}

/// Process-local auth provider.
///
/// Accounts are confirmed at sign-up unless the provider was built with
/// [`MemoryAuth::requiring_confirmation`], in which case sign-up returns no
/// session and sign-in fails with [`AuthError::EmailNotConfirmed`] until
/// [`MemoryAuth::confirm_email`] is called.
#[derive(Default)]
pub struct MemoryAuth {
    require_confirmation: bool,
    tables: RwLock<AuthTables>,
}

impl MemoryAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that holds new accounts until their email is confirmed.
    #[must_use]
    pub fn requiring_confirmation() -> Self {
        Self {
            require_confirmation: true,
            tables: RwLock::default(),
        }
    }

    /// Mark an account as confirmed. Returns `false` for unknown emails.
    pub async fn confirm_email(&self, email: &Email) -> bool {
        let mut tables = self.tables.write().await;
        match tables.accounts.get_mut(email) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Number of live access tokens.
    pub async fn active_sessions(&self) -> usize {
        self.tables.read().await.tokens.len()
    }

    async fn issue_session(&self, user: AuthUser) -> AuthSession {
        let access_token = generate_token();
        self.tables
            .write()
            .await
            .tokens
            .insert(access_token.clone(), user.id);
        AuthSession { access_token, user }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Backend(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    #[instrument(skip(self, email, password), fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<SignUpOutcome, AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = {
            let mut tables = self.tables.write().await;
            if tables.accounts.contains_key(email) {
                return Err(AuthError::UserAlreadyExists);
            }
            let user = AuthUser {
                id: UserId::generate(),
                email: email.clone(),
            };
            tables.accounts.insert(
                email.clone(),
                Account {
                    user: user.clone(),
                    password_hash,
                    confirmed: !self.require_confirmation,
                },
            );
            user
        };
        debug!(user_id = %user.id, "Account created");

        let session = if self.require_confirmation {
            None
        } else {
            Some(self.issue_session(user.clone()).await)
        };
        Ok(SignUpOutcome { user, session })
    }

    #[instrument(skip(self, email, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, AuthError> {
        let (user, hash, confirmed) = {
            let tables = self.tables.read().await;
            let account = tables
                .accounts
                .get(email)
                .ok_or(AuthError::InvalidCredentials)?;
            (
                account.user.clone(),
                account.password_hash.clone(),
                account.confirmed,
            )
        };
        verify_password(password, &hash)?;
        if !confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }
        Ok(self.issue_session(user).await)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.tables.write().await.tokens.remove(access_token);
        Ok(())
    }

    #[instrument(skip_all)]
    async fn current_user(&self, access_token: &str) -> Result<Option<AuthUser>, AuthError> {
        let tables = self.tables.read().await;
        let Some(user_id) = tables.tokens.get(access_token) else {
            return Ok(None);
        };
        Ok(tables
            .accounts
            .values()
            .find(|account| account.user.id == *user_id)
            .map(|account| account.user.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let auth = MemoryAuth::new();
        let outcome = auth
            .sign_up(&email("cocoa@example.com"), "dark-chocolate-70")
            .await
            .unwrap();
        let session = outcome.session.unwrap();
        assert_eq!(
            auth.current_user(&session.access_token).await.unwrap(),
            Some(outcome.user.clone())
        );

        let again = auth
            .sign_in(&email("Cocoa@Example.com"), "dark-chocolate-70")
            .await
            .unwrap();
        assert_eq!(again.user.id, outcome.user.id);
        assert_ne!(again.access_token, session.access_token);
        assert_eq!(auth.active_sessions().await, 2);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let auth = MemoryAuth::new();
        auth.sign_up(&email("a@example.com"), "correct horse")
            .await
            .unwrap();
        assert!(matches!(
            auth.sign_in(&email("a@example.com"), "wrong horse").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.sign_in(&email("b@example.com"), "correct horse").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_rejected() {
        let auth = MemoryAuth::new();
        auth.sign_up(&email("a@example.com"), "password-one")
            .await
            .unwrap();
        assert!(matches!(
            auth.sign_up(&email("a@example.com"), "password-two").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let auth = MemoryAuth::new();
        assert!(matches!(
            auth.sign_up(&email("a@example.com"), "short").await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_token() {
        let auth = MemoryAuth::new();
        let session = auth
            .sign_up(&email("a@example.com"), "password-one")
            .await
            .unwrap()
            .session
            .unwrap();
        auth.sign_out(&session.access_token).await.unwrap();
        assert!(auth.current_user(&session.access_token).await.unwrap().is_none());
        // Signing out twice is fine
        auth.sign_out(&session.access_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_confirmation_required() {
        let auth = MemoryAuth::requiring_confirmation();
        let outcome = auth
            .sign_up(&email("new@example.com"), "password-one")
            .await
            .unwrap();
        assert!(outcome.session.is_none());
        assert!(matches!(
            auth.sign_in(&email("new@example.com"), "password-one").await,
            Err(AuthError::EmailNotConfirmed)
        ));

        assert!(auth.confirm_email(&email("new@example.com")).await);
        assert!(auth
            .sign_in(&email("new@example.com"), "password-one")
            .await
            .is_ok());
        assert!(!auth.confirm_email(&email("nobody@example.com")).await);
    }
}
