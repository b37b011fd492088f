//! [`AuthProvider`] over the hosted auth API.

use async_trait::async_trait;
use chocolatier_core::auth::{AuthError, AuthProvider, AuthSession, AuthUser, SignUpOutcome};
use chocolatier_core::{Email, UserId};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{HostedClient, HostedError};

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    access_token: String,
    user: UserPayload,
}

/// Error payloads come in two shapes depending on the endpoint:
/// `{"error": "...", "error_description": "..."}` from the token endpoint and
/// `{"code": 422, "error_code": "...", "msg": "..."}` elsewhere.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

/// Which call produced an error, for mapping ambiguous statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthCall {
    SignUp,
    SignIn,
}

/// Map an auth API error response to an [`AuthError`].
pub(crate) fn map_auth_error(status: StatusCode, body: &str, call: AuthCall) -> AuthError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return AuthError::RateLimited;
    }

    let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed
        .error_code
        .or(parsed.error)
        .unwrap_or_default()
        .to_lowercase();
    let text = parsed
        .msg
        .or(parsed.error_description)
        .or(parsed.message)
        .unwrap_or_else(|| body.chars().take(200).collect());
    let lower = text.to_lowercase();

    if matches!(code.as_str(), "user_already_exists" | "email_exists")
        || lower.contains("already registered")
    {
        AuthError::UserAlreadyExists
    } else if code == "weak_password" || lower.contains("password should") {
        AuthError::WeakPassword(text)
    } else if code == "email_not_confirmed" || lower.contains("not confirmed") {
        AuthError::EmailNotConfirmed
    } else if code == "email_address_invalid" || lower.contains("invalid format") {
        AuthError::Backend(format!("email rejected: {text}"))
    } else if call == AuthCall::SignIn
        && (matches!(code.as_str(), "invalid_credentials" | "invalid_grant")
            || matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED))
    {
        AuthError::InvalidCredentials
    } else {
        AuthError::Backend(format!("{status}: {text}"))
    }
}

fn to_auth_user(payload: UserPayload) -> Result<AuthUser, AuthError> {
    let email = Email::parse(payload.email.as_deref().unwrap_or_default())
        .map_err(|e| AuthError::Backend(format!("provider returned an invalid email: {e}")))?;
    Ok(AuthUser {
        id: UserId::new(payload.id),
        email,
    })
}

fn to_session(payload: SessionPayload) -> Result<AuthSession, AuthError> {
    Ok(AuthSession {
        access_token: payload.access_token,
        user: to_auth_user(payload.user)?,
    })
}

/// Parse a sign-up response: a session when the provider confirms accounts
/// automatically, otherwise just the user awaiting email confirmation.
fn parse_sign_up(body: &str) -> Result<SignUpOutcome, AuthError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| AuthError::Backend(e.to_string()))?;

    if value.get("access_token").is_some() {
        let session: SessionPayload =
            serde_json::from_value(value).map_err(|e| AuthError::Backend(e.to_string()))?;
        let session = to_session(session)?;
        return Ok(SignUpOutcome {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    let user_value = value.get("user").cloned().unwrap_or(value);
    let user: UserPayload =
        serde_json::from_value(user_value).map_err(|e| AuthError::Backend(e.to_string()))?;
    Ok(SignUpOutcome {
        user: to_auth_user(user)?,
        session: None,
    })
}

impl From<HostedError> for AuthError {
    fn from(error: HostedError) -> Self {
        match error {
            HostedError::RateLimited(_) => Self::RateLimited,
            other => Self::Backend(other.to_string()),
        }
    }
}

impl HostedClient {
    async fn auth_call(
        &self,
        path: &str,
        credentials: &Credentials<'_>,
        call: AuthCall,
    ) -> Result<String, AuthError> {
        let response = self
            .auth_request(Method::POST, path)?
            .json(credentials)
            .send()
            .await
            .map_err(HostedError::from)?;
        let status = response.status();
        let body = response.text().await.map_err(HostedError::from)?;
        if status.is_success() {
            Ok(body)
        } else {
            let error = map_auth_error(status, &body, call);
            warn!(status = %status, error = %error, "Auth API rejected request");
            Err(error)
        }
    }
}

#[async_trait]
impl AuthProvider for HostedClient {
    #[instrument(skip(self, email, password), fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<SignUpOutcome, AuthError> {
        let body = self
            .auth_call(
                "signup",
                &Credentials {
                    email: email.as_str(),
                    password,
                },
                AuthCall::SignUp,
            )
            .await?;
        parse_sign_up(&body)
    }

    #[instrument(skip(self, email, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, AuthError> {
        let body = self
            .auth_call(
                "token?grant_type=password",
                &Credentials {
                    email: email.as_str(),
                    password,
                },
                AuthCall::SignIn,
            )
            .await?;
        let payload: SessionPayload =
            serde_json::from_str(&body).map_err(|e| AuthError::Backend(e.to_string()))?;
        to_session(payload)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .auth_request(Method::POST, "logout")?
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(HostedError::from)?;
        let status = response.status();
        // An already-invalid token is as good as signed out
        if status.is_success()
            || matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            )
        {
            Ok(())
        } else {
            let body = response.text().await.map_err(HostedError::from)?;
            Err(AuthError::Backend(format!("{status}: {body}")))
        }
    }

    #[instrument(skip_all)]
    async fn current_user(&self, access_token: &str) -> Result<Option<AuthUser>, AuthError> {
        let response = self
            .auth_request(Method::GET, "user")?
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(HostedError::from)?;
        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(None);
        }
        let body = response.text().await.map_err(HostedError::from)?;
        if !status.is_success() {
            return Err(map_auth_error(status, &body, AuthCall::SignIn));
        }
        let payload: UserPayload =
            serde_json::from_str(&body).map_err(|e| AuthError::Backend(e.to_string()))?;
        to_auth_user(payload).map(Some)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_grant_is_invalid_credentials() {
        let error = map_auth_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
            AuthCall::SignIn,
        );
        assert!(matches!(error, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_already_registered() {
        let error = map_auth_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#,
            AuthCall::SignUp,
        );
        assert!(matches!(error, AuthError::UserAlreadyExists));

        let error = map_auth_error(
            StatusCode::BAD_REQUEST,
            r#"{"msg":"User already registered"}"#,
            AuthCall::SignUp,
        );
        assert!(matches!(error, AuthError::UserAlreadyExists));
    }

    #[test]
    fn test_weak_password_keeps_provider_message() {
        let error = map_auth_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"error_code":"weak_password","msg":"Password should be at least 6 characters."}"#,
            AuthCall::SignUp,
        );
        match error {
            AuthError::WeakPassword(message) => {
                assert_eq!(message, "Password should be at least 6 characters.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_email_not_confirmed() {
        let error = map_auth_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#,
            AuthCall::SignIn,
        );
        assert!(matches!(error, AuthError::EmailNotConfirmed));
    }

    #[test]
    fn test_sign_up_bad_request_is_not_credentials_error() {
        let error = map_auth_error(StatusCode::BAD_REQUEST, "{}", AuthCall::SignUp);
        assert!(matches!(error, AuthError::Backend(_)));
        let error = map_auth_error(StatusCode::TOO_MANY_REQUESTS, "", AuthCall::SignUp);
        assert!(matches!(error, AuthError::RateLimited));
    }

    #[test]
    fn test_parse_sign_up_with_session() {
        let outcome = parse_sign_up(
            r#"{
                "access_token": "jwt-token",
                "token_type": "bearer",
                "expires_in": 3600,
                "refresh_token": "refresh",
                "user": {"id": "7b1d7c0e-3f7a-4b7e-9a55-0d2f4d5c9e11", "email": "New@Example.com"}
            }"#,
        )
        .unwrap();
        assert_eq!(outcome.user.email.as_str(), "new@example.com");
        assert_eq!(outcome.session.unwrap().access_token, "jwt-token");
    }

    #[test]
    fn test_parse_sign_up_awaiting_confirmation() {
        let outcome = parse_sign_up(
            r#"{"id": "7b1d7c0e-3f7a-4b7e-9a55-0d2f4d5c9e11", "email": "new@example.com", "confirmation_sent_at": "2026-02-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(outcome.session.is_none());
        assert_eq!(outcome.user.email.as_str(), "new@example.com");
    }
}
