//! Authentication route handlers.
//!
//! Handles login, registration and logout against the auth provider. The
//! signed-in user is mirrored into the session; logout revokes the provider
//! session and clears the mirror together with the cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chocolatier_core::Toast;
use chocolatier_core::auth::AuthError;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::auth::safe_next;
use crate::middleware::{OptionalAuth, Page, clear_current_user, flash, set_current_user};
use crate::models::CurrentUser;
use crate::services::{AccountError, AccountService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Query parameters for the login and register pages.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub error: Option<String>,
    pub email: String,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
    pub error: Option<String>,
    pub email: String,
    pub full_name: String,
    pub next: String,
}

/// Shown when the provider asks the customer to confirm their email first.
#[derive(Template, WebTemplate)]
#[template(path = "auth/check_email.html")]
pub struct CheckEmailTemplate {
    pub page: Page,
    pub email: String,
}

fn error_status(err: &AccountError) -> StatusCode {
    match err {
        AccountError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
        AccountError::Auth(AuthError::UserAlreadyExists) => StatusCode::CONFLICT,
        AccountError::Auth(AuthError::EmailNotConfirmed) => StatusCode::FORBIDDEN,
        AccountError::Auth(AuthError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
        err if err.is_server_error() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn log_failure(action: &str, err: &AccountError) {
    if err.is_server_error() {
        tracing::error!(error = %err, "{action} failed");
    } else {
        tracing::info!(error = %err, "{action} rejected");
    }
}

/// Where to go after signing in.
fn landing(next: Option<&str>) -> String {
    safe_next(next).unwrap_or("/account").to_string()
}

async fn sign_in_session(session: &Session, user: &CurrentUser) -> Result<()> {
    set_current_user(session, user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    page: Page,
    Query(query): Query<NextQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to(&landing(query.next.as_deref())).into_response();
    }
    LoginTemplate {
        page,
        error: None,
        email: String::new(),
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_string(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let service = AccountService::new(state.store(), state.auth());
    match service.login(&form.email, &form.password).await {
        Ok(user) => {
            sign_in_session(&session, &user).await?;
            flash(
                &session,
                Toast::success(format!("Welcome back, {}!", user.display_name())),
            )
            .await;
            Ok(Redirect::to(&landing(form.next.as_deref())).into_response())
        }
        Err(err) => {
            log_failure("Login", &err);
            Ok((
                error_status(&err),
                LoginTemplate {
                    page,
                    error: Some(err.user_message()),
                    email: form.email,
                    next: safe_next(form.next.as_deref()).unwrap_or_default().to_string(),
                },
            )
                .into_response())
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalAuth(user): OptionalAuth,
    page: Page,
    Query(query): Query<NextQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }
    RegisterTemplate {
        page,
        error: None,
        email: String::new(),
        full_name: String::new(),
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_string(),
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let service = AccountService::new(state.store(), state.auth());
    let result = service
        .register(
            &form.email,
            &form.password,
            &form.password_confirm,
            &form.full_name,
        )
        .await;

    match result {
        Ok(Registration::SignedIn(user)) => {
            sign_in_session(&session, &user).await?;
            flash(
                &session,
                Toast::success(format!("Welcome, {}! Your account is ready.", user.display_name())),
            )
            .await;
            Ok(Redirect::to(&landing(form.next.as_deref())).into_response())
        }
        Ok(Registration::ConfirmationRequired(email)) => Ok(CheckEmailTemplate {
            page,
            email: email.into_inner(),
        }
        .into_response()),
        Err(err) => {
            log_failure("Registration", &err);
            Ok((
                error_status(&err),
                RegisterTemplate {
                    page,
                    error: Some(err.user_message()),
                    email: form.email,
                    full_name: form.full_name,
                    next: safe_next(form.next.as_deref()).unwrap_or_default().to_string(),
                },
            )
                .into_response())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// The provider session is revoked first; the local session is cleared even
/// when revocation fails.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Redirect> {
    if let Some(user) = user {
        AccountService::new(state.store(), state.auth())
            .logout(&user)
            .await;
    }
    clear_current_user(&session).await?;
    session.cycle_id().await?;
    clear_sentry_user();
    flash(&session, Toast::info("You have been signed out.")).await;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landing_defaults_to_account() {
        assert_eq!(landing(None), "/account");
        assert_eq!(landing(Some("/checkout")), "/checkout");
        assert_eq!(landing(Some("//evil.example/")), "/account");
    }

    #[test]
    fn test_error_status() {
        assert_eq!(
            error_status(&AccountError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            error_status(&AccountError::PasswordMismatch),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            error_status(&AccountError::Auth(AuthError::Backend("down".to_string()))),
            StatusCode::BAD_GATEWAY
        );
    }
}
