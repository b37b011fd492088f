//! Authentication route handlers.
//!
//! Admins sign in with their provider email and password. The admin role is
//! checked at sign-in and again on every request by `RequireAdminAuth`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chocolatier_core::Toast;
use chocolatier_core::auth::AuthError;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::{Layout, flash};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin};
use crate::services::{AdminAuthError, AdminAuthService};
use crate::state::AppState;

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub email: String,
}

fn error_status(err: &AdminAuthError) -> StatusCode {
    match err {
        AdminAuthError::Auth(AuthError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
        err if err.is_server_error() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::UNAUTHORIZED,
    }
}

/// Display the login page.
pub async fn login_page(OptionalAdminAuth(admin): OptionalAdminAuth, layout: Layout) -> Response {
    if admin.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginTemplate {
        layout,
        error: None,
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let service = AdminAuthService::new(state.store(), state.auth());
    match service.login(&form.email, &form.password).await {
        Ok(admin) => {
            set_current_admin(&session, &admin).await?;
            set_sentry_user(admin.id, Some(admin.email.as_str()));
            flash(&session, Toast::success(format!("Welcome back, {}.", admin.name))).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => {
            if err.is_server_error() {
                tracing::error!(error = %err, "Admin login failed");
            } else {
                tracing::info!(error = %err, "Admin login rejected");
            }
            Ok((
                error_status(&err),
                LoginTemplate {
                    layout,
                    error: Some(err.user_message()),
                    email: form.email,
                },
            )
                .into_response())
        }
    }
}

/// Handle logout.
///
/// The provider session is revoked first; the local session is cleared even
/// when revocation fails.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAdminAuth(admin): OptionalAdminAuth,
) -> Result<Redirect> {
    if let Some(admin) = admin {
        AdminAuthService::new(state.store(), state.auth())
            .logout(&admin)
            .await;
    }
    clear_current_admin(&session).await?;
    session.cycle_id().await?;
    clear_sentry_user();
    flash(&session, Toast::info("You have been signed out.")).await;
    Ok(Redirect::to("/auth/login"))
}

#[cfg(test)]
mod tests {
    use chocolatier_core::store::StoreError;

    use super::*;

    #[test]
    fn test_error_status() {
        assert_eq!(error_status(&AdminAuthError::NotAdmin), StatusCode::UNAUTHORIZED);
        assert_eq!(
            error_status(&AdminAuthError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            error_status(&AdminAuthError::Store(StoreError::Backend("down".to_string()))),
            StatusCode::BAD_GATEWAY
        );
    }
}
