//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Health check
//! GET  /health/ready                        - Backend reachable
//!
//! # Dashboard
//! GET  /                                    - Counts, revenue, recent orders
//!
//! # Auth
//! GET  /auth/login                          - Login page
//! POST /auth/login                          - Sign in (rate limited)
//! POST /auth/logout                         - Sign out
//!
//! # Seasons
//! GET  /seasons                             - Season listing
//! GET  /seasons/new, POST /seasons          - Create season
//! GET  /seasons/{id}/edit, POST /seasons/{id}
//! POST /seasons/{id}/delete
//!
//! # Products
//! GET  /products?season=&q=                 - Product listing
//! GET  /products/new, POST /products        - Create product
//! GET  /products/{id}/edit, POST /products/{id}
//! POST /products/{id}/delete
//! POST /products/{id}/availability          - Toggle availability
//!
//! # Purchase cycles
//! GET  /cycles                              - Cycle listing
//! GET  /cycles/new, POST /cycles            - Create cycle
//! GET  /cycles/{id}                         - Detail with product overrides
//! GET  /cycles/{id}/edit, POST /cycles/{id}
//! POST /cycles/{id}/delete
//! POST /cycles/{id}/products                - Add override
//! POST /cycles/{id}/products/{cp}           - Update override
//! POST /cycles/{id}/products/{cp}/delete    - Remove override
//!
//! # Orders
//! GET  /orders?status=                      - Order listing
//! GET  /orders/{id}                         - Order detail
//! POST /orders/{id}/status                  - Change status
//!
//! # Customers
//! GET  /customers                           - Profile listing
//! GET  /customers/{id}                      - Profile with orders
//! POST /customers/{id}/role                 - Change role
//! ```

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chocolatier_core::Toast;
use chocolatier_core::store::StoreError;
use tower_sessions::Session;

use crate::components::{Layout, flash};
use crate::filters;
use crate::middleware::login_rate_limiter;
use crate::state::AppState;

pub mod auth;
pub mod customers;
pub mod cycles;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod seasons;

/// Build the admin router (without health checks or global middleware).
///
/// `rate_limit_login` wraps the login page in the per-IP limiter, which needs
/// the peer address from `into_make_service_with_connect_info`.
pub fn routes(rate_limit_login: bool) -> Router<AppState> {
    let login = if rate_limit_login {
        login_routes().layer(login_rate_limiter())
    } else {
        login_routes()
    };

    Router::new()
        // Dashboard
        .route("/", get(dashboard::index))
        // Auth
        .merge(login)
        .route("/auth/logout", post(auth::logout))
        // Seasons
        .route("/seasons", get(seasons::index).post(seasons::create))
        .route("/seasons/new", get(seasons::new))
        .route("/seasons/{id}", post(seasons::update))
        .route("/seasons/{id}/edit", get(seasons::edit))
        .route("/seasons/{id}/delete", post(seasons::delete))
        // Products
        .route("/products", get(products::index).post(products::create))
        .route("/products/new", get(products::new))
        .route("/products/{id}", post(products::update))
        .route("/products/{id}/edit", get(products::edit))
        .route("/products/{id}/delete", post(products::delete))
        .route(
            "/products/{id}/availability",
            post(products::toggle_availability),
        )
        // Purchase cycles
        .route("/cycles", get(cycles::index).post(cycles::create))
        .route("/cycles/new", get(cycles::new))
        .route("/cycles/{id}", get(cycles::show).post(cycles::update))
        .route("/cycles/{id}/edit", get(cycles::edit))
        .route("/cycles/{id}/delete", post(cycles::delete))
        .route("/cycles/{id}/products", post(cycles::add_product))
        .route("/cycles/{id}/products/{cp}", post(cycles::update_product))
        .route(
            "/cycles/{id}/products/{cp}/delete",
            post(cycles::remove_product),
        )
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        // Customers
        .route("/customers", get(customers::index))
        .route("/customers/{id}", get(customers::show))
        .route("/customers/{id}/role", post(customers::update_role))
        .fallback(not_found)
}

fn login_routes() -> Router<AppState> {
    Router::new().route("/auth/login", get(auth::login_page).post(auth::login))
}

/// 404 page template.
#[derive(Template, WebTemplate)]
#[template(path = "errors/not_found.html")]
pub struct NotFoundTemplate {
    pub layout: Layout,
}

/// Fallback for unknown paths.
pub async fn not_found(layout: Layout) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NotFoundTemplate { layout })
}

/// Re-render a rejected form with a 422.
pub(crate) fn invalid_form(template: impl IntoResponse) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

/// Toast text for a failed write, e.g. `Could not delete season: ...`.
fn failure_message(action: &str, err: &StoreError) -> String {
    match err {
        StoreError::Conflict(reason) | StoreError::Invalid(reason) => {
            format!("Could not {action}: {reason}.")
        }
        StoreError::NotFound { entity } => format!("Could not {action}: {entity} not found."),
        StoreError::Backend(_) => format!("Could not {action}. Please try again."),
    }
}

/// Report the outcome of a write as a toast for the next page.
///
/// Returns the written value on success. Backend failures are captured to
/// Sentry; conflicts and invalid input are only logged.
pub(crate) async fn report<T>(
    session: &Session,
    action: &str,
    result: Result<T, StoreError>,
    success: impl FnOnce(&T) -> String,
) -> Option<T> {
    match result {
        Ok(value) => {
            flash(session, Toast::success(success(&value))).await;
            Some(value)
        }
        Err(err) => {
            if matches!(err, StoreError::Backend(_)) {
                let event_id = sentry::capture_error(&err);
                tracing::error!(error = %err, sentry_event_id = %event_id, "Failed to {action}");
            } else {
                tracing::info!(error = %err, "Rejected {action}");
            }
            flash(session, Toast::error(failure_message(action, &err))).await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_hides_backend_details() {
        assert_eq!(
            failure_message("delete season", &StoreError::Conflict("season is in use".to_string())),
            "Could not delete season: season is in use."
        );
        assert_eq!(
            failure_message("save product", &StoreError::Backend("503 from upstream".to_string())),
            "Could not save product. Please try again."
        );
        assert_eq!(
            failure_message("update order", &StoreError::not_found("order")),
            "Could not update order: order not found."
        );
    }
}
