//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                            - Current season and featured products
//!
//! # Catalog
//! GET  /products                    - Product listing (?season, ?q, ?sort)
//! GET  /products/{id}               - Product detail
//! GET  /seasons                     - Seasons with their phase
//! GET  /seasons/{id}                - One season's products
//!
//! # Cart (session-backed)
//! GET  /cart                        - Cart page
//! POST /cart/add                    - Add a product (quantity defaults to 1)
//! POST /cart/update                 - Set, increment or decrement a line
//! POST /cart/remove                 - Remove a line
//! POST /cart/clear                  - Empty the cart
//! GET  /cart/count                  - Cart count badge (fragment)
//!
//! # Checkout (requires auth)
//! GET  /checkout                    - Address form and totals
//! POST /checkout                    - Validate, re-price and place the order
//! GET  /checkout/confirmation/{id}  - Order confirmation
//!
//! # Auth
//! GET  /auth/login                  - Login page
//! POST /auth/login                  - Login action
//! GET  /auth/register               - Register page
//! POST /auth/register               - Register action
//! POST /auth/logout                 - Logout action
//!
//! # Account (requires auth)
//! GET  /account                     - Profile and order history
//! GET  /account/orders/{id}         - Order detail
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod products;
pub mod seasons;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::filters;
use crate::middleware::{Page, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the season routes router.
pub fn season_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(seasons::index))
        .route("/{id}", get(seasons::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place))
        .route("/confirmation/{id}", get(checkout::confirmation))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders/{id}", get(account::order))
}

/// Create all routes for the storefront.
///
/// With `rate_limit_auth`, login and registration are limited per client IP.
/// The limiter needs the peer address, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn routes(rate_limit_auth: bool) -> Router<AppState> {
    let auth = if rate_limit_auth {
        auth_routes().layer(auth_rate_limiter())
    } else {
        auth_routes()
    };

    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/seasons", season_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/account", account_routes())
        .nest("/auth", auth)
        .fallback(not_found)
}

/// Not found page template.
#[derive(Template, WebTemplate)]
#[template(path = "errors/not_found.html")]
pub struct NotFoundTemplate {
    pub page: Page,
}

/// Render the not found page.
pub async fn not_found(page: Page) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NotFoundTemplate { page })
}
