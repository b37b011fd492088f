//! Chocolatier Storefront library.
//!
//! The public shop: seasonal catalog, session cart, checkout and customer
//! accounts. The router is built here so the binary, router tests and the
//! integration tests all serve the same application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use chocolatier_backend::sessions::SessionBackend;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Stylesheets and images served under `/static`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the storefront application.
///
/// `rate_limit_auth` enables per-IP limits on login and registration; see
/// [`routes::routes`].
pub fn app(state: AppState, sessions: SessionBackend, rate_limit_auth: bool) -> Router {
    let session_layer = middleware::create_session_layer(sessions, state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(rate_limit_auth))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Pings the data store; returns 503 Service Unavailable when it is not
/// reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Readiness check failed: {e}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, Response, header};
    use chocolatier_backend::Backend;
    use chocolatier_backend::config::{BackendConfig, MemoryConfig};
    use chocolatier_backend::memory::seed::seed_demo_catalog;
    use chocolatier_core::models::CycleProductInput;
    use chocolatier_core::store::ProductQuery;
    use chocolatier_core::{Money, OrderId, ProductId};
    use chrono::Utc;
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;

    async fn test_app() -> (Router, Backend) {
        let backend = Backend::memory();
        seed_demo_catalog(backend.store.as_ref(), Utc::now().date_naive(), false)
            .await
            .unwrap();
        let config = StorefrontConfig::local(BackendConfig::Memory(MemoryConfig::default()));
        let state = AppState::new(config, backend.clone());
        (app(state, SessionBackend::default(), false), backend)
    }

    async fn product_id(backend: &Backend, name: &str) -> ProductId {
        backend
            .store
            .list_products(&ProductQuery::default())
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap()
            .id
    }

    /// Cookie-carrying client over the router.
    struct Browser {
        app: Router,
        cookie: Option<String>,
    }

    impl Browser {
        const fn new(app: Router) -> Self {
            Self { app, cookie: None }
        }

        async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> Response<Body> {
            let builder = match &self.cookie {
                Some(cookie) => builder.header(header::COOKIE, cookie),
                None => builder,
            };
            let response = self
                .app
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
                let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
                self.cookie = Some(pair.to_string());
            }
            response
        }

        async fn get(&mut self, uri: &str) -> Response<Body> {
            self.send(Request::get(uri), Body::empty()).await
        }

        async fn post(&mut self, uri: &str, form: &str) -> Response<Body> {
            let builder = Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            self.send(builder, Body::from(form.to_string())).await
        }
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response<Body>) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (app, _) = test_app().await;
        let mut browser = Browser::new(app);

        let response = browser.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");

        let response = browser.get("/health/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_home_renders_featured_with_security_headers() {
        let (app, _) = test_app().await;
        let mut browser = Browser::new(app);

        let response = browser.get("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert!(headers.contains_key("content-security-policy"));
        assert!(headers.contains_key("x-request-id"));

        let body = body_text(response).await;
        assert!(body.contains("Raspberry Rose Truffles"));
        // Featured but not part of the current season
        assert!(!body.contains("Speckled Praline Eggs"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (app, _) = test_app().await;
        let response = Browser::new(app).get("/no-such-page").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_stylesheet_is_served() {
        let (app, _) = test_app().await;
        let response = Browser::new(app).get("/static/css/main.css").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_checkout_requires_sign_in() {
        let (app, _) = test_app().await;
        let response = Browser::new(app).get("/checkout").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login?next=%2Fcheckout");
    }

    #[tokio::test]
    async fn test_cart_uses_cycle_price() {
        let (app, backend) = test_app().await;
        let truffles = product_id(&backend, "Raspberry Rose Truffles").await;
        let mut browser = Browser::new(app);

        let response = browser
            .post("/cart/add", &format!("product_id={truffles}&quantity=2"))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/cart");

        let body = body_text(browser.get("/cart").await).await;
        assert!(body.contains("Raspberry Rose Truffles"));
        assert!(body.contains("$25.00"));
        assert!(body.contains("$50.00"));
        // Under the free shipping threshold: $50 + $8
        assert!(body.contains("$58.00"));

        let body = body_text(browser.get("/cart/count").await).await;
        assert!(body.contains('2'));
    }

    #[tokio::test]
    async fn test_cart_rejects_product_paused_in_cycle() {
        let (app, backend) = test_app().await;
        let caramels = product_id(&backend, "Sea Salt Caramels").await;
        let mut browser = Browser::new(app);

        let response = browser
            .post("/cart/add", &format!("product_id={caramels}"))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/products/{caramels}"));

        let body = body_text(browser.get("/cart").await).await;
        assert!(body.contains("Your cart is empty."));
    }

    #[tokio::test]
    async fn test_cart_set_with_blank_quantity_keeps_line() {
        let (app, backend) = test_app().await;
        let truffles = product_id(&backend, "Raspberry Rose Truffles").await;
        let mut browser = Browser::new(app);

        browser
            .post("/cart/add", &format!("product_id={truffles}&quantity="))
            .await;

        let response = browser
            .post(
                "/cart/update",
                &format!("product_id={truffles}&action=set&quantity="),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/cart");

        let body = body_text(browser.get("/cart").await).await;
        assert!(body.contains("Quantity must be at least 1."));
        assert!(body.contains("Raspberry Rose Truffles"));
        let body = body_text(browser.get("/cart/count").await).await;
        assert!(body.contains('1'));
    }

    #[tokio::test]
    async fn test_register_checkout_and_view_order() {
        let (app, backend) = test_app().await;
        let truffles = product_id(&backend, "Raspberry Rose Truffles").await;
        let mut browser = Browser::new(app);

        browser
            .post("/cart/add", &format!("product_id={truffles}&quantity=3"))
            .await;

        let response = browser
            .post(
                "/auth/register",
                "email=ada%40example.com&password=cocoa-nibs-42&password_confirm=cocoa-nibs-42&full_name=Ada&next=%2Fcheckout",
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/checkout");

        // The cart survives sign-in
        let response = browser.get("/checkout").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Ada"));

        // Missing address fields re-render the form
        let response = browser.post("/checkout", "full_name=Ada").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = browser
            .post(
                "/checkout",
                "full_name=Ada+Buyer&line1=1+Cocoa+Way&city=Portland&region=OR&postal_code=97201&country=US&notes=Leave+at+door",
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let confirmation = location(&response).to_string();
        assert!(confirmation.starts_with("/checkout/confirmation/"));

        let body = body_text(browser.get(&confirmation).await).await;
        assert!(body.contains("CH-0000"));
        // 3 x $25 reaches free shipping
        assert!(body.contains("$75.00"));
        assert!(body.contains("Leave at door"));

        let body = body_text(browser.get("/cart").await).await;
        assert!(body.contains("Your cart is empty."));

        let body = body_text(browser.get("/account").await).await;
        assert!(body.contains("Pending"));
    }

    #[tokio::test]
    async fn test_order_records_cycle_joined_after_adding_to_cart() {
        let (app, backend) = test_app().await;
        let flight = product_id(&backend, "Single Origin Tasting Flight").await;
        let mut browser = Browser::new(app);

        browser
            .post(
                "/auth/register",
                "email=lin%40example.com&password=cocoa-nibs-42&password_confirm=cocoa-nibs-42&full_name=Lin",
            )
            .await;
        browser.post("/cart/add", &format!("product_id={flight}")).await;

        // The product joins the open cycle at a lower price after it was carted
        let cycle = backend
            .store
            .list_purchase_cycles()
            .await
            .unwrap()
            .into_iter()
            .find(|cycle| cycle.name == "Valentine's pre-orders")
            .unwrap();
        let product = backend.store.get_product(flight).await.unwrap().unwrap();
        let override_row = backend
            .store
            .create_cycle_product(&CycleProductInput::snapshot(
                cycle.id,
                &product,
                Some(Money::from_cents(1800)),
                true,
            ))
            .await
            .unwrap();

        let address =
            "full_name=Lin&line1=1+Cocoa+Way&city=Portland&region=OR&postal_code=97201&country=US";
        let response = browser.post("/checkout", address).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/checkout");

        let response = browser.post("/checkout", address).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let order_id: i64 = location(&response)
            .strip_prefix("/checkout/confirmation/")
            .unwrap()
            .parse()
            .unwrap();

        let order = backend
            .store
            .get_order(OrderId::new(order_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.purchase_cycle_id, Some(cycle.id));
        let item = order.items.first().unwrap();
        assert_eq!(item.cycle_product_id, Some(override_row.id));
        assert_eq!(item.unit_price, Money::from_cents(1800));
    }

    #[tokio::test]
    async fn test_orders_are_private() {
        let (app, backend) = test_app().await;
        let truffles = product_id(&backend, "Raspberry Rose Truffles").await;

        let mut buyer = Browser::new(app.clone());
        buyer
            .post(
                "/auth/register",
                "email=buyer%40example.com&password=cocoa-nibs-42&password_confirm=cocoa-nibs-42",
            )
            .await;
        buyer
            .post("/cart/add", &format!("product_id={truffles}"))
            .await;
        let response = buyer
            .post(
                "/checkout",
                "full_name=Buyer&line1=1+Cocoa+Way&city=Portland&region=OR&postal_code=97201&country=US",
            )
            .await;
        let order_id = location(&response)
            .rsplit('/')
            .next()
            .unwrap()
            .to_string();

        let mut other = Browser::new(app);
        other
            .post(
                "/auth/register",
                "email=other%40example.com&password=cocoa-nibs-42&password_confirm=cocoa-nibs-42",
            )
            .await;
        let response = other.get(&format!("/account/orders/{order_id}")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_logout_clears_cart_and_user() {
        let (app, backend) = test_app().await;
        let truffles = product_id(&backend, "Raspberry Rose Truffles").await;
        let mut browser = Browser::new(app);

        browser
            .post(
                "/auth/register",
                "email=ada%40example.com&password=cocoa-nibs-42&password_confirm=cocoa-nibs-42",
            )
            .await;
        browser
            .post("/cart/add", &format!("product_id={truffles}"))
            .await;

        let response = browser.post("/auth/logout", "").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let response = browser.get("/account").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let body = body_text(browser.get("/cart").await).await;
        assert!(body.contains("Your cart is empty."));
    }
}
