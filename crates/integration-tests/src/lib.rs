//! End-to-end test harness for Chocolatier.
//!
//! [`TestContext::start`] serves the storefront and the admin console on
//! ephemeral local ports over one shared in-memory backend, so a test can
//! act as a customer in one client and as staff in another.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p chocolatier-integration-tests
//! ```

use axum::Router;
use chocolatier_backend::Backend;
use chocolatier_backend::config::{BackendConfig, MemoryConfig};
use chocolatier_backend::memory::seed::seed_demo_catalog;
use chocolatier_backend::sessions::SessionBackend;
use chocolatier_core::store::ProductQuery;
use chocolatier_core::{Email, ProductId};
use chrono::Utc;
use reqwest::Client;
use tokio::net::TcpListener;

/// Staff account created for every context.
pub const ADMIN_EMAIL: &str = "boss@example.com";
pub const ADMIN_PASSWORD: &str = "tempered-77";

/// Both binaries running against the same backend.
pub struct TestContext {
    pub backend: Backend,
    pub storefront_url: String,
    pub admin_url: String,
}

impl TestContext {
    /// Seed the demo catalog, create the staff account and start both servers.
    ///
    /// # Panics
    ///
    /// Panics if seeding fails or a listener cannot be bound.
    pub async fn start() -> Self {
        let backend = Backend::memory();
        seed_demo_catalog(backend.store.as_ref(), Utc::now().date_naive(), false)
            .await
            .expect("Failed to seed demo catalog");
        let email = Email::parse(ADMIN_EMAIL).expect("Invalid admin email");
        chocolatier_backend::create_admin(
            &backend,
            &email,
            ADMIN_PASSWORD,
            Some("Head Chocolatier".to_string()),
        )
        .await
        .expect("Failed to create admin");

        let memory = || BackendConfig::Memory(MemoryConfig::default());

        let storefront = chocolatier_storefront::app(
            chocolatier_storefront::state::AppState::new(
                chocolatier_storefront::config::StorefrontConfig::local(memory()),
                backend.clone(),
            ),
            SessionBackend::default(),
            false,
        );
        let admin = chocolatier_admin::app(
            chocolatier_admin::state::AppState::new(
                chocolatier_admin::config::AdminConfig::local(memory()),
                backend.clone(),
            ),
            SessionBackend::default(),
            false,
        );

        Self {
            storefront_url: serve(storefront).await,
            admin_url: serve(admin).await,
            backend,
        }
    }

    /// Storefront URL for `path`.
    #[must_use]
    pub fn storefront(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    /// Admin URL for `path`.
    #[must_use]
    pub fn admin(&self, path: &str) -> String {
        format!("{}{path}", self.admin_url)
    }

    /// Look up a seeded product by name.
    ///
    /// # Panics
    ///
    /// Panics if no product has this name.
    pub async fn product_id(&self, name: &str) -> ProductId {
        self.backend
            .store
            .list_products(&ProductQuery::default())
            .await
            .expect("Failed to list products")
            .into_iter()
            .find(|product| product.name == name)
            .unwrap_or_else(|| panic!("No product named {name}"))
            .id
    }
}

/// A browser-like client: keeps cookies and does not follow redirects.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// `Location` header of a redirect response.
///
/// # Panics
///
/// Panics if the response has no valid `Location` header.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .expect("Missing Location header")
        .to_str()
        .expect("Invalid Location header")
        .to_string()
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server error");
    });
    format!("http://{addr}")
}
