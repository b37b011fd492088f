//! Session middleware configuration.
//!
//! Sessions are stored server-side through [`SessionBackend`], which is the
//! `PostgreSQL` store when `SESSION_DATABASE_URL` is set and an in-process
//! store otherwise.

use chocolatier_backend::sessions::SessionBackend;
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "chocolatier_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer.
///
/// Cookies are `Secure` when the storefront is served over HTTPS.
#[must_use]
pub fn create_session_layer(
    store: SessionBackend,
    config: &StorefrontConfig,
) -> SessionManagerLayer<SessionBackend> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
