//! Per-request page chrome: navigation user, cart badge and one-shot toast.

use axum::{extract::FromRequestParts, http::request::Parts};
use chocolatier_core::Toast;
use chocolatier_core::cart::Cart;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Data every full page renders in its layout.
///
/// Extracting a `Page` consumes the pending toast, so it is shown exactly once.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub user_name: Option<String>,
    pub cart_count: u32,
    pub toast: Option<Toast>,
}

impl Page {
    /// Build the page chrome from the session.
    pub async fn from_session(session: &Session) -> Self {
        let user_name = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .map(|user| user.display_name());
        let cart_count = load_cart(session).await.item_count();
        let toast = session
            .remove::<Toast>(session_keys::TOAST)
            .await
            .ok()
            .flatten();
        Self {
            user_name,
            cart_count,
            toast,
        }
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user_name.is_some()
    }
}

impl<S> FromRequestParts<S> for Page
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match parts.extensions.get::<Session>() {
            Some(session) => Self::from_session(session).await,
            None => Self::default(),
        })
    }
}

/// Queue a toast for the next rendered page.
pub async fn flash(session: &Session, toast: Toast) {
    if let Err(e) = session.insert(session_keys::TOAST, toast).await {
        tracing::warn!("Failed to store toast in session: {e}");
    }
}

/// The session cart, empty when absent or unreadable.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Write the cart back, dropping the key once it is empty.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    if cart.is_empty() {
        session.remove::<Cart>(session_keys::CART).await?;
        Ok(())
    } else {
        session.insert(session_keys::CART, cart).await
    }
}
