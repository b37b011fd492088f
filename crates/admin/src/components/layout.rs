//! Admin page chrome: signed-in admin, active navigation section and toast.

use axum::{extract::FromRequestParts, http::request::Parts};
use chocolatier_core::Toast;
use tower_sessions::Session;

use crate::models::{CurrentAdmin, session_keys};

/// Admin user view for templates.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub name: String,
    pub email: String,
}

impl From<&CurrentAdmin> for AdminUserView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            name: admin.name.clone(),
            email: admin.email.to_string(),
        }
    }
}

/// Data every admin page renders in `base.html`.
///
/// Extracting a `Layout` consumes the pending toast, so it is shown exactly
/// once. Handlers extract `RequireAdminAuth` before `Layout` so a rejected
/// request never eats the toast.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub admin_user: Option<AdminUserView>,
    /// First path segment, used to highlight the navigation (`/products`).
    pub current_path: String,
    pub toast: Option<Toast>,
}

impl Layout {
    /// `"active"` when `section` is the current navigation section.
    #[must_use]
    pub fn nav_active(&self, section: &str) -> &'static str {
        if self.current_path == section {
            "active"
        } else {
            ""
        }
    }

    /// Replace the pending toast, e.g. to show a validation summary.
    #[must_use]
    pub fn with_toast(mut self, toast: Toast) -> Self {
        self.toast = Some(toast);
        self
    }
}

/// The navigation section a path belongs to: `/cycles/3/edit` is `/cycles`.
fn section_of(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map_or_else(|| "/".to_string(), |segment| format!("/{segment}"))
}

impl<S> FromRequestParts<S> for Layout
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let current_path = section_of(parts.uri.path());
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self {
                current_path,
                ..Self::default()
            });
        };

        let admin_user = session
            .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .map(|admin| AdminUserView::from(&admin));
        let toast = session
            .remove::<Toast>(session_keys::TOAST)
            .await
            .ok()
            .flatten();

        Ok(Self {
            admin_user,
            current_path,
            toast,
        })
    }
}

/// Queue a toast for the next rendered page.
pub async fn flash(session: &Session, toast: Toast) {
    if let Err(e) = session.insert(session_keys::TOAST, toast).await {
        tracing::warn!("Failed to store toast in session: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_of() {
        assert_eq!(section_of("/"), "/");
        assert_eq!(section_of("/products"), "/products");
        assert_eq!(section_of("/cycles/3/products/9"), "/cycles");
    }

    #[test]
    fn test_nav_active() {
        let layout = Layout {
            current_path: "/orders".to_string(),
            ..Layout::default()
        };
        assert_eq!(layout.nav_active("/orders"), "active");
        assert_eq!(layout.nav_active("/"), "");
    }
}
