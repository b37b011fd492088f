//! Session-related types.
//!
//! The signed-in user is mirrored into the session at login so pages can be
//! rendered without a provider round-trip. Logout clears the mirror and
//! revokes the provider session.

use serde::{Deserialize, Serialize};

use chocolatier_core::auth::AuthSession;
use chocolatier_core::{Email, UserId};

/// Session-stored user identity.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth provider user id, also the profile id.
    pub id: UserId,
    pub email: Email,
    pub full_name: Option<String>,
    /// Provider access token, revoked at logout.
    pub access_token: String,
}

impl CurrentUser {
    #[must_use]
    pub fn from_session(session: AuthSession, full_name: Option<String>) -> Self {
        Self {
            id: session.user.id,
            email: session.user.email,
            full_name,
            access_token: session.access_token,
        }
    }

    /// Name for the navigation bar.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.full_name
            .clone()
            .unwrap_or_else(|| self.email.local_part().to_string())
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// The signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// The shopping cart.
    pub const CART: &str = "cart";

    /// Notification shown once on the next rendered page.
    pub const TOAST: &str = "toast";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chocolatier_core::auth::AuthUser;

    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            access_token: "very-secret-token".to_string(),
            user: AuthUser {
                id: UserId::generate(),
                email: Email::parse("truffle@example.com").unwrap(),
            },
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let user = CurrentUser::from_session(session(), None);
        let debug_output = format!("{user:?}");
        assert!(debug_output.contains("truffle@example.com"));
        assert!(!debug_output.contains("very-secret-token"));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = CurrentUser::from_session(session(), None);
        assert_eq!(user.display_name(), "truffle");
        let named = CurrentUser::from_session(session(), Some("Theo Broma".to_string()));
        assert_eq!(named.display_name(), "Theo Broma");
    }
}
