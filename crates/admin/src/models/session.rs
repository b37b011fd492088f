//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use chocolatier_core::auth::AuthSession;
use chocolatier_core::models::Profile;
use chocolatier_core::{Email, UserId};

/// Session-stored admin identity.
///
/// Minimal data stored in the session to identify the logged-in admin. The
/// role itself is not cached; it is re-read from the profile on every request.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Auth provider user id, also the profile id.
    pub id: UserId,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name.
    pub name: String,
    /// Provider access token, revoked at logout.
    pub access_token: String,
}

impl CurrentAdmin {
    #[must_use]
    pub fn new(session: AuthSession, profile: &Profile) -> Self {
        Self {
            id: session.user.id,
            email: session.user.email,
            name: profile.display_name(),
            access_token: session.access_token,
        }
    }
}

impl std::fmt::Debug for CurrentAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentAdmin")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// One-shot notification shown on the next page.
    pub const TOAST: &str = "toast";
}
