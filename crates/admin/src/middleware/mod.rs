//! HTTP middleware and extractors for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added in `main`)
//! 2. `TraceLayer` (request tracing)
//! 3. Security headers (admin policy, never cached)
//! 4. Session layer (SameSite=Strict, 24 hour inactivity expiry)
//! 5. `RequireAdminAuth` extractor on every page but login

pub mod auth;
pub mod rate_limit;
pub mod security_headers;
pub mod session;

pub use auth::{
    AdminAuthRejection, OptionalAdminAuth, RequireAdminAuth, clear_current_admin,
    set_current_admin,
};
pub use rate_limit::login_rate_limiter;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
