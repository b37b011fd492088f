//! Business logic services for admin.

pub mod auth;
pub mod dashboard;

pub use auth::{AdminAuthError, AdminAuthService};
pub use dashboard::DashboardStats;
