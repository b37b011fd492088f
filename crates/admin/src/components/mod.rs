//! Shared template components for admin pages.

pub mod layout;

pub use layout::{AdminUserView, Layout, flash};
