//! Session-held types for the storefront.
//!
//! Catalog, cart and order types come from `chocolatier_core`; this module
//! only adds what the storefront keeps in the server-side session.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
