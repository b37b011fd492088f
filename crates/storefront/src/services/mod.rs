//! Business logic services for storefront.
//!
//! Route handlers stay thin: they parse forms, call a service and pick a
//! template or redirect.
//!
//! # Services
//!
//! - `catalog` - Current season, open purchase cycle and priced listings
//! - `checkout` - Cart re-pricing and order placement
//! - `account` - Registration, sign-in and sign-out against the auth provider

pub mod account;
pub mod catalog;
pub mod checkout;

pub use account::{AccountError, AccountService, Registration};
pub use catalog::{CatalogService, Storefront};
pub use checkout::{CheckoutService, RepriceReport};
