//! Entity records exchanged with the backend.
//!
//! Field names match the backend's column names, so rows deserialize directly
//! from the hosted REST API and serialize straight back into insert payloads.

pub mod cycle;
pub mod order;
pub mod product;
pub mod profile;
pub mod season;

pub use cycle::{CycleProduct, CycleProductInput, CycleProductUpdate, PurchaseCycle, PurchaseCycleInput};
pub use order::{NewOrder, Order, OrderItem};
pub use product::{Product, ProductInput};
pub use profile::{Profile, ProfileInput};
pub use season::{Season, SeasonInput};
