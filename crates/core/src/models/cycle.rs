//! Purchase cycles and their per-cycle product overrides.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::product::Product;
use crate::types::{CycleProductId, Money, ProductId, PurchaseCycleId, PurchaseCycleStatus, SeasonId};

/// An operational ordering window with its own prices and availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseCycle {
    pub id: PurchaseCycleId,
    pub name: String,
    #[serde(default)]
    pub season_id: Option<SeasonId>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub status: PurchaseCycleStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PurchaseCycle {
    /// Whether `day` falls within the cycle's window (inclusive).
    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.starts_on <= day && day <= self.ends_on
    }

    /// Whether customers can order from this cycle on `today`.
    #[must_use]
    pub fn is_accepting_orders(&self, today: NaiveDate) -> bool {
        self.status == PurchaseCycleStatus::Open && self.contains(today)
    }
}

/// Fields an admin provides when creating or editing a purchase cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseCycleInput {
    pub name: String,
    pub season_id: Option<SeasonId>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub status: PurchaseCycleStatus,
    pub notes: Option<String>,
}

/// Per-cycle override layered on a master product.
///
/// The name, image and base price are a snapshot taken when the override was
/// created, so the cycle keeps a stable record even if the product changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProduct {
    pub id: CycleProductId,
    pub cycle_id: PurchaseCycleId,
    pub product_id: ProductId,
    #[serde(default)]
    pub price_override: Option<Money>,
    pub is_available: bool,
    pub product_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub base_price: Money,
}

impl CycleProduct {
    /// Price charged in this cycle.
    #[must_use]
    pub fn effective_price(&self) -> Money {
        self.price_override.unwrap_or(self.base_price)
    }
}

/// Insert payload for a cycle override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProductInput {
    pub cycle_id: PurchaseCycleId,
    pub product_id: ProductId,
    pub price_override: Option<Money>,
    pub is_available: bool,
    pub product_name: String,
    pub image_url: Option<String>,
    pub base_price: Money,
}

impl CycleProductInput {
    /// Build an override from the product's current state.
    #[must_use]
    pub fn snapshot(
        cycle_id: PurchaseCycleId,
        product: &Product,
        price_override: Option<Money>,
        is_available: bool,
    ) -> Self {
        Self {
            cycle_id,
            product_id: product.id,
            price_override,
            is_available,
            product_name: product.name.clone(),
            image_url: product.image_url.clone(),
            base_price: product.price,
        }
    }
}

/// Editable fields of an existing override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProductUpdate {
    pub price_override: Option<Money>,
    pub is_available: bool,
}
