//! Customer orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::ShippingAddress;
use crate::types::{CycleProductId, Email, Money, OrderId, OrderStatus, ProductId, PurchaseCycleId, UserId};

/// A line of an order, snapshotted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub cycle_product_id: Option<CycleProductId>,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub email: Email,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub purchase_cycle_id: Option<PurchaseCycleId>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Customer-facing order number, e.g. `CH-000042`.
    #[must_use]
    pub fn number(&self) -> String {
        format!("CH-{:06}", self.id.as_i64())
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Insert payload for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub email: Email,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub shipping_address: ShippingAddress,
    pub purchase_cycle_id: Option<PurchaseCycleId>,
    pub notes: Option<String>,
}
