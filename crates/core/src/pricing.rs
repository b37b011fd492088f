//! Shipping policy and order totals.

use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Flat shipping fee, in cents, charged below the free-shipping threshold.
pub const FLAT_SHIPPING_CENTS: i64 = 800;

/// Subtotal, in cents, at or above which shipping is free.
pub const FREE_SHIPPING_THRESHOLD_CENTS: i64 = 7_500;

#[must_use]
pub fn free_shipping_threshold() -> Money {
    Money::from_cents(FREE_SHIPPING_THRESHOLD_CENTS)
}

/// Shipping charged for a subtotal.
#[must_use]
pub fn shipping_for(subtotal: Money) -> Money {
    if subtotal.is_zero() || subtotal >= free_shipping_threshold() {
        Money::ZERO
    } else {
        Money::from_cents(FLAT_SHIPPING_CENTS)
    }
}

/// Subtotal, shipping and grand total of a cart or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
}

impl OrderTotals {
    #[must_use]
    pub fn for_subtotal(subtotal: Money) -> Self {
        let shipping = shipping_for(subtotal);
        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }

    /// How much more the customer must spend to ship for free.
    #[must_use]
    pub fn remaining_for_free_shipping(&self) -> Option<Money> {
        if self.shipping.is_zero() {
            None
        } else {
            Some(Money::new(
                free_shipping_threshold().amount() - self.subtotal.amount(),
            ))
        }
    }
}
