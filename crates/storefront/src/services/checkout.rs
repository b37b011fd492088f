//! Checkout service.
//!
//! Cart lines carry the price seen when they were added. Before an order is
//! placed every line is re-priced against today's listing; lines that can no
//! longer be bought are dropped and the customer is sent back to review.

use chocolatier_core::address::ShippingAddress;
use chocolatier_core::cart::Cart;
use chocolatier_core::catalog::Listing;
use chocolatier_core::models::{NewOrder, Order, OrderItem};
use chocolatier_core::pricing::OrderTotals;
use chocolatier_core::store::{DataStore, StoreError, StoreResult};
use chocolatier_core::{OrderStatus, PurchaseCycleId};
use tracing::instrument;

use crate::models::CurrentUser;

/// What re-pricing changed in a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepriceReport {
    /// Names of lines removed because they are gone or unavailable.
    pub removed: Vec<String>,
    /// Names of lines whose unit price changed.
    pub repriced: Vec<String>,
}

impl RepriceReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty() && self.repriced.is_empty()
    }

    /// Message for the toast shown when the cart changed.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        if !self.removed.is_empty() {
            Some(format!(
                "Some items are no longer available and were removed from your cart: {}.",
                self.removed.join(", ")
            ))
        } else if !self.repriced.is_empty() {
            Some(format!(
                "Prices changed for {}. Please review your order.",
                self.repriced.join(", ")
            ))
        } else {
            None
        }
    }
}

/// Bring every cart line in line with `listings`.
///
/// A line whose product has no listing or is not available is removed. The
/// remaining lines take the listed price and the listing's cycle override,
/// which is cleared when the product is sold from the master catalog. Only
/// price changes are reported.
#[must_use]
pub fn reprice_cart(cart: &mut Cart, listings: &[Listing]) -> RepriceReport {
    let mut report = RepriceReport::default();
    let lines: Vec<_> = cart.items().to_vec();

    for line in lines {
        match listings.iter().find(|listing| listing.id() == line.product_id) {
            Some(listing) if listing.is_available => {
                if listing.price != line.unit_price
                    || listing.cycle_product_id != line.cycle_product_id
                {
                    cart.reprice(line.product_id, listing.price, listing.cycle_product_id);
                }
                if listing.price != line.unit_price {
                    report.repriced.push(line.name.clone());
                }
            }
            _ => {
                // Line exists; removal cannot fail.
                let _ = cart.remove(line.product_id);
                report.removed.push(line.name.clone());
            }
        }
    }

    report
}

/// Places orders for a signed-in customer.
pub struct CheckoutService<'a> {
    store: &'a dyn DataStore,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    /// Place an order for the whole cart.
    ///
    /// The cart must already be re-priced with [`reprice_cart`]. New orders
    /// start as `pending`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for an empty cart and the store error if
    /// the insert fails.
    #[instrument(skip(self, user, cart, address), fields(user_id = %user.id))]
    pub async fn place_order(
        &self,
        user: &CurrentUser,
        cart: &Cart,
        address: ShippingAddress,
        notes: Option<String>,
        purchase_cycle_id: Option<PurchaseCycleId>,
    ) -> StoreResult<Order> {
        if cart.is_empty() {
            return Err(StoreError::Invalid("cart is empty".to_string()));
        }

        let totals = OrderTotals::for_subtotal(cart.subtotal());
        let items = cart
            .items()
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id,
                cycle_product_id: line.cycle_product_id,
                name: line.name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();

        let order = self
            .store
            .create_order(&NewOrder {
                user_id: user.id,
                email: user.email.clone(),
                status: OrderStatus::Pending,
                items,
                subtotal: totals.subtotal,
                shipping: totals.shipping,
                total: totals.total,
                shipping_address: address,
                purchase_cycle_id,
                notes,
            })
            .await?;

        tracing::info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chocolatier_core::cart::CartItem;
    use chocolatier_core::models::{CycleProduct, Product};
    use chocolatier_core::{CycleProductId, Money, ProductId, PurchaseCycleId};
    use chrono::Utc;

    use super::*;

    fn product(id: i64, name: &str, cents: i64, available: bool) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: String::new(),
            price: Money::from_cents(cents),
            image_url: None,
            season_id: None,
            is_available: available,
            is_featured: false,
            created_at: Utc::now(),
        }
    }

    fn line(id: i64, name: &str, cents: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            cycle_product_id: None,
            name: name.to_string(),
            unit_price: Money::from_cents(cents),
            image_url: None,
            quantity,
        }
    }

    #[test]
    fn test_reprice_keeps_unchanged_cart() {
        let mut cart = Cart::new();
        cart.add(line(1, "Truffles", 2800, 2)).unwrap();
        let listings = vec![Listing::from_master(product(1, "Truffles", 2800, true))];

        let report = reprice_cart(&mut cart, &listings);
        assert!(report.is_clean());
        assert_eq!(report.message(), None);
        assert_eq!(cart.subtotal(), Money::from_cents(5600));
    }

    #[test]
    fn test_reprice_updates_prices_and_drops_unavailable() {
        let mut cart = Cart::new();
        cart.add(line(1, "Truffles", 2800, 1)).unwrap();
        cart.add(line(2, "Bark", 1400, 1)).unwrap();
        cart.add(line(3, "Retired Bar", 500, 1)).unwrap();
        let listings = vec![
            Listing::from_master(product(1, "Truffles", 2500, true)),
            Listing::from_master(product(2, "Bark", 1400, false)),
        ];

        let report = reprice_cart(&mut cart, &listings);
        assert_eq!(report.repriced, vec!["Truffles".to_string()]);
        assert_eq!(
            report.removed,
            vec!["Bark".to_string(), "Retired Bar".to_string()]
        );
        assert!(report.message().unwrap().contains("Bark, Retired Bar"));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal(), Money::from_cents(2500));
    }

    fn cycle_product(id: i64, product: &Product, override_cents: Option<i64>) -> CycleProduct {
        CycleProduct {
            id: CycleProductId::new(id),
            cycle_id: PurchaseCycleId::new(1),
            product_id: product.id,
            price_override: override_cents.map(Money::from_cents),
            is_available: true,
            product_name: product.name.clone(),
            image_url: None,
            base_price: product.price,
        }
    }

    #[test]
    fn test_reprice_links_line_to_cycle_override() {
        let mut cart = Cart::new();
        cart.add(line(1, "Truffles", 2800, 1)).unwrap();
        let truffles = product(1, "Truffles", 2800, true);
        let override_row = cycle_product(7, &truffles, Some(2500));
        let listings = vec![Listing::with_override(truffles, &override_row)];

        let report = reprice_cart(&mut cart, &listings);
        assert_eq!(report.repriced, vec!["Truffles".to_string()]);
        let item = cart.items().first().unwrap();
        assert_eq!(item.unit_price, Money::from_cents(2500));
        assert_eq!(item.cycle_product_id, Some(CycleProductId::new(7)));
    }

    #[test]
    fn test_reprice_updates_cycle_link_at_same_price() {
        // Override without its own price: same price, new cycle link
        let mut cart = Cart::new();
        cart.add(line(1, "Truffles", 2800, 1)).unwrap();
        let truffles = product(1, "Truffles", 2800, true);
        let override_row = cycle_product(9, &truffles, None);
        let listings = vec![Listing::with_override(truffles, &override_row)];

        let report = reprice_cart(&mut cart, &listings);
        assert!(report.is_clean());
        assert_eq!(
            cart.items().first().unwrap().cycle_product_id,
            Some(CycleProductId::new(9))
        );
    }

    #[test]
    fn test_reprice_clears_stale_cycle_link() {
        let mut cart = Cart::new();
        let mut stale = line(1, "Truffles", 2500, 1);
        stale.cycle_product_id = Some(CycleProductId::new(7));
        cart.add(stale).unwrap();
        let listings = vec![Listing::from_master(product(1, "Truffles", 2800, true))];

        let report = reprice_cart(&mut cart, &listings);
        assert_eq!(report.repriced, vec!["Truffles".to_string()]);
        let item = cart.items().first().unwrap();
        assert_eq!(item.unit_price, Money::from_cents(2800));
        assert_eq!(item.cycle_product_id, None);
    }
}
