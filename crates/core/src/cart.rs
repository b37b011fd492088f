//! Shopping cart.
//!
//! The cart is a plain value stored in the customer's session. Prices on the
//! lines are the prices seen when the item was added; checkout re-prices every
//! line against the current listing.

use serde::{Deserialize, Serialize};

use crate::types::{CycleProductId, Money, ProductId};

/// Upper bound on the quantity of a single line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Errors from cart operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("that item is not in your cart")]
    NotInCart,
}

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub cycle_product_id: Option<CycleProductId>,
    pub name: String,
    pub unit_price: Money,
    #[serde(default)]
    pub image_url: Option<String>,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A customer's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    fn position(&self, product_id: ProductId) -> Result<usize, CartError> {
        self.items
            .iter()
            .position(|item| item.product_id == product_id)
            .ok_or(CartError::NotInCart)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Result<&mut CartItem, CartError> {
        self.items
            .iter_mut()
            .find(|item| item.product_id == product_id)
            .ok_or(CartError::NotInCart)
    }

    /// Add `item.quantity` units, merging with an existing line for the same
    /// product. The line's price and snapshot fields are refreshed from `item`.
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] if `item.quantity` is zero.
    pub fn add(&mut self, item: CartItem) -> Result<u32, CartError> {
        if item.quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if let Ok(line) = self.line_mut(item.product_id) {
            let quantity = line.quantity.saturating_add(item.quantity).min(MAX_LINE_QUANTITY);
            *line = CartItem { quantity, ..item };
            Ok(quantity)
        } else {
            let quantity = item.quantity.min(MAX_LINE_QUANTITY);
            self.items.push(CartItem { quantity, ..item });
            Ok(quantity)
        }
    }

    /// Set the quantity of a line. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the product has no line.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            self.remove(product_id)?;
        } else {
            self.line_mut(product_id)?.quantity = quantity.min(MAX_LINE_QUANTITY);
        }
        Ok(())
    }

    /// Add one unit to a line, up to [`MAX_LINE_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the product has no line.
    pub fn increment(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let line = self.line_mut(product_id)?;
        line.quantity = line.quantity.saturating_add(1).min(MAX_LINE_QUANTITY);
        Ok(())
    }

    /// Remove one unit from a line; a line at quantity 1 is removed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the product has no line.
    pub fn decrement(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let quantity = self.line_mut(product_id)?.quantity;
        self.set_quantity(product_id, quantity.saturating_sub(1))
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the product has no line.
    pub fn remove(&mut self, product_id: ProductId) -> Result<CartItem, CartError> {
        let index = self.position(product_id)?;
        Ok(self.items.remove(index))
    }

    /// Replace a line's unit price and cycle override after re-pricing.
    pub fn reprice(
        &mut self,
        product_id: ProductId,
        unit_price: Money,
        cycle_product_id: Option<CycleProductId>,
    ) {
        if let Some(line) = self.items.iter_mut().find(|item| item.product_id == product_id) {
            line.unit_price = unit_price;
            line.cycle_product_id = cycle_product_id;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i64, cents: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            cycle_product_id: None,
            name: format!("Bonbon {id}"),
            unit_price: Money::from_cents(cents),
            image_url: None,
            quantity,
        }
    }

    #[test]
    fn test_add_merges_lines() {
        let mut cart = Cart::new();
        cart.add(item(1, 1200, 1)).unwrap();
        cart.add(item(2, 500, 2)).unwrap();
        cart.add(item(1, 1100, 2)).unwrap();

        assert_eq!(cart.items().len(), 2);
        let line = cart.get(ProductId::new(1)).unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price, Money::from_cents(1100));
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal(), Money::from_cents(4300));
    }

    #[test]
    fn test_add_rejects_zero_and_caps_quantity() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(item(1, 100, 0)), Err(CartError::ZeroQuantity));
        assert!(cart.is_empty());

        cart.add(item(1, 100, 98)).unwrap();
        assert_eq!(cart.add(item(1, 100, 5)).unwrap(), MAX_LINE_QUANTITY);
        assert_eq!(cart.add(item(2, 100, 250)).unwrap(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::new();
        cart.add(item(1, 100, 1)).unwrap();
        cart.set_quantity(ProductId::new(1), 4).unwrap();
        assert_eq!(cart.item_count(), 4);

        cart.set_quantity(ProductId::new(1), 500).unwrap();
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY);

        cart.set_quantity(ProductId::new(1), 0).unwrap();
        assert!(cart.is_empty());

        assert_eq!(
            cart.set_quantity(ProductId::new(9), 1),
            Err(CartError::NotInCart)
        );
    }

    #[test]
    fn test_increment_and_decrement() {
        let mut cart = Cart::new();
        cart.add(item(1, 100, 1)).unwrap();
        cart.increment(ProductId::new(1)).unwrap();
        assert_eq!(cart.item_count(), 2);

        cart.decrement(ProductId::new(1)).unwrap();
        assert_eq!(cart.item_count(), 1);

        cart.decrement(ProductId::new(1)).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.decrement(ProductId::new(1)), Err(CartError::NotInCart));
    }

    #[test]
    fn test_increment_stops_at_max() {
        let mut cart = Cart::new();
        cart.add(item(1, 100, MAX_LINE_QUANTITY)).unwrap();
        cart.increment(ProductId::new(1)).unwrap();
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(item(1, 100, 1)).unwrap();
        cart.add(item(2, 100, 1)).unwrap();

        let removed = cart.remove(ProductId::new(1)).unwrap();
        assert_eq!(removed.product_id, ProductId::new(1));
        assert_eq!(cart.items().len(), 1);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::ZERO);
    }

    #[test]
    fn test_cart_survives_session_serialization() {
        let mut cart = Cart::new();
        cart.add(item(3, 2450, 2)).unwrap();
        let json = serde_json::to_value(&cart).unwrap();
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
