//! Storefront catalog assembly.
//!
//! The master catalog holds one price and one availability flag per product.
//! While a purchase cycle is open, its cycle products override those values:
//! the override price wins when present, and a product is purchasable only
//! when both the master product and its cycle entry are available. Products
//! without a cycle entry keep their master values.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::cart::CartItem;
use crate::models::{CycleProduct, Product, PurchaseCycle, Season};
use crate::types::{CycleProductId, Money, ProductId, SeasonId};

/// A product as the storefront shows it right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub product: Product,
    pub price: Money,
    pub is_available: bool,
    pub cycle_product_id: Option<CycleProductId>,
}

impl Listing {
    /// Listing straight from the master catalog.
    #[must_use]
    pub fn from_master(product: Product) -> Self {
        Self {
            price: product.price,
            is_available: product.is_available,
            cycle_product_id: None,
            product,
        }
    }

    /// Listing with a cycle override applied.
    #[must_use]
    pub fn with_override(product: Product, cycle_product: &CycleProduct) -> Self {
        Self {
            price: cycle_product.price_override.unwrap_or(product.price),
            is_available: product.is_available && cycle_product.is_available,
            cycle_product_id: Some(cycle_product.id),
            product,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.product.id
    }

    /// Whether the cycle changed the price from the master catalog.
    #[must_use]
    pub fn has_cycle_price(&self) -> bool {
        self.price != self.product.price
    }

    /// Cart line for `quantity` units at the listed price.
    #[must_use]
    pub fn to_cart_item(&self, quantity: u32) -> CartItem {
        CartItem {
            product_id: self.product.id,
            cycle_product_id: self.cycle_product_id,
            name: self.product.name.clone(),
            unit_price: self.price,
            image_url: self.product.image_url.clone(),
            quantity,
        }
    }
}

/// The season running on `today`, preferring the one that started most recently.
#[must_use]
pub fn current_season(seasons: &[Season], today: NaiveDate) -> Option<&Season> {
    seasons
        .iter()
        .filter(|season| season.is_current(today))
        .max_by_key(|season| season.start_date)
}

/// The purchase cycle customers are ordering from on `today`.
///
/// Only cycles with status `open` whose window contains `today` qualify. The
/// first one bound to `season` wins, otherwise the first candidate in `cycles`
/// order. Stores list cycles newest first.
#[must_use]
pub fn open_cycle(
    cycles: &[PurchaseCycle],
    season: Option<SeasonId>,
    today: NaiveDate,
) -> Option<&PurchaseCycle> {
    let mut accepting = cycles.iter().filter(|cycle| cycle.is_accepting_orders(today));
    let first = accepting.clone().next();
    season
        .and_then(|season| accepting.find(|cycle| cycle.season_id == Some(season)))
        .or(first)
}

/// Merge cycle overrides into master products.
#[must_use]
pub fn build_listings(products: Vec<Product>, overrides: &[CycleProduct]) -> Vec<Listing> {
    let by_product: HashMap<ProductId, &CycleProduct> = overrides
        .iter()
        .map(|cycle_product| (cycle_product.product_id, cycle_product))
        .collect();

    products
        .into_iter()
        .map(|product| match by_product.get(&product.id) {
            Some(cycle_product) => Listing::with_override(product, cycle_product),
            None => Listing::from_master(product),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{PurchaseCycleId, PurchaseCycleStatus};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn product(id: i64, cents: i64, available: bool) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Money::from_cents(cents),
            image_url: None,
            season_id: None,
            is_available: available,
            is_featured: false,
            created_at: Utc::now(),
        }
    }

    fn override_for(id: i64, product_id: i64, price: Option<i64>, available: bool) -> CycleProduct {
        CycleProduct {
            id: CycleProductId::new(id),
            cycle_id: PurchaseCycleId::new(1),
            product_id: ProductId::new(product_id),
            price_override: price.map(Money::from_cents),
            is_available: available,
            product_name: String::new(),
            image_url: None,
            base_price: Money::ZERO,
        }
    }

    fn cycle(id: i64, season: Option<i64>, starts: NaiveDate, ends: NaiveDate, status: PurchaseCycleStatus) -> PurchaseCycle {
        PurchaseCycle {
            id: PurchaseCycleId::new(id),
            name: format!("Cycle {id}"),
            season_id: season.map(SeasonId::new),
            starts_on: starts,
            ends_on: ends,
            status,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_override_price_and_availability() {
        let listings = build_listings(
            vec![product(1, 2000, true), product(2, 1500, true), product(3, 900, false)],
            &[
                override_for(10, 1, Some(1800), true),
                override_for(11, 2, None, false),
                override_for(12, 3, None, true),
            ],
        );

        let one = &listings[0];
        assert_eq!(one.price, Money::from_cents(1800));
        assert!(one.is_available);
        assert!(one.has_cycle_price());
        assert_eq!(one.cycle_product_id, Some(CycleProductId::new(10)));

        let two = &listings[1];
        assert_eq!(two.price, Money::from_cents(1500));
        assert!(!two.is_available);
        assert!(!two.has_cycle_price());

        // Cycle availability cannot revive a product disabled in the master catalog.
        assert!(!listings[2].is_available);
    }

    #[test]
    fn test_products_outside_cycle_keep_master_values() {
        let listings = build_listings(vec![product(1, 2000, true)], &[]);
        assert_eq!(listings[0].price, Money::from_cents(2000));
        assert!(listings[0].is_available);
        assert_eq!(listings[0].cycle_product_id, None);
    }

    #[test]
    fn test_cart_item_carries_cycle_price() {
        let listing = Listing::with_override(product(1, 2000, true), &override_for(4, 1, Some(1700), true));
        let item = listing.to_cart_item(2);
        assert_eq!(item.unit_price, Money::from_cents(1700));
        assert_eq!(item.cycle_product_id, Some(CycleProductId::new(4)));
        assert_eq!(item.line_total(), Money::from_cents(3400));
    }

    #[test]
    fn test_open_cycle_selection() {
        let today = date(2, 5);
        let cycles = vec![
            cycle(1, None, date(2, 1), date(2, 10), PurchaseCycleStatus::Open),
            cycle(2, Some(7), date(1, 20), date(2, 14), PurchaseCycleStatus::Open),
            cycle(3, Some(7), date(2, 3), date(2, 8), PurchaseCycleStatus::Planned),
            cycle(4, None, date(3, 1), date(3, 10), PurchaseCycleStatus::Open),
        ];

        assert_eq!(open_cycle(&cycles, Some(SeasonId::new(7)), today).unwrap().id.as_i64(), 2);
        assert_eq!(open_cycle(&cycles, None, today).unwrap().id.as_i64(), 1);
        assert!(open_cycle(&cycles, None, date(4, 1)).is_none());
    }

    #[test]
    fn test_open_cycle_takes_first_candidate_in_list_order() {
        let today = date(2, 5);
        let cycles = vec![
            cycle(5, None, date(1, 15), date(2, 20), PurchaseCycleStatus::Open),
            cycle(6, None, date(2, 1), date(2, 20), PurchaseCycleStatus::Open),
            cycle(7, Some(3), date(1, 10), date(2, 20), PurchaseCycleStatus::Open),
            cycle(8, Some(3), date(2, 2), date(2, 20), PurchaseCycleStatus::Open),
        ];

        assert_eq!(open_cycle(&cycles, None, today).unwrap().id.as_i64(), 5);
        assert_eq!(open_cycle(&cycles, Some(SeasonId::new(3)), today).unwrap().id.as_i64(), 7);
        // A season with no bound cycle falls back to the first candidate
        assert_eq!(open_cycle(&cycles, Some(SeasonId::new(9)), today).unwrap().id.as_i64(), 5);
    }

    #[test]
    fn test_current_season_prefers_latest_start() {
        let season = |id: i64, start: NaiveDate, end: NaiveDate| Season {
            id: SeasonId::new(id),
            name: format!("Season {id}"),
            description: None,
            start_date: start,
            end_date: end,
            created_at: Utc::now(),
        };
        let seasons = vec![
            season(1, date(1, 1), date(3, 31)),
            season(2, date(2, 1), date(2, 14)),
            season(3, date(4, 1), date(4, 30)),
        ];
        assert_eq!(current_season(&seasons, date(2, 10)).unwrap().id, SeasonId::new(2));
        assert_eq!(current_season(&seasons, date(3, 1)).unwrap().id, SeasonId::new(1));
        assert!(current_season(&seasons, date(5, 1)).is_none());
    }
}
