//! Cache types for catalog reads.

use chocolatier_core::models::{Product, Season};
use chocolatier_core::store::ProductQuery;
use chocolatier_core::{ProductId, SeasonId};

/// Cache key for seasons and products.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Seasons,
    Season(SeasonId),
    Products(ProductQuery),
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Seasons(Vec<Season>),
    Season(Box<Season>),
    Products(Vec<Product>),
    Product(Box<Product>),
}
