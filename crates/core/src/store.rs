//! Data-access trait for the relational backend.
//!
//! [`DataStore`] is the only way the storefront and admin console read or
//! write rows. Filtering and sorting are described by the caller through
//! [`ProductQuery`] and [`OrderQuery`]; implementations translate them into
//! backend queries or apply them in memory.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    CycleProduct, CycleProductInput, CycleProductUpdate, NewOrder, Order, Product, ProductInput,
    Profile, ProfileInput, PurchaseCycle, PurchaseCycleInput, Season, SeasonInput,
};
use crate::types::{
    CycleProductId, Email, OrderId, OrderStatus, ProductId, PurchaseCycleId, SeasonId, UserId,
    UserRole,
};

/// Errors returned by a [`DataStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row addressed by an update or delete does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Entity kind, e.g. `"product"`.
        entity: &'static str,
    },

    /// A uniqueness or reference constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend rejected the payload.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The backend could not be reached or answered unexpectedly.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub const fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    NameAsc,
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    pub const ALL: [Self; 4] = [Self::Newest, Self::NameAsc, Self::PriceAsc, Self::PriceDesc];

    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::NameAsc => "name",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::NameAsc => "Name (A-Z)",
            Self::PriceAsc => "Price: Low to High",
            Self::PriceDesc => "Price: High to Low",
        }
    }

    /// Parse a query-string value, falling back to the default order.
    #[must_use]
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value
            .and_then(|value| Self::ALL.into_iter().find(|sort| sort.as_str() == value))
            .unwrap_or_default()
    }
}

/// Filters and ordering for [`DataStore::list_products`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub season_id: Option<SeasonId>,
    pub available_only: bool,
    pub featured_only: bool,
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
    pub sort: ProductSort,
    pub limit: Option<usize>,
}

impl ProductQuery {
    /// Whether `product` passes the filters.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if self.season_id.is_some() && product.season_id != self.season_id {
            return false;
        }
        if self.available_only && !product.is_available {
            return false;
        }
        if self.featured_only && !product.is_featured {
            return false;
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            return product
                .name
                .to_lowercase()
                .contains(&search.to_lowercase());
        }
        true
    }

    /// Filter, sort and truncate `products` in place of a backend query.
    #[must_use]
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let mut matched: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            ProductSort::Newest => matched.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
            }),
            ProductSort::NameAsc => {
                matched.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            }
            ProductSort::PriceAsc => matched.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSort::PriceDesc => matched.sort_by(|a, b| b.price.cmp(&a.price)),
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Filters for [`DataStore::list_orders`]. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
    pub limit: Option<usize>,
}

impl OrderQuery {
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|status| order.status == status)
            && self.user_id.is_none_or(|user_id| order.user_id == user_id)
    }
}

/// Row-level access to the relational backend.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;

    // Seasons, ordered by start date.
    async fn list_seasons(&self) -> StoreResult<Vec<Season>>;
    async fn get_season(&self, id: SeasonId) -> StoreResult<Option<Season>>;
    async fn create_season(&self, input: &SeasonInput) -> StoreResult<Season>;
    async fn update_season(&self, id: SeasonId, input: &SeasonInput) -> StoreResult<Season>;
    /// Fails with [`StoreError::Conflict`] while products or cycles reference the season.
    async fn delete_season(&self, id: SeasonId) -> StoreResult<()>;

    // Products.
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>>;
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;
    /// Like [`DataStore::get_product`], but never answered from a read cache.
    /// Checkout prices from this so a product disabled by another process
    /// stops selling immediately.
    async fn get_product_fresh(&self, id: ProductId) -> StoreResult<Option<Product>> {
        self.get_product(id).await
    }
    async fn create_product(&self, input: &ProductInput) -> StoreResult<Product>;
    async fn update_product(&self, id: ProductId, input: &ProductInput) -> StoreResult<Product>;
    async fn set_product_availability(&self, id: ProductId, available: bool) -> StoreResult<Product>;
    /// Fails with [`StoreError::Conflict`] while a cycle product references it.
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;

    // Purchase cycles, newest start first.
    async fn list_purchase_cycles(&self) -> StoreResult<Vec<PurchaseCycle>>;
    async fn get_purchase_cycle(&self, id: PurchaseCycleId) -> StoreResult<Option<PurchaseCycle>>;
    async fn create_purchase_cycle(&self, input: &PurchaseCycleInput) -> StoreResult<PurchaseCycle>;
    async fn update_purchase_cycle(
        &self,
        id: PurchaseCycleId,
        input: &PurchaseCycleInput,
    ) -> StoreResult<PurchaseCycle>;
    /// Also deletes the cycle's products.
    async fn delete_purchase_cycle(&self, id: PurchaseCycleId) -> StoreResult<()>;

    // Cycle products.
    async fn list_cycle_products(&self, cycle_id: PurchaseCycleId) -> StoreResult<Vec<CycleProduct>>;
    /// Fails with [`StoreError::Conflict`] if the product is already in the cycle.
    async fn create_cycle_product(&self, input: &CycleProductInput) -> StoreResult<CycleProduct>;
    async fn update_cycle_product(
        &self,
        id: CycleProductId,
        update: &CycleProductUpdate,
    ) -> StoreResult<CycleProduct>;
    async fn delete_cycle_product(&self, id: CycleProductId) -> StoreResult<()>;

    // Orders.
    async fn list_orders(&self, query: &OrderQuery) -> StoreResult<Vec<Order>>;
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;
    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order>;
    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<Order>;

    // Profiles, oldest first.
    async fn list_profiles(&self) -> StoreResult<Vec<Profile>>;
    async fn get_profile(&self, id: UserId) -> StoreResult<Option<Profile>>;
    async fn find_profile_by_email(&self, email: &Email) -> StoreResult<Option<Profile>>;
    /// Insert the profile, or merge the given fields into the existing row.
    async fn upsert_profile(&self, input: &ProfileInput) -> StoreResult<Profile>;
    async fn set_profile_role(&self, id: UserId, role: UserRole) -> StoreResult<Profile>;
}
