//! Catalog service.
//!
//! Resolves what the shop sells today: the current season, the open purchase
//! cycle and that cycle's overrides, merged over the master catalog.

use chocolatier_core::catalog::{self, Listing};
use chocolatier_core::models::{CycleProduct, PurchaseCycle, Season};
use chocolatier_core::store::{DataStore, ProductQuery, ProductSort, StoreResult};
use chocolatier_core::{ProductId, SeasonId};
use chrono::NaiveDate;
use tracing::instrument;

/// Everything the catalog depends on for one request.
#[derive(Debug, Clone, Default)]
pub struct Storefront {
    /// All seasons, oldest first.
    pub seasons: Vec<Season>,
    pub current_season: Option<Season>,
    pub open_cycle: Option<PurchaseCycle>,
    /// Overrides of the open cycle.
    pub overrides: Vec<CycleProduct>,
}

impl Storefront {
    /// Apply the open cycle's overrides to master products.
    #[must_use]
    pub fn price(&self, products: Vec<chocolatier_core::models::Product>) -> Vec<Listing> {
        catalog::build_listings(products, &self.overrides)
    }

    #[must_use]
    pub fn season(&self, id: SeasonId) -> Option<&Season> {
        self.seasons.iter().find(|season| season.id == id)
    }
}

/// Read-side catalog operations.
pub struct CatalogService<'a> {
    store: &'a dyn DataStore,
    today: NaiveDate,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DataStore, today: NaiveDate) -> Self {
        Self { store, today }
    }

    /// Load seasons, the open cycle and its overrides.
    ///
    /// # Errors
    ///
    /// Returns the store error if any lookup fails.
    #[instrument(skip(self), fields(today = %self.today))]
    pub async fn storefront(&self) -> StoreResult<Storefront> {
        let seasons = self.store.list_seasons().await?;
        let current_season = catalog::current_season(&seasons, self.today).cloned();

        let cycles = self.store.list_purchase_cycles().await?;
        let open_cycle = catalog::open_cycle(
            &cycles,
            current_season.as_ref().map(|season| season.id),
            self.today,
        )
        .cloned();

        let overrides = match &open_cycle {
            Some(cycle) => self.store.list_cycle_products(cycle.id).await?,
            None => Vec::new(),
        };

        Ok(Storefront {
            seasons,
            current_season,
            open_cycle,
            overrides,
        })
    }

    /// Listings matching `query`, priced for today.
    ///
    /// Price sorts are applied to the effective price, since a cycle override
    /// can reorder products relative to the master catalog.
    ///
    /// # Errors
    ///
    /// Returns the store error if any lookup fails.
    #[instrument(skip(self, storefront))]
    pub async fn listings(
        &self,
        storefront: &Storefront,
        query: &ProductQuery,
    ) -> StoreResult<Vec<Listing>> {
        let products = self.store.list_products(query).await?;
        let mut listings = storefront.price(products);
        match query.sort {
            ProductSort::PriceAsc => listings.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSort::PriceDesc => listings.sort_by(|a, b| b.price.cmp(&a.price)),
            ProductSort::Newest | ProductSort::NameAsc => {}
        }
        Ok(listings)
    }

    /// One product, priced for today.
    ///
    /// # Errors
    ///
    /// Returns the store error if the lookup fails.
    #[instrument(skip(self, storefront))]
    pub async fn listing(
        &self,
        storefront: &Storefront,
        id: ProductId,
    ) -> StoreResult<Option<Listing>> {
        let product = self.store.get_product(id).await?;
        Ok(product.and_then(|product| storefront.price(vec![product]).into_iter().next()))
    }

    /// Listings for the given products, read past any product cache so
    /// checkout sees availability changes made from the admin console. Ids
    /// with no product are skipped, so callers match results on [`Listing::id`].
    ///
    /// # Errors
    ///
    /// Returns the store error if a lookup fails.
    pub async fn listings_for(
        &self,
        storefront: &Storefront,
        ids: impl IntoIterator<Item = ProductId>,
    ) -> StoreResult<Vec<Listing>> {
        let mut products = Vec::new();
        for id in ids {
            if let Some(product) = self.store.get_product_fresh(id).await? {
                products.push(product);
            }
        }
        Ok(storefront.price(products))
    }
}
