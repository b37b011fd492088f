//! [`DataStore`] over the hosted REST API.

use async_trait::async_trait;
use chocolatier_core::models::{
    CycleProduct, CycleProductInput, CycleProductUpdate, NewOrder, Order, Product, ProductInput,
    Profile, ProfileInput, PurchaseCycle, PurchaseCycleInput, Season, SeasonInput,
};
use chocolatier_core::store::{DataStore, OrderQuery, ProductQuery, ProductSort, StoreError, StoreResult};
use chocolatier_core::{
    CycleProductId, Email, OrderId, OrderStatus, ProductId, PurchaseCycleId, SeasonId, UserId,
    UserRole,
};
use serde_json::json;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::{HostedClient, RestQuery};

const SEASONS: &str = "seasons";
const PRODUCTS: &str = "products";
const PURCHASE_CYCLES: &str = "purchase_cycles";
const CYCLE_PRODUCTS: &str = "cycle_products";
const ORDERS: &str = "orders";
const PROFILES: &str = "profiles";

/// Translate a product query into REST filters and ordering.
pub(crate) fn product_rest_query(query: &ProductQuery) -> RestQuery {
    let mut rest = RestQuery::table(PRODUCTS);
    if let Some(season_id) = query.season_id {
        rest = rest.eq("season_id", season_id);
    }
    if query.available_only {
        rest = rest.eq("is_available", true);
    }
    if query.featured_only {
        rest = rest.eq("is_featured", true);
    }
    if let Some(search) = &query.search {
        rest = rest.contains_ci("name", search);
    }
    rest = match query.sort {
        ProductSort::Newest => rest.order("created_at", false).order("id", false),
        ProductSort::NameAsc => rest.order("name", true),
        ProductSort::PriceAsc => rest.order("price", true).order("name", true),
        ProductSort::PriceDesc => rest.order("price", false).order("name", true),
    };
    if let Some(limit) = query.limit {
        rest = rest.limit(limit);
    }
    rest
}

fn order_rest_query(query: &OrderQuery) -> RestQuery {
    let mut rest = RestQuery::table(ORDERS);
    if let Some(status) = query.status {
        rest = rest.eq("status", status);
    }
    if let Some(user_id) = query.user_id {
        rest = rest.eq("user_id", user_id);
    }
    rest = rest.order("created_at", false).order("id", false);
    if let Some(limit) = query.limit {
        rest = rest.limit(limit);
    }
    rest
}

fn require_deleted(count: usize, entity: &'static str) -> StoreResult<()> {
    if count == 0 {
        Err(StoreError::not_found(entity))
    } else {
        Ok(())
    }
}

#[async_trait]
impl DataStore for HostedClient {
    #[instrument(skip(self))]
    async fn ping(&self) -> StoreResult<()> {
        let _: Vec<serde_json::Value> = self.select(&RestQuery::table(SEASONS).limit(1)).await?;
        Ok(())
    }

    // =========================================================================
    // Seasons
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_seasons(&self) -> StoreResult<Vec<Season>> {
        if let Some(CacheValue::Seasons(seasons)) = self.cached(&CacheKey::Seasons).await {
            debug!("Cache hit for seasons");
            return Ok(seasons);
        }
        let seasons: Vec<Season> = self
            .select(&RestQuery::table(SEASONS).order("start_date", true).order("id", true))
            .await?;
        self.remember(CacheKey::Seasons, CacheValue::Seasons(seasons.clone()))
            .await;
        Ok(seasons)
    }

    #[instrument(skip(self), fields(season_id = %id))]
    async fn get_season(&self, id: SeasonId) -> StoreResult<Option<Season>> {
        let key = CacheKey::Season(id);
        if let Some(CacheValue::Season(season)) = self.cached(&key).await {
            debug!("Cache hit for season");
            return Ok(Some(*season));
        }
        let season: Option<Season> = self.select_one(RestQuery::table(SEASONS).eq("id", id)).await?;
        if let Some(season) = &season {
            self.remember(key, CacheValue::Season(Box::new(season.clone())))
                .await;
        }
        Ok(season)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_season(&self, input: &SeasonInput) -> StoreResult<Season> {
        let season = self.insert(SEASONS, input).await?;
        self.invalidate_catalog();
        Ok(season)
    }

    #[instrument(skip(self, input), fields(season_id = %id))]
    async fn update_season(&self, id: SeasonId, input: &SeasonInput) -> StoreResult<Season> {
        let season = self
            .update(&RestQuery::table(SEASONS).eq("id", id), input)
            .await?
            .ok_or(StoreError::not_found("season"))?;
        self.invalidate_catalog();
        Ok(season)
    }

    #[instrument(skip(self), fields(season_id = %id))]
    async fn delete_season(&self, id: SeasonId) -> StoreResult<()> {
        let count = self.delete(&RestQuery::table(SEASONS).eq("id", id)).await?;
        self.invalidate_catalog();
        require_deleted(count, "season")
    }

    // =========================================================================
    // Products
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        // Search results are not cached
        let key = CacheKey::Products(query.clone());
        if query.search.is_none()
            && let Some(CacheValue::Products(products)) = self.cached(&key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }
        let products: Vec<Product> = self.select(&product_rest_query(query)).await?;
        if query.search.is_none() {
            self.remember(key, CacheValue::Products(products.clone()))
                .await;
        }
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cached(&key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }
        let product: Option<Product> =
            self.select_one(RestQuery::table(PRODUCTS).eq("id", id)).await?;
        if let Some(product) = &product {
            self.remember(key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product_fresh(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let key = CacheKey::Product(id);
        let product: Option<Product> =
            self.select_one(RestQuery::table(PRODUCTS).eq("id", id)).await?;
        match &product {
            Some(product) => {
                self.remember(key, CacheValue::Product(Box::new(product.clone())))
                    .await;
            }
            None => self.forget(&key).await,
        }
        Ok(product)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_product(&self, input: &ProductInput) -> StoreResult<Product> {
        let product = self.insert(PRODUCTS, input).await?;
        self.invalidate_catalog();
        Ok(product)
    }

    #[instrument(skip(self, input), fields(product_id = %id))]
    async fn update_product(&self, id: ProductId, input: &ProductInput) -> StoreResult<Product> {
        let product = self
            .update(&RestQuery::table(PRODUCTS).eq("id", id), input)
            .await?
            .ok_or(StoreError::not_found("product"))?;
        self.invalidate_catalog();
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn set_product_availability(&self, id: ProductId, available: bool) -> StoreResult<Product> {
        let product = self
            .update(
                &RestQuery::table(PRODUCTS).eq("id", id),
                &json!({ "is_available": available }),
            )
            .await?
            .ok_or(StoreError::not_found("product"))?;
        self.invalidate_catalog();
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let count = self.delete(&RestQuery::table(PRODUCTS).eq("id", id)).await?;
        self.invalidate_catalog();
        require_deleted(count, "product")
    }

    // =========================================================================
    // Purchase cycles
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_purchase_cycles(&self) -> StoreResult<Vec<PurchaseCycle>> {
        Ok(self
            .select(
                &RestQuery::table(PURCHASE_CYCLES)
                    .order("starts_on", false)
                    .order("id", false),
            )
            .await?)
    }

    #[instrument(skip(self), fields(cycle_id = %id))]
    async fn get_purchase_cycle(&self, id: PurchaseCycleId) -> StoreResult<Option<PurchaseCycle>> {
        Ok(self
            .select_one(RestQuery::table(PURCHASE_CYCLES).eq("id", id))
            .await?)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_purchase_cycle(&self, input: &PurchaseCycleInput) -> StoreResult<PurchaseCycle> {
        Ok(self.insert(PURCHASE_CYCLES, input).await?)
    }

    #[instrument(skip(self, input), fields(cycle_id = %id))]
    async fn update_purchase_cycle(
        &self,
        id: PurchaseCycleId,
        input: &PurchaseCycleInput,
    ) -> StoreResult<PurchaseCycle> {
        self.update(&RestQuery::table(PURCHASE_CYCLES).eq("id", id), input)
            .await?
            .ok_or(StoreError::not_found("purchase cycle"))
    }

    #[instrument(skip(self), fields(cycle_id = %id))]
    async fn delete_purchase_cycle(&self, id: PurchaseCycleId) -> StoreResult<()> {
        // cycle_products rows cascade with the cycle
        let count = self
            .delete(&RestQuery::table(PURCHASE_CYCLES).eq("id", id))
            .await?;
        require_deleted(count, "purchase cycle")
    }

    // =========================================================================
    // Cycle products
    // =========================================================================

    #[instrument(skip(self), fields(cycle_id = %cycle_id))]
    async fn list_cycle_products(&self, cycle_id: PurchaseCycleId) -> StoreResult<Vec<CycleProduct>> {
        Ok(self
            .select(
                &RestQuery::table(CYCLE_PRODUCTS)
                    .eq("cycle_id", cycle_id)
                    .order("product_name", true)
                    .order("id", true),
            )
            .await?)
    }

    #[instrument(skip(self, input), fields(cycle_id = %input.cycle_id, product_id = %input.product_id))]
    async fn create_cycle_product(&self, input: &CycleProductInput) -> StoreResult<CycleProduct> {
        Ok(self.insert(CYCLE_PRODUCTS, input).await?)
    }

    #[instrument(skip(self, update), fields(cycle_product_id = %id))]
    async fn update_cycle_product(
        &self,
        id: CycleProductId,
        update: &CycleProductUpdate,
    ) -> StoreResult<CycleProduct> {
        self.update(&RestQuery::table(CYCLE_PRODUCTS).eq("id", id), update)
            .await?
            .ok_or(StoreError::not_found("cycle product"))
    }

    #[instrument(skip(self), fields(cycle_product_id = %id))]
    async fn delete_cycle_product(&self, id: CycleProductId) -> StoreResult<()> {
        let count = self
            .delete(&RestQuery::table(CYCLE_PRODUCTS).eq("id", id))
            .await?;
        require_deleted(count, "cycle product")
    }

    // =========================================================================
    // Orders
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_orders(&self, query: &OrderQuery) -> StoreResult<Vec<Order>> {
        Ok(self.select(&order_rest_query(query)).await?)
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.select_one(RestQuery::table(ORDERS).eq("id", id)).await?)
    }

    #[instrument(skip(self, order), fields(user_id = %order.user_id))]
    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order> {
        Ok(self.insert(ORDERS, order).await?)
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<Order> {
        self.update(
            &RestQuery::table(ORDERS).eq("id", id),
            &json!({ "status": status }),
        )
        .await?
        .ok_or(StoreError::not_found("order"))
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        Ok(self
            .select(&RestQuery::table(PROFILES).order("created_at", true))
            .await?)
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn get_profile(&self, id: UserId) -> StoreResult<Option<Profile>> {
        Ok(self.select_one(RestQuery::table(PROFILES).eq("id", id)).await?)
    }

    #[instrument(skip(self, email))]
    async fn find_profile_by_email(&self, email: &Email) -> StoreResult<Option<Profile>> {
        Ok(self
            .select_one(RestQuery::table(PROFILES).eq("email", email))
            .await?)
    }

    #[instrument(skip(self, input), fields(user_id = %input.id))]
    async fn upsert_profile(&self, input: &ProfileInput) -> StoreResult<Profile> {
        Ok(self.upsert(PROFILES, "id", input).await?)
    }

    #[instrument(skip(self), fields(user_id = %id, role = %role))]
    async fn set_profile_role(&self, id: UserId, role: UserRole) -> StoreResult<Profile> {
        self.update(&RestQuery::table(PROFILES).eq("id", id), &json!({ "role": role }))
            .await?
            .ok_or(StoreError::not_found("profile"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;

    fn query_string(rest: &RestQuery) -> String {
        let url = rest
            .url(&Url::parse("https://db.test/").unwrap())
            .unwrap();
        url.query_pairs()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    #[test]
    fn test_storefront_product_query() {
        let query = ProductQuery {
            season_id: Some(SeasonId::new(2)),
            available_only: true,
            search: Some("caramel".into()),
            sort: ProductSort::PriceAsc,
            ..ProductQuery::default()
        };
        assert_eq!(
            query_string(&product_rest_query(&query)),
            "select=*&season_id=eq.2&is_available=eq.true&name=ilike.*caramel*&order=price.asc,name.asc"
        );
    }

    #[test]
    fn test_featured_product_query() {
        let query = ProductQuery {
            featured_only: true,
            limit: Some(4),
            ..ProductQuery::default()
        };
        assert_eq!(
            query_string(&product_rest_query(&query)),
            "select=*&is_featured=eq.true&order=created_at.desc,id.desc&limit=4"
        );
    }

    #[test]
    fn test_customer_order_query() {
        let user_id: UserId = "7b1d7c0e-3f7a-4b7e-9a55-0d2f4d5c9e11".parse().unwrap();
        let query = OrderQuery {
            status: Some(OrderStatus::Shipped),
            user_id: Some(user_id),
            limit: None,
        };
        assert_eq!(
            query_string(&order_rest_query(&query)),
            "select=*&status=eq.shipped&user_id=eq.7b1d7c0e-3f7a-4b7e-9a55-0d2f4d5c9e11&order=created_at.desc,id.desc"
        );
    }
}
