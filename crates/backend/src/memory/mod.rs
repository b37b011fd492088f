//! In-memory placeholder backend.
//!
//! Implements [`DataStore`] over process-local tables and [`AuthProvider`]
//! (see [`MemoryAuth`]) with Argon2 password hashes. It enforces the same
//! constraints the hosted schema declares (foreign keys, unique cycle
//! products, unique profile emails) so callers see identical error kinds in
//! development, tests and production.

mod auth;
pub mod seed;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chocolatier_core::models::{
    CycleProduct, CycleProductInput, CycleProductUpdate, NewOrder, Order, Product, ProductInput,
    Profile, ProfileInput, PurchaseCycle, PurchaseCycleInput, Season, SeasonInput,
};
use chocolatier_core::store::{DataStore, OrderQuery, ProductQuery, StoreError, StoreResult};
use chocolatier_core::{
    CycleProductId, Email, OrderId, OrderStatus, ProductId, PurchaseCycleId, SeasonId, UserId,
    UserRole,
};
use chrono::Utc;
use tokio::sync::RwLock;

pub use auth::MemoryAuth;

#[derive(Default)]
struct Sequences {
    season: i64,
    product: i64,
    cycle: i64,
    cycle_product: i64,
    order: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    sequences: Sequences,
    seasons: BTreeMap<SeasonId, Season>,
    products: BTreeMap<ProductId, Product>,
    cycles: BTreeMap<PurchaseCycleId, PurchaseCycle>,
    cycle_products: BTreeMap<CycleProductId, CycleProduct>,
    orders: BTreeMap<OrderId, Order>,
    profiles: BTreeMap<UserId, Profile>,
}

impl Tables {
    fn check_season(&self, season_id: Option<SeasonId>) -> StoreResult<()> {
        match season_id {
            Some(id) if !self.seasons.contains_key(&id) => Err(StoreError::Conflict(format!(
                "season {id} does not exist"
            ))),
            _ => Ok(()),
        }
    }
}

/// Process-local [`DataStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    // =========================================================================
    // Seasons
    // =========================================================================

    async fn list_seasons(&self) -> StoreResult<Vec<Season>> {
        let tables = self.tables.read().await;
        let mut seasons: Vec<Season> = tables.seasons.values().cloned().collect();
        seasons.sort_by_key(|season| (season.start_date, season.id));
        Ok(seasons)
    }

    async fn get_season(&self, id: SeasonId) -> StoreResult<Option<Season>> {
        Ok(self.tables.read().await.seasons.get(&id).cloned())
    }

    async fn create_season(&self, input: &SeasonInput) -> StoreResult<Season> {
        let mut tables = self.tables.write().await;
        let id = SeasonId::new(next(&mut tables.sequences.season));
        let season = Season {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: Utc::now(),
        };
        tables.seasons.insert(id, season.clone());
        Ok(season)
    }

    async fn update_season(&self, id: SeasonId, input: &SeasonInput) -> StoreResult<Season> {
        let mut tables = self.tables.write().await;
        let season = tables
            .seasons
            .get_mut(&id)
            .ok_or(StoreError::not_found("season"))?;
        season.name.clone_from(&input.name);
        season.description.clone_from(&input.description);
        season.start_date = input.start_date;
        season.end_date = input.end_date;
        Ok(season.clone())
    }

    async fn delete_season(&self, id: SeasonId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.seasons.contains_key(&id) {
            return Err(StoreError::not_found("season"));
        }
        let referenced = tables
            .products
            .values()
            .any(|product| product.season_id == Some(id))
            || tables
                .cycles
                .values()
                .any(|cycle| cycle.season_id == Some(id));
        if referenced {
            return Err(StoreError::Conflict(
                "season is still referenced by products or purchase cycles".to_string(),
            ));
        }
        tables.seasons.remove(&id);
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(query.apply(tables.products.values().cloned()))
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn create_product(&self, input: &ProductInput) -> StoreResult<Product> {
        let mut tables = self.tables.write().await;
        tables.check_season(input.season_id)?;
        let id = ProductId::new(next(&mut tables.sequences.product));
        let product = Product {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            image_url: input.image_url.clone(),
            season_id: input.season_id,
            is_available: input.is_available,
            is_featured: input.is_featured,
            created_at: Utc::now(),
        };
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, input: &ProductInput) -> StoreResult<Product> {
        let mut tables = self.tables.write().await;
        tables.check_season(input.season_id)?;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or(StoreError::not_found("product"))?;
        product.name.clone_from(&input.name);
        product.description.clone_from(&input.description);
        product.price = input.price;
        product.image_url.clone_from(&input.image_url);
        product.season_id = input.season_id;
        product.is_available = input.is_available;
        product.is_featured = input.is_featured;
        Ok(product.clone())
    }

    async fn set_product_availability(&self, id: ProductId, available: bool) -> StoreResult<Product> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or(StoreError::not_found("product"))?;
        product.is_available = available;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&id) {
            return Err(StoreError::not_found("product"));
        }
        if tables.cycle_products.values().any(|cp| cp.product_id == id) {
            return Err(StoreError::Conflict(
                "product is still part of a purchase cycle".to_string(),
            ));
        }
        tables.products.remove(&id);
        Ok(())
    }

    // =========================================================================
    // Purchase cycles
    // =========================================================================

    async fn list_purchase_cycles(&self) -> StoreResult<Vec<PurchaseCycle>> {
        let tables = self.tables.read().await;
        let mut cycles: Vec<PurchaseCycle> = tables.cycles.values().cloned().collect();
        cycles.sort_by(|a, b| b.starts_on.cmp(&a.starts_on).then_with(|| b.id.cmp(&a.id)));
        Ok(cycles)
    }

    async fn get_purchase_cycle(&self, id: PurchaseCycleId) -> StoreResult<Option<PurchaseCycle>> {
        Ok(self.tables.read().await.cycles.get(&id).cloned())
    }

    async fn create_purchase_cycle(&self, input: &PurchaseCycleInput) -> StoreResult<PurchaseCycle> {
        let mut tables = self.tables.write().await;
        tables.check_season(input.season_id)?;
        let id = PurchaseCycleId::new(next(&mut tables.sequences.cycle));
        let cycle = PurchaseCycle {
            id,
            name: input.name.clone(),
            season_id: input.season_id,
            starts_on: input.starts_on,
            ends_on: input.ends_on,
            status: input.status,
            notes: input.notes.clone(),
            created_at: Utc::now(),
        };
        tables.cycles.insert(id, cycle.clone());
        Ok(cycle)
    }

    async fn update_purchase_cycle(
        &self,
        id: PurchaseCycleId,
        input: &PurchaseCycleInput,
    ) -> StoreResult<PurchaseCycle> {
        let mut tables = self.tables.write().await;
        tables.check_season(input.season_id)?;
        let cycle = tables
            .cycles
            .get_mut(&id)
            .ok_or(StoreError::not_found("purchase cycle"))?;
        cycle.name.clone_from(&input.name);
        cycle.season_id = input.season_id;
        cycle.starts_on = input.starts_on;
        cycle.ends_on = input.ends_on;
        cycle.status = input.status;
        cycle.notes.clone_from(&input.notes);
        Ok(cycle.clone())
    }

    async fn delete_purchase_cycle(&self, id: PurchaseCycleId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.cycles.remove(&id).is_none() {
            return Err(StoreError::not_found("purchase cycle"));
        }
        tables.cycle_products.retain(|_, cp| cp.cycle_id != id);
        Ok(())
    }

    // =========================================================================
    // Cycle products
    // =========================================================================

    async fn list_cycle_products(&self, cycle_id: PurchaseCycleId) -> StoreResult<Vec<CycleProduct>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<CycleProduct> = tables
            .cycle_products
            .values()
            .filter(|cp| cp.cycle_id == cycle_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.product_name.cmp(&b.product_name).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn create_cycle_product(&self, input: &CycleProductInput) -> StoreResult<CycleProduct> {
        let mut tables = self.tables.write().await;
        if !tables.cycles.contains_key(&input.cycle_id) {
            return Err(StoreError::Conflict(format!(
                "purchase cycle {} does not exist",
                input.cycle_id
            )));
        }
        if !tables.products.contains_key(&input.product_id) {
            return Err(StoreError::Conflict(format!(
                "product {} does not exist",
                input.product_id
            )));
        }
        if tables
            .cycle_products
            .values()
            .any(|cp| cp.cycle_id == input.cycle_id && cp.product_id == input.product_id)
        {
            return Err(StoreError::Conflict(
                "product is already part of this purchase cycle".to_string(),
            ));
        }
        let id = CycleProductId::new(next(&mut tables.sequences.cycle_product));
        let row = CycleProduct {
            id,
            cycle_id: input.cycle_id,
            product_id: input.product_id,
            price_override: input.price_override,
            is_available: input.is_available,
            product_name: input.product_name.clone(),
            image_url: input.image_url.clone(),
            base_price: input.base_price,
        };
        tables.cycle_products.insert(id, row.clone());
        Ok(row)
    }

    async fn update_cycle_product(
        &self,
        id: CycleProductId,
        update: &CycleProductUpdate,
    ) -> StoreResult<CycleProduct> {
        let mut tables = self.tables.write().await;
        let row = tables
            .cycle_products
            .get_mut(&id)
            .ok_or(StoreError::not_found("cycle product"))?;
        row.price_override = update.price_override;
        row.is_available = update.is_available;
        Ok(row.clone())
    }

    async fn delete_cycle_product(&self, id: CycleProductId) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .cycle_products
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::not_found("cycle product"))
    }

    // =========================================================================
    // Orders
    // =========================================================================

    async fn list_orders(&self, query: &OrderQuery) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        if let Some(limit) = query.limit {
            orders.truncate(limit);
        }
        Ok(orders)
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;
        if !tables.profiles.contains_key(&order.user_id) {
            return Err(StoreError::Conflict(format!(
                "profile {} does not exist",
                order.user_id
            )));
        }
        if order.items.is_empty() {
            return Err(StoreError::Invalid("order has no items".to_string()));
        }
        let id = OrderId::new(next(&mut tables.sequences.order));
        let stored = Order {
            id,
            user_id: order.user_id,
            email: order.email.clone(),
            status: order.status,
            items: order.items.clone(),
            subtotal: order.subtotal,
            shipping: order.shipping,
            total: order.total,
            shipping_address: order.shipping_address.clone(),
            purchase_cycle_id: order.purchase_cycle_id,
            notes: order.notes.clone(),
            created_at: Utc::now(),
        };
        tables.orders.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or(StoreError::not_found("order"))?;
        order.status = status;
        Ok(order.clone())
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        let tables = self.tables.read().await;
        let mut profiles: Vec<Profile> = tables.profiles.values().cloned().collect();
        profiles.sort_by_key(|profile| profile.created_at);
        Ok(profiles)
    }

    async fn get_profile(&self, id: UserId) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn find_profile_by_email(&self, email: &Email) -> StoreResult<Option<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .find(|profile| &profile.email == email)
            .cloned())
    }

    async fn upsert_profile(&self, input: &ProfileInput) -> StoreResult<Profile> {
        let mut tables = self.tables.write().await;
        if tables
            .profiles
            .values()
            .any(|profile| profile.email == input.email && profile.id != input.id)
        {
            return Err(StoreError::Conflict(format!(
                "a profile with email {} already exists",
                input.email
            )));
        }
        let profile = tables
            .profiles
            .entry(input.id)
            .and_modify(|profile| {
                profile.email = input.email.clone();
                profile.full_name.clone_from(&input.full_name);
                profile.role = input.role;
            })
            .or_insert_with(|| Profile {
                id: input.id,
                email: input.email.clone(),
                full_name: input.full_name.clone(),
                role: input.role,
                created_at: Utc::now(),
            });
        Ok(profile.clone())
    }

    async fn set_profile_role(&self, id: UserId, role: UserRole) -> StoreResult<Profile> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .get_mut(&id)
            .ok_or(StoreError::not_found("profile"))?;
        profile.role = role;
        Ok(profile.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chocolatier_core::address::ShippingAddress;
    use chocolatier_core::models::OrderItem;
    use chocolatier_core::{Money, PurchaseCycleStatus};
    use chrono::NaiveDate;

    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn season_input(name: &str) -> SeasonInput {
        SeasonInput {
            name: name.to_string(),
            description: None,
            start_date: date(2, 1),
            end_date: date(2, 14),
        }
    }

    fn product_input(name: &str, season_id: Option<SeasonId>) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: String::new(),
            price: Money::from_cents(1500),
            image_url: None,
            season_id,
            is_available: true,
            is_featured: false,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Buyer".into(),
            line1: "1 Cocoa Way".into(),
            line2: None,
            city: "Portland".into(),
            region: "OR".into(),
            postal_code: "97201".into(),
            country: "US".into(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_season_crud() {
        let store = MemoryStore::new();
        let season = store.create_season(&season_input("Valentine's")).await.unwrap();
        assert_eq!(season.id, SeasonId::new(1));

        let mut input = season_input("Valentine's Day");
        input.end_date = date(2, 15);
        let updated = store.update_season(season.id, &input).await.unwrap();
        assert_eq!(updated.name, "Valentine's Day");
        assert_eq!(updated.created_at, season.created_at);

        store.delete_season(season.id).await.unwrap();
        assert!(store.get_season(season.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_season(season.id).await,
            Err(StoreError::NotFound { entity: "season" })
        ));
    }

    #[tokio::test]
    async fn test_referenced_season_cannot_be_deleted() {
        let store = MemoryStore::new();
        let season = store.create_season(&season_input("Easter")).await.unwrap();
        store
            .create_product(&product_input("Egg", Some(season.id)))
            .await
            .unwrap();
        assert!(matches!(
            store.delete_season(season.id).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_product_requires_existing_season() {
        let store = MemoryStore::new();
        let result = store
            .create_product(&product_input("Orphan", Some(SeasonId::new(99))))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cycle_products_are_unique_and_cascade() {
        let store = MemoryStore::new();
        let product = store.create_product(&product_input("Bark", None)).await.unwrap();
        let cycle = store
            .create_purchase_cycle(&PurchaseCycleInput {
                name: "February".into(),
                season_id: None,
                starts_on: date(2, 1),
                ends_on: date(2, 10),
                status: PurchaseCycleStatus::Open,
                notes: None,
            })
            .await
            .unwrap();

        let input = CycleProductInput::snapshot(cycle.id, &product, Some(Money::from_cents(1200)), true);
        let row = store.create_cycle_product(&input).await.unwrap();
        assert_eq!(row.product_name, "Bark");
        assert_eq!(row.base_price, Money::from_cents(1500));
        assert!(matches!(
            store.create_cycle_product(&input).await,
            Err(StoreError::Conflict(_))
        ));

        // A product in a cycle cannot be deleted
        assert!(matches!(
            store.delete_product(product.id).await,
            Err(StoreError::Conflict(_))
        ));

        store.delete_purchase_cycle(cycle.id).await.unwrap();
        assert!(store.list_cycle_products(cycle.id).await.unwrap().is_empty());
        store.delete_product(product.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_orders_are_listed_newest_first_and_filtered() {
        let store = MemoryStore::new();
        let buyer = UserId::generate();
        let other = UserId::generate();
        for (id, email) in [(buyer, "buyer@example.com"), (other, "other@example.com")] {
            store
                .upsert_profile(&ProfileInput {
                    id,
                    email: Email::parse(email).unwrap(),
                    full_name: None,
                    role: UserRole::Customer,
                })
                .await
                .unwrap();
        }

        let new_order = |user_id: UserId| NewOrder {
            user_id,
            email: Email::parse("buyer@example.com").unwrap(),
            status: OrderStatus::Pending,
            items: vec![OrderItem {
                product_id: ProductId::new(1),
                cycle_product_id: None,
                name: "Bark".into(),
                unit_price: Money::from_cents(900),
                quantity: 1,
            }],
            subtotal: Money::from_cents(900),
            shipping: Money::from_cents(800),
            total: Money::from_cents(1700),
            shipping_address: address(),
            purchase_cycle_id: None,
            notes: None,
        };

        let first = store.create_order(&new_order(buyer)).await.unwrap();
        let second = store.create_order(&new_order(buyer)).await.unwrap();
        store.create_order(&new_order(other)).await.unwrap();
        store
            .update_order_status(first.id, OrderStatus::Shipped)
            .await
            .unwrap();

        let mine = store.list_orders(&OrderQuery::for_user(buyer)).await.unwrap();
        assert_eq!(
            mine.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        let shipped = store
            .list_orders(&OrderQuery {
                status: Some(OrderStatus::Shipped),
                ..OrderQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(shipped.len(), 1);
        assert_eq!(shipped[0].id, first.id);
    }

    #[tokio::test]
    async fn test_order_requires_profile() {
        let store = MemoryStore::new();
        let order = NewOrder {
            user_id: UserId::generate(),
            email: Email::parse("ghost@example.com").unwrap(),
            status: OrderStatus::Pending,
            items: vec![],
            subtotal: Money::ZERO,
            shipping: Money::ZERO,
            total: Money::ZERO,
            shipping_address: address(),
            purchase_cycle_id: None,
            notes: None,
        };
        assert!(matches!(
            store.create_order(&order).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_upsert_merges_and_enforces_unique_email() {
        let store = MemoryStore::new();
        let id = UserId::generate();
        let email = Email::parse("fan@example.com").unwrap();
        let created = store
            .upsert_profile(&ProfileInput {
                id,
                email: email.clone(),
                full_name: None,
                role: UserRole::Customer,
            })
            .await
            .unwrap();
        let merged = store
            .upsert_profile(&ProfileInput {
                id,
                email: email.clone(),
                full_name: Some("Cocoa Fan".into()),
                role: UserRole::Customer,
            })
            .await
            .unwrap();
        assert_eq!(merged.created_at, created.created_at);
        assert_eq!(merged.full_name.as_deref(), Some("Cocoa Fan"));

        let clash = store
            .upsert_profile(&ProfileInput {
                id: UserId::generate(),
                email: email.clone(),
                full_name: None,
                role: UserRole::Customer,
            })
            .await;
        assert!(matches!(clash, Err(StoreError::Conflict(_))));

        store.set_profile_role(id, UserRole::Admin).await.unwrap();
        let found = store.find_profile_by_email(&email).await.unwrap().unwrap();
        assert!(found.is_admin());
    }
}
