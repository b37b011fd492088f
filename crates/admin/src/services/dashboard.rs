//! Dashboard statistics.

use chocolatier_core::models::{Order, PurchaseCycle, Season};
use chocolatier_core::store::{DataStore, OrderQuery, ProductQuery, StoreResult};
use chocolatier_core::{Money, OrderStatus, UserRole};
use chrono::NaiveDate;
use tracing::instrument;

/// Orders shown in the dashboard's recent list.
const RECENT_ORDERS: usize = 5;

/// Aggregates shown on the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub product_count: usize,
    pub available_product_count: usize,
    pub season_count: usize,
    pub customer_count: usize,
    pub order_count: usize,
    pub open_order_count: usize,
    /// Sum of totals for orders that were not cancelled.
    pub revenue: Money,
    /// Order count per status, in lifecycle order.
    pub status_counts: Vec<(OrderStatus, usize)>,
    pub current_season: Option<Season>,
    pub open_cycle: Option<PurchaseCycle>,
    pub recent_orders: Vec<Order>,
}

impl DashboardStats {
    /// Gather the dashboard from the store.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    #[instrument(skip(store))]
    pub async fn load(store: &dyn DataStore, today: NaiveDate) -> StoreResult<Self> {
        let products = store.list_products(&ProductQuery::default()).await?;
        let seasons = store.list_seasons().await?;
        let cycles = store.list_purchase_cycles().await?;
        let profiles = store.list_profiles().await?;
        // Newest first
        let orders = store.list_orders(&OrderQuery::default()).await?;

        let status_counts = OrderStatus::ALL
            .iter()
            .map(|status| (*status, orders.iter().filter(|o| o.status == *status).count()))
            .collect();

        Ok(Self {
            product_count: products.len(),
            available_product_count: products.iter().filter(|p| p.is_available).count(),
            season_count: seasons.len(),
            customer_count: profiles
                .iter()
                .filter(|p| p.role == UserRole::Customer)
                .count(),
            order_count: orders.len(),
            open_order_count: orders.iter().filter(|o| o.status.is_open()).count(),
            revenue: orders
                .iter()
                .filter(|o| o.status.counts_as_revenue())
                .map(|o| o.total)
                .sum(),
            status_counts,
            current_season: seasons.into_iter().find(|s| s.is_current(today)),
            open_cycle: cycles.into_iter().find(|c| c.is_accepting_orders(today)),
            recent_orders: orders.into_iter().take(RECENT_ORDERS).collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chocolatier_backend::memory::MemoryStore;
    use chocolatier_backend::memory::seed::seed_demo_catalog;
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn test_dashboard_over_demo_catalog() {
        let store = MemoryStore::new();
        let today = Utc::now().date_naive();
        seed_demo_catalog(&store, today, false).await.unwrap();

        let stats = DashboardStats::load(&store, today).await.unwrap();
        assert_eq!(stats.season_count, 3);
        assert_eq!(stats.product_count, 8);
        assert_eq!(stats.available_product_count, 6);
        assert_eq!(stats.order_count, 0);
        assert!(stats.revenue.is_zero());
        assert_eq!(stats.status_counts.len(), OrderStatus::ALL.len());
        assert_eq!(
            stats.current_season.map(|s| s.name).as_deref(),
            Some("Valentine's Collection")
        );
        assert_eq!(
            stats.open_cycle.map(|c| c.name).as_deref(),
            Some("Valentine's pre-orders")
        );
    }
}
