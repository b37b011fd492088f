//! Order management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use chocolatier_core::models::{Order, Profile, PurchaseCycle};
use chocolatier_core::store::OrderQuery;
use chocolatier_core::{OrderId, OrderStatus, Toast};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::{Layout, flash};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::routes::report;
use crate::state::AppState;

/// Listing filter from the query string. Unknown statuses show every order.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusFilter {
    pub status: String,
}

impl StatusFilter {
    fn status(&self) -> Option<OrderStatus> {
        self.status.parse().ok()
    }
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Order listing template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub layout: Layout,
    pub orders: Vec<Order>,
    pub status: Option<OrderStatus>,
    pub statuses: [OrderStatus; 6],
}

impl OrdersIndexTemplate {
    fn is_filter(&self, status: &OrderStatus) -> bool {
        self.status == Some(*status)
    }
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub order: Order,
    pub customer: Option<Profile>,
    pub cycle: Option<PurchaseCycle>,
    pub statuses: [OrderStatus; 6],
}

impl OrderShowTemplate {
    fn is_status(&self, status: &OrderStatus) -> bool {
        self.order.status == *status
    }
}

/// List orders, newest first, optionally filtered by status.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
    Query(filter): Query<StatusFilter>,
) -> Result<OrdersIndexTemplate> {
    let status = filter.status();
    let orders = state
        .store()
        .list_orders(&OrderQuery {
            status,
            ..OrderQuery::default()
        })
        .await?;
    Ok(OrdersIndexTemplate {
        layout,
        orders,
        status,
        statuses: OrderStatus::ALL,
    })
}

/// Order detail with the customer and purchase cycle.
#[instrument(skip_all, fields(order_id = id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<i64>,
) -> Result<OrderShowTemplate> {
    let order = state
        .store()
        .get_order(OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let customer = state.store().get_profile(order.user_id).await?;
    let cycle = match order.purchase_cycle_id {
        Some(cycle_id) => state.store().get_purchase_cycle(cycle_id).await?,
        None => None,
    };
    Ok(OrderShowTemplate {
        layout,
        order,
        customer,
        cycle,
        statuses: OrderStatus::ALL,
    })
}

/// Move an order to a new status.
#[instrument(skip_all, fields(admin_id = %admin.id, order_id = id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let target = format!("/orders/{id}");
    let Ok(status) = form.status.parse::<OrderStatus>() else {
        flash(&session, Toast::error("Choose a valid status.")).await;
        return Redirect::to(&target);
    };
    let result = state
        .store()
        .update_order_status(OrderId::new(id), status)
        .await;
    if let Some(order) = report(&session, "update order", result, |order| {
        format!("Order {} is now {}.", order.number(), order.status.label())
    })
    .await
    {
        tracing::info!(status = order.status.as_str(), "Order status changed");
    }
    Redirect::to(&target)
}
