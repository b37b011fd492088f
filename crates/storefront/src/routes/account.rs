//! Account route handlers.
//!
//! All account routes require a signed-in customer.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use chocolatier_core::models::{Order, Profile};
use chocolatier_core::store::OrderQuery;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::{Page, RequireAuth};
use crate::models::CurrentUser;
use crate::routes::checkout::owned_order;
use crate::state::AppState;

/// Account overview template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub page: Page,
    pub user: CurrentUser,
    pub profile: Option<Profile>,
    pub orders: Vec<Order>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub page: Page,
    pub order: Order,
}

impl AccountTemplate {
    /// Orders that have not been delivered or cancelled yet.
    #[must_use]
    pub fn open_order_count(&self) -> usize {
        self.orders.iter().filter(|order| order.status.is_open()).count()
    }
}

/// Display the account overview with order history.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: Page,
) -> Result<AccountTemplate> {
    let profile = state.store().get_profile(user.id).await?;
    let orders = state
        .store()
        .list_orders(&OrderQuery::for_user(user.id))
        .await?;

    Ok(AccountTemplate {
        page,
        user,
        profile,
        orders,
    })
}

/// Display one of the customer's orders.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: Page,
    Path(id): Path<i64>,
) -> Result<OrderTemplate> {
    let order = owned_order(&state, &user, id).await?;
    Ok(OrderTemplate { page, order })
}
