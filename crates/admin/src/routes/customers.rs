//! Customer (profile) route handlers.
//!
//! Lists every profile, including admins, and lets an admin change roles. An
//! admin cannot demote themselves, so the console always keeps one admin who
//! can undo a mistake.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use chocolatier_core::models::{Order, Profile};
use chocolatier_core::store::OrderQuery;
use chocolatier_core::{Money, Toast, UserId, UserRole};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::{Layout, flash};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::routes::report;
use crate::state::AppState;

/// Roles an admin can assign.
pub const ROLES: [UserRole; 2] = [UserRole::Customer, UserRole::Admin];

/// Role change form.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

/// Profile listing row.
#[derive(Debug, Clone)]
pub struct CustomerRow {
    pub profile: Profile,
    pub order_count: usize,
    pub total_spent: Money,
}

/// Customer listing template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/index.html")]
pub struct CustomersIndexTemplate {
    pub layout: Layout,
    pub customers: Vec<CustomerRow>,
}

/// Customer detail template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/show.html")]
pub struct CustomerShowTemplate {
    pub layout: Layout,
    pub profile: Profile,
    pub orders: Vec<Order>,
    pub roles: [UserRole; 2],
    /// Viewing your own profile; the role form is disabled.
    pub is_self: bool,
}

impl CustomerShowTemplate {
    fn has_role(&self, role: &UserRole) -> bool {
        self.profile.role == *role
    }

    fn spent(&self) -> Money {
        spent(&self.orders)
    }
}

fn spent(orders: &[Order]) -> Money {
    orders
        .iter()
        .filter(|order| order.status.counts_as_revenue())
        .map(|order| order.total)
        .sum()
}

fn parse_user_id(id: &str) -> Result<UserId> {
    id.parse()
        .map_err(|_| AppError::NotFound(format!("customer {id}")))
}

/// List all profiles with their order totals.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
) -> Result<CustomersIndexTemplate> {
    let profiles = state.store().list_profiles().await?;
    let orders = state.store().list_orders(&OrderQuery::default()).await?;

    let customers = profiles
        .into_iter()
        .map(|profile| {
            let theirs: Vec<Order> = orders
                .iter()
                .filter(|order| order.user_id == profile.id)
                .cloned()
                .collect();
            CustomerRow {
                order_count: theirs.len(),
                total_spent: spent(&theirs),
                profile,
            }
        })
        .collect();

    Ok(CustomersIndexTemplate { layout, customers })
}

/// Profile detail with order history.
#[instrument(skip_all, fields(customer_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<String>,
) -> Result<CustomerShowTemplate> {
    let user_id = parse_user_id(&id)?;
    let profile = state
        .store()
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {id}")))?;
    let orders = state
        .store()
        .list_orders(&OrderQuery::for_user(user_id))
        .await?;

    Ok(CustomerShowTemplate {
        layout,
        is_self: profile.id == admin.id,
        profile,
        orders,
        roles: ROLES,
    })
}

/// Change a profile's role.
#[instrument(skip_all, fields(admin_id = %admin.id, customer_id = %id))]
pub async fn update_role(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<RoleForm>,
) -> Result<Redirect> {
    let user_id = parse_user_id(&id)?;
    let target = format!("/customers/{id}");
    let Ok(role) = form.role.parse::<UserRole>() else {
        flash(&session, Toast::error("Choose a valid role.")).await;
        return Ok(Redirect::to(&target));
    };

    if user_id == admin.id && role != UserRole::Admin {
        tracing::warn!("Admin attempted to demote themselves");
        flash(&session, Toast::error("You cannot remove your own admin access.")).await;
        return Ok(Redirect::to(&target));
    }

    let result = state.store().set_profile_role(user_id, role).await;
    if let Some(profile) = report(&session, "change role", result, |profile| {
        format!("{} is now {}.", profile.display_name(), profile.role.label())
    })
    .await
    {
        tracing::info!(role = profile.role.as_str(), "Role changed");
    }
    Ok(Redirect::to(&target))
}
