//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::components::Layout;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::services::DashboardStats;
use crate::state::AppState;

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub stats: DashboardStats,
}

/// Dashboard page handler.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
) -> Result<DashboardTemplate> {
    let stats = DashboardStats::load(state.store(), state.today()).await?;
    Ok(DashboardTemplate { layout, stats })
}
