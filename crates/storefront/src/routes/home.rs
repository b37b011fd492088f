//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use chocolatier_core::catalog::Listing;
use chocolatier_core::models::{PurchaseCycle, Season};
use chocolatier_core::store::ProductQuery;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::Page;
use crate::services::CatalogService;
use crate::state::AppState;

/// Number of featured products on the home page.
const FEATURED_LIMIT: usize = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub season: Option<Season>,
    pub cycle: Option<PurchaseCycle>,
    pub featured: Vec<Listing>,
}

/// Display the home page.
///
/// Featured products from the current season come first; when no season is
/// running, featured products from the whole catalog are shown.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: Page) -> Result<HomeTemplate> {
    let catalog = CatalogService::new(state.store(), state.today());
    let storefront = catalog.storefront().await?;

    let mut query = ProductQuery {
        featured_only: true,
        season_id: storefront.current_season.as_ref().map(|season| season.id),
        limit: Some(FEATURED_LIMIT),
        ..ProductQuery::default()
    };
    let mut featured = catalog.listings(&storefront, &query).await?;
    if featured.is_empty() && query.season_id.is_some() {
        query.season_id = None;
        featured = catalog.listings(&storefront, &query).await?;
    }

    Ok(HomeTemplate {
        page,
        season: storefront.current_season,
        cycle: storefront.open_cycle,
        featured,
    })
}
