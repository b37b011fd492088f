//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use chocolatier_core::catalog::Listing;
use chocolatier_core::models::{PurchaseCycle, Season};
use chocolatier_core::store::{ProductQuery, ProductSort};
use chocolatier_core::validation::non_blank;
use chocolatier_core::{ProductId, SeasonId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::Page;
use crate::services::CatalogService;
use crate::state::AppState;

/// Listing query string.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub season: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
}

impl ProductsQuery {
    /// Season filter; blank or malformed ids mean all seasons.
    fn season_id(&self) -> Option<SeasonId> {
        self.season
            .as_deref()
            .and_then(|value| value.trim().parse().ok())
    }

    fn to_product_query(&self) -> ProductQuery {
        ProductQuery {
            season_id: self.season_id(),
            search: self.q.as_deref().and_then(non_blank),
            sort: ProductSort::parse_or_default(self.sort.as_deref()),
            ..ProductQuery::default()
        }
    }
}

/// An `<option>` in a filter dropdown.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: Page,
    pub listings: Vec<Listing>,
    pub search: String,
    pub season_options: Vec<SelectOption>,
    pub sort_options: Vec<SelectOption>,
    pub cycle: Option<PurchaseCycle>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: Page,
    pub listing: Listing,
    pub season: Option<Season>,
    pub cycle: Option<PurchaseCycle>,
}

/// Display the product listing.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    Query(params): Query<ProductsQuery>,
) -> Result<ProductsIndexTemplate> {
    let catalog = CatalogService::new(state.store(), state.today());
    let storefront = catalog.storefront().await?;
    let query = params.to_product_query();
    let listings = catalog.listings(&storefront, &query).await?;

    let mut season_options = vec![SelectOption {
        value: String::new(),
        label: "All seasons".to_string(),
        selected: query.season_id.is_none(),
    }];
    season_options.extend(storefront.seasons.iter().map(|season| SelectOption {
        value: season.id.to_string(),
        label: season.name.clone(),
        selected: query.season_id == Some(season.id),
    }));

    let sort_options = ProductSort::ALL
        .into_iter()
        .map(|sort| SelectOption {
            value: sort.as_str().to_string(),
            label: sort.label().to_string(),
            selected: sort == query.sort,
        })
        .collect();

    Ok(ProductsIndexTemplate {
        page,
        listings,
        search: query.search.unwrap_or_default(),
        season_options,
        sort_options,
        cycle: storefront.open_cycle,
    })
}

/// Display a single product.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: Page,
    Path(id): Path<i64>,
) -> Result<ProductShowTemplate> {
    let catalog = CatalogService::new(state.store(), state.today());
    let storefront = catalog.storefront().await?;
    let listing = catalog
        .listing(&storefront, ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    let season = listing
        .product
        .season_id
        .and_then(|season_id| storefront.season(season_id).cloned());

    Ok(ProductShowTemplate {
        page,
        listing,
        season,
        cycle: storefront.open_cycle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parsing() {
        let params = ProductsQuery {
            season: Some("3".to_string()),
            q: Some("  truffle ".to_string()),
            sort: Some("price_desc".to_string()),
        };
        let query = params.to_product_query();
        assert_eq!(query.season_id, Some(SeasonId::new(3)));
        assert_eq!(query.search.as_deref(), Some("truffle"));
        assert_eq!(query.sort, ProductSort::PriceDesc);
    }

    #[test]
    fn test_blank_query_means_everything() {
        let params = ProductsQuery {
            season: Some(String::new()),
            q: Some("   ".to_string()),
            sort: Some("bogus".to_string()),
        };
        let query = params.to_product_query();
        assert_eq!(query, ProductQuery::default());
    }
}
