//! Product management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chocolatier_core::models::{Product, Season};
use chocolatier_core::store::{ProductQuery, ProductSort};
use chocolatier_core::validation::{FieldErrors, non_blank};
use chocolatier_core::{ProductId, SeasonId, Toast};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::Layout;
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::ProductForm;
use crate::middleware::RequireAdminAuth;
use crate::routes::{invalid_form, report};
use crate::state::AppState;

/// Listing filters from the query string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    pub season: String,
    pub q: String,
}

impl ProductFilter {
    fn season_id(&self) -> Option<SeasonId> {
        self.season.parse().ok()
    }

    fn query(&self) -> ProductQuery {
        ProductQuery {
            season_id: self.season_id(),
            search: non_blank(&self.q),
            sort: ProductSort::NameAsc,
            ..ProductQuery::default()
        }
    }
}

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub products: Vec<Product>,
    pub seasons: Vec<Season>,
    pub filter: ProductFilter,
}

impl ProductsIndexTemplate {
    fn season_name(&self, product: &Product) -> Option<&str> {
        let id = product.season_id?;
        self.seasons
            .iter()
            .find(|season| season.id == id)
            .map(|season| season.name.as_str())
    }

    fn filters_season(&self, season: &Season) -> bool {
        self.filter.season_id() == Some(season.id)
    }
}

/// Product create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub layout: Layout,
    /// `None` when creating.
    pub product_id: Option<ProductId>,
    pub form: ProductForm,
    pub seasons: Vec<Season>,
    pub errors: FieldErrors,
}

impl ProductFormTemplate {
    fn action(&self) -> String {
        self.product_id
            .map_or_else(|| "/products".to_string(), |id| format!("/products/{id}"))
    }
}

async fn load_product(state: &AppState, id: i64) -> Result<Product> {
    state
        .store()
        .get_product(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

fn rejected(
    layout: Layout,
    product_id: Option<ProductId>,
    form: ProductForm,
    seasons: Vec<Season>,
    errors: FieldErrors,
) -> Response {
    let layout = match errors.first_message() {
        Some(message) => layout.with_toast(Toast::error(message)),
        None => layout,
    };
    invalid_form(ProductFormTemplate {
        layout,
        product_id,
        form,
        seasons,
        errors,
    })
}

/// List products, optionally filtered by season and name.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
    Query(filter): Query<ProductFilter>,
) -> Result<ProductsIndexTemplate> {
    let products = state.store().list_products(&filter.query()).await?;
    let seasons = state.store().list_seasons().await?;
    Ok(ProductsIndexTemplate {
        layout,
        products,
        seasons,
        filter,
    })
}

/// New product form.
#[instrument(skip_all)]
pub async fn new(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
) -> Result<ProductFormTemplate> {
    Ok(ProductFormTemplate {
        layout,
        product_id: None,
        form: ProductForm::new_product(),
        seasons: state.store().list_seasons().await?,
        errors: FieldErrors::new(),
    })
}

/// Create a product.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let seasons = state.store().list_seasons().await?;
    let input = match form.validate(&seasons) {
        Ok(input) => input,
        Err(errors) => return Ok(rejected(layout, None, form, seasons, errors)),
    };
    let result = state.store().create_product(&input).await;
    if let Some(product) = report(&session, "create product", result, |p| {
        format!("Product \"{}\" created.", p.name)
    })
    .await
    {
        tracing::info!(product_id = %product.id, "Product created");
    }
    Ok(Redirect::to("/products").into_response())
}

/// Edit product form.
#[instrument(skip_all)]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<i64>,
) -> Result<ProductFormTemplate> {
    let product = load_product(&state, id).await?;
    Ok(ProductFormTemplate {
        layout,
        product_id: Some(product.id),
        form: ProductForm::from(&product),
        seasons: state.store().list_seasons().await?,
        errors: FieldErrors::new(),
    })
}

/// Update a product.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let product_id = ProductId::new(id);
    let seasons = state.store().list_seasons().await?;
    let input = match form.validate(&seasons) {
        Ok(input) => input,
        Err(errors) => return Ok(rejected(layout, Some(product_id), form, seasons, errors)),
    };
    let result = state.store().update_product(product_id, &input).await;
    report(&session, "update product", result, |p| {
        format!("Product \"{}\" updated.", p.name)
    })
    .await;
    Ok(Redirect::to("/products").into_response())
}

/// Flip a product's availability.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = id))]
pub async fn toggle_availability(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Redirect> {
    let product = load_product(&state, id).await?;
    let result = state
        .store()
        .set_product_availability(product.id, !product.is_available)
        .await;
    report(&session, "update availability", result, |p| {
        if p.is_available {
            format!("\"{}\" is now available.", p.name)
        } else {
            format!("\"{}\" is now hidden from the shop.", p.name)
        }
    })
    .await;
    Ok(Redirect::to("/products"))
}

/// Delete a product. Products that are part of a purchase cycle are kept.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<i64>,
) -> Redirect {
    let result = state.store().delete_product(ProductId::new(id)).await;
    report(&session, "delete product", result, |_| "Product deleted.".to_string()).await;
    Redirect::to("/products")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_ignores_blank_values() {
        let query = ProductFilter::default().query();
        assert_eq!(query.season_id, None);
        assert_eq!(query.search, None);

        let query = ProductFilter {
            season: "2".to_string(),
            q: " ruby ".to_string(),
        }
        .query();
        assert_eq!(query.season_id, Some(SeasonId::new(2)));
        assert_eq!(query.search.as_deref(), Some("ruby"));
    }
}
