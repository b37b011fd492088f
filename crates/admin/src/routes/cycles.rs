//! Purchase cycle route handlers.
//!
//! A cycle carries its own price and availability overrides. Adding a product
//! to a cycle snapshots its name, image and base price, so later catalog edits
//! do not rewrite what the cycle offered.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chocolatier_core::models::{CycleProduct, CycleProductInput, Product, PurchaseCycle, Season};
use chocolatier_core::store::{ProductQuery, ProductSort};
use chocolatier_core::validation::FieldErrors;
use chocolatier_core::{CycleProductId, PurchaseCycleId, PurchaseCycleStatus, Toast};
use chrono::NaiveDate;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::{Layout, flash};
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::{AddCycleProductForm, CycleForm, CycleProductForm};
use crate::middleware::RequireAdminAuth;
use crate::routes::{invalid_form, report};
use crate::state::AppState;

/// Cycle listing template.
#[derive(Template, WebTemplate)]
#[template(path = "cycles/index.html")]
pub struct CyclesIndexTemplate {
    pub layout: Layout,
    pub cycles: Vec<PurchaseCycle>,
    pub seasons: Vec<Season>,
    pub today: NaiveDate,
}

impl CyclesIndexTemplate {
    fn season_name(&self, cycle: &PurchaseCycle) -> Option<&str> {
        season_name(&self.seasons, cycle)
    }

    fn accepting(&self, cycle: &PurchaseCycle) -> bool {
        cycle.is_accepting_orders(self.today)
    }
}

/// Cycle detail template with its product overrides.
#[derive(Template, WebTemplate)]
#[template(path = "cycles/show.html")]
pub struct CycleShowTemplate {
    pub layout: Layout,
    pub cycle: PurchaseCycle,
    pub season: Option<String>,
    pub cycle_products: Vec<CycleProduct>,
    /// Catalog products not yet in this cycle.
    pub candidates: Vec<Product>,
    pub today: NaiveDate,
}

impl CycleShowTemplate {
    fn accepting(&self) -> bool {
        self.cycle.is_accepting_orders(self.today)
    }
}

/// Cycle create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "cycles/form.html")]
pub struct CycleFormTemplate {
    pub layout: Layout,
    /// `None` when creating.
    pub cycle_id: Option<PurchaseCycleId>,
    pub form: CycleForm,
    pub seasons: Vec<Season>,
    pub statuses: [PurchaseCycleStatus; 4],
    pub errors: FieldErrors,
}

impl CycleFormTemplate {
    fn action(&self) -> String {
        self.cycle_id
            .map_or_else(|| "/cycles".to_string(), |id| format!("/cycles/{id}"))
    }
}

fn season_name<'a>(seasons: &'a [Season], cycle: &PurchaseCycle) -> Option<&'a str> {
    let id = cycle.season_id?;
    seasons
        .iter()
        .find(|season| season.id == id)
        .map(|season| season.name.as_str())
}

async fn load_cycle(state: &AppState, id: i64) -> Result<PurchaseCycle> {
    state
        .store()
        .get_purchase_cycle(PurchaseCycleId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("purchase cycle {id}")))
}

/// Whether override `cp` belongs to cycle `id`.
async fn in_cycle(state: &AppState, id: i64, cp: i64) -> Result<bool> {
    Ok(state
        .store()
        .list_cycle_products(PurchaseCycleId::new(id))
        .await?
        .iter()
        .any(|row| row.id == CycleProductId::new(cp)))
}

fn cycle_path(id: i64) -> String {
    format!("/cycles/{id}")
}

fn rejected(
    layout: Layout,
    cycle_id: Option<PurchaseCycleId>,
    form: CycleForm,
    seasons: Vec<Season>,
    errors: FieldErrors,
) -> Response {
    let layout = match errors.first_message() {
        Some(message) => layout.with_toast(Toast::error(message)),
        None => layout,
    };
    invalid_form(CycleFormTemplate {
        layout,
        cycle_id,
        form,
        seasons,
        statuses: PurchaseCycleStatus::ALL,
        errors,
    })
}

/// List all purchase cycles.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
) -> Result<CyclesIndexTemplate> {
    let cycles = state.store().list_purchase_cycles().await?;
    let seasons = state.store().list_seasons().await?;
    Ok(CyclesIndexTemplate {
        layout,
        cycles,
        seasons,
        today: state.today(),
    })
}

/// Cycle detail with its product overrides.
#[instrument(skip_all, fields(cycle_id = id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<i64>,
) -> Result<CycleShowTemplate> {
    let cycle = load_cycle(&state, id).await?;
    let seasons = state.store().list_seasons().await?;
    let cycle_products = state.store().list_cycle_products(cycle.id).await?;
    let candidates = state
        .store()
        .list_products(&ProductQuery {
            sort: ProductSort::NameAsc,
            ..ProductQuery::default()
        })
        .await?
        .into_iter()
        .filter(|product| !cycle_products.iter().any(|cp| cp.product_id == product.id))
        .collect();

    Ok(CycleShowTemplate {
        layout,
        season: season_name(&seasons, &cycle).map(ToOwned::to_owned),
        cycle,
        cycle_products,
        candidates,
        today: state.today(),
    })
}

/// New cycle form.
#[instrument(skip_all)]
pub async fn new(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
) -> Result<CycleFormTemplate> {
    Ok(CycleFormTemplate {
        layout,
        cycle_id: None,
        form: CycleForm::new_cycle(),
        seasons: state.store().list_seasons().await?,
        statuses: PurchaseCycleStatus::ALL,
        errors: FieldErrors::new(),
    })
}

/// Create a cycle and go to its detail page to add products.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    session: Session,
    Form(form): Form<CycleForm>,
) -> Result<Response> {
    let seasons = state.store().list_seasons().await?;
    let input = match form.validate(&seasons) {
        Ok(input) => input,
        Err(errors) => return Ok(rejected(layout, None, form, seasons, errors)),
    };
    let result = state.store().create_purchase_cycle(&input).await;
    let target = match report(&session, "create purchase cycle", result, |c| {
        format!("Purchase cycle \"{}\" created.", c.name)
    })
    .await
    {
        Some(cycle) => {
            tracing::info!(cycle_id = %cycle.id, "Purchase cycle created");
            cycle_path(cycle.id.as_i64())
        }
        None => "/cycles".to_string(),
    };
    Ok(Redirect::to(&target).into_response())
}

/// Edit cycle form.
#[instrument(skip_all, fields(cycle_id = id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<i64>,
) -> Result<CycleFormTemplate> {
    let cycle = load_cycle(&state, id).await?;
    Ok(CycleFormTemplate {
        layout,
        cycle_id: Some(cycle.id),
        form: CycleForm::from(&cycle),
        seasons: state.store().list_seasons().await?,
        statuses: PurchaseCycleStatus::ALL,
        errors: FieldErrors::new(),
    })
}

/// Update a cycle.
#[instrument(skip_all, fields(admin_id = %admin.id, cycle_id = id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<CycleForm>,
) -> Result<Response> {
    let cycle_id = PurchaseCycleId::new(id);
    let seasons = state.store().list_seasons().await?;
    let input = match form.validate(&seasons) {
        Ok(input) => input,
        Err(errors) => return Ok(rejected(layout, Some(cycle_id), form, seasons, errors)),
    };
    let result = state.store().update_purchase_cycle(cycle_id, &input).await;
    report(&session, "update purchase cycle", result, |c| {
        format!("Purchase cycle \"{}\" updated.", c.name)
    })
    .await;
    Ok(Redirect::to(&cycle_path(id)).into_response())
}

/// Delete a cycle together with its overrides.
#[instrument(skip_all, fields(admin_id = %admin.id, cycle_id = id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<i64>,
) -> Redirect {
    let result = state
        .store()
        .delete_purchase_cycle(PurchaseCycleId::new(id))
        .await;
    report(&session, "delete purchase cycle", result, |_| {
        "Purchase cycle deleted.".to_string()
    })
    .await;
    Redirect::to("/cycles")
}

/// Add a product to the cycle, snapshotting its current catalog state.
#[instrument(skip_all, fields(admin_id = %admin.id, cycle_id = id))]
pub async fn add_product(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<AddCycleProductForm>,
) -> Result<Redirect> {
    let cycle = load_cycle(&state, id).await?;
    let (product_id, values) = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => {
            let message = errors.first_message().unwrap_or("Check the override values.");
            flash(&session, Toast::error(message)).await;
            return Ok(Redirect::to(&cycle_path(id)));
        }
    };
    let Some(product) = state.store().get_product(product_id).await? else {
        flash(&session, Toast::error("That product no longer exists.")).await;
        return Ok(Redirect::to(&cycle_path(id)));
    };

    let input = CycleProductInput::snapshot(
        cycle.id,
        &product,
        values.price_override,
        values.is_available,
    );
    let result = state.store().create_cycle_product(&input).await;
    report(&session, "add product", result, |row| {
        format!("\"{}\" added to {}.", row.product_name, cycle.name)
    })
    .await;
    Ok(Redirect::to(&cycle_path(id)))
}

/// Change an override's price or availability.
#[instrument(skip_all, fields(admin_id = %admin.id, cycle_id = id, cycle_product_id = cp))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path((id, cp)): Path<(i64, i64)>,
    Form(form): Form<CycleProductForm>,
) -> Result<Redirect> {
    if !in_cycle(&state, id, cp).await? {
        return Err(AppError::NotFound(format!("cycle product {cp}")));
    }
    match form.validate() {
        Ok(update) => {
            let result = state
                .store()
                .update_cycle_product(CycleProductId::new(cp), &update)
                .await;
            report(&session, "update product", result, |row| {
                format!("\"{}\" now sells for {}.", row.product_name, row.effective_price())
            })
            .await;
        }
        Err(errors) => {
            let message = errors.first_message().unwrap_or("Check the override values.");
            flash(&session, Toast::error(message)).await;
        }
    }
    Ok(Redirect::to(&cycle_path(id)))
}

/// Remove a product from the cycle.
#[instrument(skip_all, fields(admin_id = %admin.id, cycle_id = id, cycle_product_id = cp))]
pub async fn remove_product(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path((id, cp)): Path<(i64, i64)>,
) -> Result<Redirect> {
    if !in_cycle(&state, id, cp).await? {
        return Err(AppError::NotFound(format!("cycle product {cp}")));
    }
    let result = state
        .store()
        .delete_cycle_product(CycleProductId::new(cp))
        .await;
    report(&session, "remove product", result, |_| {
        "Product removed from the cycle.".to_string()
    })
    .await;
    Ok(Redirect::to(&cycle_path(id)))
}
