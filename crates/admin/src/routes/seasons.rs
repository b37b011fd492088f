//! Season management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chocolatier_core::models::Season;
use chocolatier_core::validation::FieldErrors;
use chocolatier_core::{SeasonId, SeasonPhase, Toast};
use chrono::NaiveDate;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::Layout;
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::SeasonForm;
use crate::middleware::RequireAdminAuth;
use crate::routes::{invalid_form, report};
use crate::state::AppState;

/// Season listing template.
#[derive(Template, WebTemplate)]
#[template(path = "seasons/index.html")]
pub struct SeasonsIndexTemplate {
    pub layout: Layout,
    pub seasons: Vec<Season>,
    pub today: NaiveDate,
}

impl SeasonsIndexTemplate {
    fn phase(&self, season: &Season) -> SeasonPhase {
        season.phase(self.today)
    }
}

/// Season create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "seasons/form.html")]
pub struct SeasonFormTemplate {
    pub layout: Layout,
    /// `None` when creating.
    pub season_id: Option<SeasonId>,
    pub form: SeasonForm,
    pub errors: FieldErrors,
}

impl SeasonFormTemplate {
    fn action(&self) -> String {
        self.season_id
            .map_or_else(|| "/seasons".to_string(), |id| format!("/seasons/{id}"))
    }
}

async fn load_season(state: &AppState, id: i64) -> Result<Season> {
    state
        .store()
        .get_season(SeasonId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("season {id}")))
}

fn rejected(layout: Layout, season_id: Option<SeasonId>, form: SeasonForm, errors: FieldErrors) -> Response {
    let layout = match errors.first_message() {
        Some(message) => layout.with_toast(Toast::error(message)),
        None => layout,
    };
    invalid_form(SeasonFormTemplate {
        layout,
        season_id,
        form,
        errors,
    })
}

/// List all seasons.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
) -> Result<SeasonsIndexTemplate> {
    let seasons = state.store().list_seasons().await?;
    Ok(SeasonsIndexTemplate {
        layout,
        seasons,
        today: state.today(),
    })
}

/// New season form.
pub async fn new(RequireAdminAuth(_admin): RequireAdminAuth, layout: Layout) -> SeasonFormTemplate {
    SeasonFormTemplate {
        layout,
        season_id: None,
        form: SeasonForm::default(),
        errors: FieldErrors::new(),
    }
}

/// Create a season.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    session: Session,
    Form(form): Form<SeasonForm>,
) -> Response {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return rejected(layout, None, form, errors),
    };
    let result = state.store().create_season(&input).await;
    if let Some(season) = report(&session, "create season", result, |s| {
        format!("Season \"{}\" created.", s.name)
    })
    .await
    {
        tracing::info!(season_id = %season.id, "Season created");
    }
    Redirect::to("/seasons").into_response()
}

/// Edit season form.
#[instrument(skip_all)]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<i64>,
) -> Result<SeasonFormTemplate> {
    let season = load_season(&state, id).await?;
    Ok(SeasonFormTemplate {
        layout,
        season_id: Some(season.id),
        form: SeasonForm::from(&season),
        errors: FieldErrors::new(),
    })
}

/// Update a season.
#[instrument(skip_all, fields(admin_id = %admin.id, season_id = id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<SeasonForm>,
) -> Response {
    let season_id = SeasonId::new(id);
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return rejected(layout, Some(season_id), form, errors),
    };
    let result = state.store().update_season(season_id, &input).await;
    report(&session, "update season", result, |s| {
        format!("Season \"{}\" updated.", s.name)
    })
    .await;
    Redirect::to("/seasons").into_response()
}

/// Delete a season. Seasons still used by products or cycles are kept.
#[instrument(skip_all, fields(admin_id = %admin.id, season_id = id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<i64>,
) -> Redirect {
    let result = state.store().delete_season(SeasonId::new(id)).await;
    report(&session, "delete season", result, |_| "Season deleted.".to_string()).await;
    Redirect::to("/seasons")
}
