//! Season route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use chocolatier_core::catalog::Listing;
use chocolatier_core::models::Season;
use chocolatier_core::store::{ProductQuery, ProductSort};
use chocolatier_core::{SeasonId, SeasonPhase};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::Page;
use crate::services::CatalogService;
use crate::state::AppState;

/// A season with its phase on the day of the request.
#[derive(Debug, Clone)]
pub struct SeasonView {
    pub season: Season,
    pub phase: SeasonPhase,
}

/// Season listing template.
#[derive(Template, WebTemplate)]
#[template(path = "seasons/index.html")]
pub struct SeasonsIndexTemplate {
    pub page: Page,
    pub seasons: Vec<SeasonView>,
}

/// Single season template.
#[derive(Template, WebTemplate)]
#[template(path = "seasons/show.html")]
pub struct SeasonShowTemplate {
    pub page: Page,
    pub season: SeasonView,
    pub listings: Vec<Listing>,
}

/// Order seasons for display: current first, then upcoming by start date,
/// then past seasons most recent first.
fn arrange(seasons: Vec<Season>, today: chrono::NaiveDate) -> Vec<SeasonView> {
    let mut views: Vec<SeasonView> = seasons
        .into_iter()
        .map(|season| SeasonView {
            phase: season.phase(today),
            season,
        })
        .collect();
    views.sort_by(|a, b| {
        let rank = |phase: SeasonPhase| match phase {
            SeasonPhase::Current => 0,
            SeasonPhase::Upcoming => 1,
            SeasonPhase::Past => 2,
        };
        rank(a.phase).cmp(&rank(b.phase)).then_with(|| {
            if a.phase == SeasonPhase::Past {
                b.season.start_date.cmp(&a.season.start_date)
            } else {
                a.season.start_date.cmp(&b.season.start_date)
            }
        })
    });
    views
}

/// Display all seasons.
#[instrument(skip(state, page))]
pub async fn index(State(state): State<AppState>, page: Page) -> Result<SeasonsIndexTemplate> {
    let seasons = state.store().list_seasons().await?;
    Ok(SeasonsIndexTemplate {
        page,
        seasons: arrange(seasons, state.today()),
    })
}

/// Display one season and its products.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: Page,
    Path(id): Path<i64>,
) -> Result<SeasonShowTemplate> {
    let today = state.today();
    let catalog = CatalogService::new(state.store(), today);
    let storefront = catalog.storefront().await?;
    let season = storefront
        .season(SeasonId::new(id))
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("season {id}")))?;

    let query = ProductQuery {
        season_id: Some(season.id),
        sort: ProductSort::NameAsc,
        ..ProductQuery::default()
    };
    let listings = catalog.listings(&storefront, &query).await?;

    Ok(SeasonShowTemplate {
        page,
        season: SeasonView {
            phase: season.phase(today),
            season,
        },
        listings,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;

    fn season(id: i64, start: (u32, u32), end: (u32, u32)) -> Season {
        Season {
            id: SeasonId::new(id),
            name: format!("Season {id}"),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2026, start.0, start.1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, end.0, end.1).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_arrange_orders_by_phase() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let seasons = vec![
            season(1, (1, 1), (1, 31)),
            season(2, (12, 1), (12, 24)),
            season(3, (6, 1), (6, 30)),
            season(4, (3, 1), (3, 31)),
            season(5, (9, 1), (9, 30)),
        ];
        let ids: Vec<i64> = arrange(seasons, today)
            .iter()
            .map(|view| view.season.id.as_i64())
            .collect();
        assert_eq!(ids, vec![3, 5, 2, 4, 1]);
    }
}
