//! Demo catalog.
//!
//! Seasons are positioned relative to the seeding day so the storefront
//! always has a current, an upcoming and a past season to show.

use chocolatier_core::models::{CycleProductInput, ProductInput, PurchaseCycleInput, SeasonInput};
use chocolatier_core::store::{DataStore, ProductQuery, StoreResult};
use chocolatier_core::{Money, PurchaseCycleStatus, SeasonId};
use chrono::{Days, NaiveDate};
use tracing::info;

/// What a seeding run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already had seasons and `force` was not set.
    Skipped,
    Seeded {
        seasons: usize,
        products: usize,
        cycle_products: usize,
    },
}

struct DemoProduct {
    name: &'static str,
    description: &'static str,
    cents: i64,
    /// Index into the seeded seasons, `None` for year-round products
    season: Option<usize>,
    featured: bool,
    available: bool,
}

const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        name: "Raspberry Rose Truffles",
        description: "Twelve dark chocolate truffles with raspberry ganache and a hint of rose.",
        cents: 2800,
        season: Some(0),
        featured: true,
        available: true,
    },
    DemoProduct {
        name: "Ruby Heart Box",
        description: "Hand-painted ruby chocolate hearts filled with passion fruit caramel.",
        cents: 3400,
        season: Some(0),
        featured: true,
        available: true,
    },
    DemoProduct {
        name: "Champagne Pearls",
        description: "White chocolate pearls with a champagne center. Limited batch.",
        cents: 2200,
        season: Some(0),
        featured: false,
        available: false,
    },
    DemoProduct {
        name: "Speckled Praline Eggs",
        description: "Milk chocolate eggs filled with hazelnut praline.",
        cents: 1900,
        season: Some(1),
        featured: true,
        available: true,
    },
    DemoProduct {
        name: "Gingerbread Bark",
        description: "Dark chocolate bark with candied ginger and spiced crumble.",
        cents: 1400,
        season: Some(2),
        featured: false,
        available: false,
    },
    DemoProduct {
        name: "Sea Salt Caramels",
        description: "Soft butter caramels dipped in 70% dark chocolate and finished with flaky salt.",
        cents: 1800,
        season: None,
        featured: true,
        available: true,
    },
    DemoProduct {
        name: "Single Origin Tasting Flight",
        description: "Five bars from Ecuador, Madagascar, Peru, Ghana and Vietnam.",
        cents: 4500,
        season: None,
        featured: false,
        available: true,
    },
    DemoProduct {
        name: "Drinking Chocolate Tin",
        description: "Shaved 64% chocolate for stovetop hot chocolate. Makes twelve cups.",
        cents: 1600,
        season: None,
        featured: false,
        available: true,
    },
];

fn shift(today: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        today.checked_add_days(magnitude)
    } else {
        today.checked_sub_days(magnitude)
    };
    shifted.unwrap_or(today)
}

fn demo_seasons(today: NaiveDate) -> [SeasonInput; 3] {
    [
        SeasonInput {
            name: "Valentine's Collection".to_string(),
            description: Some("Truffles, hearts and ruby chocolate for the season of love.".to_string()),
            start_date: shift(today, -7),
            end_date: shift(today, 21),
        },
        SeasonInput {
            name: "Easter".to_string(),
            description: Some("Praline eggs and spring bonbons.".to_string()),
            start_date: shift(today, 35),
            end_date: shift(today, 70),
        },
        SeasonInput {
            name: "Winter Holidays".to_string(),
            description: Some("Spiced barks and gift tins.".to_string()),
            start_date: shift(today, -120),
            end_date: shift(today, -60),
        },
    ]
}

/// Load the demo catalog into `store`.
///
/// Without `force`, a store that already has seasons is left untouched.
///
/// # Errors
///
/// Returns the first `StoreError` raised while writing.
pub async fn seed_demo_catalog(
    store: &dyn DataStore,
    today: NaiveDate,
    force: bool,
) -> StoreResult<SeedOutcome> {
    if !force && !store.list_seasons().await?.is_empty() {
        info!("Store already has seasons, skipping demo catalog");
        return Ok(SeedOutcome::Skipped);
    }

    let mut season_ids: Vec<SeasonId> = Vec::new();
    for input in demo_seasons(today) {
        season_ids.push(store.create_season(&input).await?.id);
    }

    let mut products = Vec::new();
    for demo in DEMO_PRODUCTS {
        let input = ProductInput {
            name: demo.name.to_string(),
            description: demo.description.to_string(),
            price: Money::from_cents(demo.cents),
            image_url: None,
            season_id: demo.season.and_then(|i| season_ids.get(i).copied()),
            is_available: demo.available,
            is_featured: demo.featured,
        };
        products.push(store.create_product(&input).await?);
    }

    let cycle = store
        .create_purchase_cycle(&PurchaseCycleInput {
            name: "Valentine's pre-orders".to_string(),
            season_id: season_ids.first().copied(),
            starts_on: shift(today, -3),
            ends_on: shift(today, 10),
            status: PurchaseCycleStatus::Open,
            notes: Some("Ships the week before Valentine's Day.".to_string()),
        })
        .await?;

    // Cycle pricing: a discount on the truffles, and the caramels paused for
    // this cycle while they stay available in the master catalog.
    let overrides = [
        ("Raspberry Rose Truffles", Some(Money::from_cents(2500)), true),
        ("Ruby Heart Box", None, true),
        ("Sea Salt Caramels", None, false),
    ];
    let mut cycle_products = 0;
    for (name, price_override, available) in overrides {
        if let Some(product) = products.iter().find(|p| p.name == name) {
            store
                .create_cycle_product(&CycleProductInput::snapshot(
                    cycle.id,
                    product,
                    price_override,
                    available,
                ))
                .await?;
            cycle_products += 1;
        }
    }

    let outcome = SeedOutcome::Seeded {
        seasons: season_ids.len(),
        products: products.len(),
        cycle_products,
    };
    info!(?outcome, "Demo catalog loaded");
    Ok(outcome)
}

/// Whether the store's product table is empty.
///
/// # Errors
///
/// Returns the `StoreError` from listing products.
pub async fn catalog_is_empty(store: &dyn DataStore) -> StoreResult<bool> {
    let query = ProductQuery {
        limit: Some(1),
        ..ProductQuery::default()
    };
    Ok(store.list_products(&query).await?.is_empty())
}
