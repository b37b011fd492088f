//! Demo catalog seeding.

use chocolatier_backend::memory::seed::{SeedOutcome, seed_demo_catalog};
use chrono::Utc;
use tracing::info;

use super::{CliError, connect};

/// Load the demo catalog into the configured backend.
///
/// Without `force`, a store that already has seasons is left alone.
///
/// # Errors
///
/// Returns `CliError` if the backend cannot be reached or a write fails.
pub async fn demo_catalog(force: bool) -> Result<(), CliError> {
    let backend = connect().await?;
    let today = Utc::now().date_naive();

    match seed_demo_catalog(backend.store.as_ref(), today, force).await? {
        SeedOutcome::Skipped => {
            info!("Store already has seasons; pass --force to seed anyway");
        }
        SeedOutcome::Seeded {
            seasons,
            products,
            cycle_products,
        } => {
            info!(seasons, products, cycle_products, "Demo catalog seeded");
        }
    }
    Ok(())
}
