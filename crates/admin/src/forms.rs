//! Admin form payloads and their validation.
//!
//! Forms keep every field as submitted text so an invalid submission can be
//! re-rendered exactly as typed. `validate` turns a form into the store input
//! or the per-field errors to show next to each input.
//!
//! Checkboxes are `Option<String>`: browsers omit unchecked boxes entirely.

use chocolatier_core::models::{
    CycleProductUpdate, Product, ProductInput, PurchaseCycle, PurchaseCycleInput, Season,
    SeasonInput,
};
use chocolatier_core::validation::{FieldErrors, non_blank, required};
use chocolatier_core::{Money, ProductId, PurchaseCycleStatus, SeasonId};
use chrono::NaiveDate;
use serde::Deserialize;

const MAX_NAME: usize = 120;
const MAX_DESCRIPTION: usize = 2000;
const MAX_NOTES: usize = 1000;

/// Format used by `<input type="date">`.
const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(errors: &mut FieldErrors, field: &'static str, label: &str, value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{label} is required"));
        return None;
    }
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, format!("{label} must be a date like 2026-02-14"));
            None
        }
    }
}

fn optional_text(errors: &mut FieldErrors, field: &'static str, label: &str, value: &str, max: usize) -> Option<String> {
    let value = non_blank(value)?;
    if value.chars().count() > max {
        errors.add(field, format!("{label} must be at most {max} characters"));
    }
    Some(value)
}

/// Resolve a season picked from a `<select>`; blank means none.
fn season_choice(errors: &mut FieldErrors, value: &str, seasons: &[Season]) -> Option<SeasonId> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let found = value
        .parse::<SeasonId>()
        .ok()
        .filter(|id| seasons.iter().any(|season| season.id == *id));
    if found.is_none() {
        errors.add("season_id", "Choose an existing season");
    }
    found
}

/// Parse an optional price; blank means no value.
fn optional_price(errors: &mut FieldErrors, field: &'static str, value: &str) -> Option<Money> {
    if value.trim().is_empty() {
        return None;
    }
    match Money::parse(value) {
        Ok(money) => Some(money),
        Err(e) => {
            errors.add(field, format!("Price: {e}"));
            None
        }
    }
}

fn date_value(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// =============================================================================
// Seasons
// =============================================================================

/// Season create/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeasonForm {
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
}

impl SeasonForm {
    /// Validate into a [`SeasonInput`].
    ///
    /// # Errors
    ///
    /// Returns the field errors when the name is missing, a date is invalid,
    /// or the season would end before it starts.
    pub fn validate(&self) -> Result<SeasonInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required(&mut errors, "name", "Name", &self.name, MAX_NAME);
        let description = optional_text(&mut errors, "description", "Description", &self.description, MAX_DESCRIPTION);
        let start = parse_date(&mut errors, "start_date", "Start date", &self.start_date);
        let end = parse_date(&mut errors, "end_date", "End date", &self.end_date);

        match (start, end) {
            (Some(start_date), Some(end_date)) => {
                if start_date > end_date {
                    errors.add("end_date", "End date must be on or after the start date");
                }
                errors.into_result(SeasonInput {
                    name,
                    description,
                    start_date,
                    end_date,
                })
            }
            _ => Err(errors),
        }
    }
}

impl From<&Season> for SeasonForm {
    fn from(season: &Season) -> Self {
        Self {
            name: season.name.clone(),
            description: season.description.clone().unwrap_or_default(),
            start_date: date_value(season.start_date),
            end_date: date_value(season.end_date),
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// Product create/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub season_id: String,
    pub is_available: Option<String>,
    pub is_featured: Option<String>,
}

impl ProductForm {
    /// Blank form for a new product, available by default.
    #[must_use]
    pub fn new_product() -> Self {
        Self {
            is_available: Some("on".to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn available(&self) -> bool {
        self.is_available.is_some()
    }

    #[must_use]
    pub const fn featured(&self) -> bool {
        self.is_featured.is_some()
    }

    /// Whether `season` is the selected option.
    #[must_use]
    pub fn selects(&self, season: &Season) -> bool {
        self.season_id.trim() == season.id.to_string()
    }

    /// Validate into a [`ProductInput`] against the existing seasons.
    ///
    /// # Errors
    ///
    /// Returns the field errors when the name is missing, the price is not a
    /// non-negative amount, the image URL is not http(s), or the season does
    /// not exist.
    pub fn validate(&self, seasons: &[Season]) -> Result<ProductInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required(&mut errors, "name", "Name", &self.name, MAX_NAME);
        let description = optional_text(&mut errors, "description", "Description", &self.description, MAX_DESCRIPTION)
            .unwrap_or_default();
        let price = match Money::parse(&self.price) {
            Ok(price) => Some(price),
            Err(e) => {
                errors.add("price", format!("Price: {e}"));
                None
            }
        };
        let image_url = non_blank(&self.image_url);
        if image_url
            .as_deref()
            .is_some_and(|url| !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/')))
        {
            errors.add("image_url", "Image URL must start with https:// or /");
        }
        let season_id = season_choice(&mut errors, &self.season_id, seasons);

        let Some(price) = price else {
            return Err(errors);
        };
        errors.into_result(ProductInput {
            name,
            description,
            price,
            image_url,
            season_id,
            is_available: self.available(),
            is_featured: self.featured(),
        })
    }
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_plain_string(),
            image_url: product.image_url.clone().unwrap_or_default(),
            season_id: product.season_id.map(|id| id.to_string()).unwrap_or_default(),
            is_available: product.is_available.then(|| "on".to_string()),
            is_featured: product.is_featured.then(|| "on".to_string()),
        }
    }
}

// =============================================================================
// Purchase cycles
// =============================================================================

/// Purchase cycle create/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CycleForm {
    pub name: String,
    pub season_id: String,
    pub starts_on: String,
    pub ends_on: String,
    pub status: String,
    pub notes: String,
}

impl CycleForm {
    /// Blank form for a new cycle, planned by default.
    #[must_use]
    pub fn new_cycle() -> Self {
        Self {
            status: PurchaseCycleStatus::Planned.as_str().to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn selects(&self, season: &Season) -> bool {
        self.season_id.trim() == season.id.to_string()
    }

    #[must_use]
    pub fn has_status(&self, status: &PurchaseCycleStatus) -> bool {
        self.status == status.as_str()
    }

    /// Validate into a [`PurchaseCycleInput`] against the existing seasons.
    ///
    /// # Errors
    ///
    /// Returns the field errors when the name is missing, a date is invalid,
    /// the cycle would end before it starts, or the status is unknown.
    pub fn validate(&self, seasons: &[Season]) -> Result<PurchaseCycleInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required(&mut errors, "name", "Name", &self.name, MAX_NAME);
        let season_id = season_choice(&mut errors, &self.season_id, seasons);
        let starts_on = parse_date(&mut errors, "starts_on", "Start date", &self.starts_on);
        let ends_on = parse_date(&mut errors, "ends_on", "End date", &self.ends_on);
        if let (Some(start), Some(end)) = (starts_on, ends_on)
            && start > end
        {
            errors.add("ends_on", "End date must be on or after the start date");
        }
        let status = self.status.trim().parse::<PurchaseCycleStatus>().ok();
        if status.is_none() {
            errors.add("status", "Choose a valid status");
        }
        let notes = optional_text(&mut errors, "notes", "Notes", &self.notes, MAX_NOTES);

        match (starts_on, ends_on, status) {
            (Some(starts_on), Some(ends_on), Some(status)) => errors.into_result(PurchaseCycleInput {
                name,
                season_id,
                starts_on,
                ends_on,
                status,
                notes,
            }),
            _ => Err(errors),
        }
    }
}

impl From<&PurchaseCycle> for CycleForm {
    fn from(cycle: &PurchaseCycle) -> Self {
        Self {
            name: cycle.name.clone(),
            season_id: cycle.season_id.map(|id| id.to_string()).unwrap_or_default(),
            starts_on: date_value(cycle.starts_on),
            ends_on: date_value(cycle.ends_on),
            status: cycle.status.as_str().to_string(),
            notes: cycle.notes.clone().unwrap_or_default(),
        }
    }
}

// =============================================================================
// Cycle product overrides
// =============================================================================

/// Add-override form on the cycle detail page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddCycleProductForm {
    pub product_id: String,
    pub price_override: String,
    pub is_available: Option<String>,
}

impl AddCycleProductForm {
    /// Validate into the product to snapshot and its override values.
    ///
    /// # Errors
    ///
    /// Returns the field errors when no product is chosen or the override
    /// price is present but invalid.
    pub fn validate(&self) -> Result<(ProductId, CycleProductUpdate), FieldErrors> {
        let mut errors = FieldErrors::new();
        let product_id = self.product_id.trim().parse::<ProductId>().ok();
        if product_id.is_none() {
            errors.add("product_id", "Choose a product");
        }
        let price_override = optional_price(&mut errors, "price_override", &self.price_override);
        let update = CycleProductUpdate {
            price_override,
            is_available: self.is_available.is_some(),
        };
        match product_id {
            Some(product_id) => errors.into_result((product_id, update)),
            None => Err(errors),
        }
    }
}

/// Inline edit form for an existing override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CycleProductForm {
    pub price_override: String,
    pub is_available: Option<String>,
}

impl CycleProductForm {
    /// Validate into a [`CycleProductUpdate`]. A blank price clears the override.
    ///
    /// # Errors
    ///
    /// Returns the field errors when the price is present but invalid.
    pub fn validate(&self) -> Result<CycleProductUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        let price_override = optional_price(&mut errors, "price_override", &self.price_override);
        errors.into_result(CycleProductUpdate {
            price_override,
            is_available: self.is_available.is_some(),
        })
    }
}
