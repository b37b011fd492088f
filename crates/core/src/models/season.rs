//! Seasons: named, time-boxed merchandising periods.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{SeasonId, SeasonPhase};

/// A merchandising season such as "Valentine's Day" or "Winter Holidays".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Season {
    /// Phase of the season on `today`.
    #[must_use]
    pub fn phase(&self, today: NaiveDate) -> SeasonPhase {
        SeasonPhase::of(self.start_date, self.end_date, today)
    }

    /// Whether `today` falls within the season (inclusive).
    #[must_use]
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.phase(today) == SeasonPhase::Current
    }

    /// Date range for display, e.g. `Feb 1 - Feb 14, 2026`.
    #[must_use]
    pub fn date_range(&self) -> String {
        format_date_range(self.start_date, self.end_date)
    }
}

/// Fields an admin provides when creating or editing a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonInput {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Format an inclusive date range compactly.
#[must_use]
pub fn format_date_range(start: NaiveDate, end: NaiveDate) -> String {
    if start.year() == end.year() {
        format!("{} - {}", start.format("%b %-d"), end.format("%b %-d, %Y"))
    } else {
        format!("{} - {}", start.format("%b %-d, %Y"), end.format("%b %-d, %Y"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_range_same_year() {
        assert_eq!(
            format_date_range(date(2026, 2, 1), date(2026, 2, 14)),
            "Feb 1 - Feb 14, 2026"
        );
    }

    #[test]
    fn test_date_range_across_years() {
        assert_eq!(
            format_date_range(date(2026, 12, 1), date(2027, 1, 6)),
            "Dec 1, 2026 - Jan 6, 2027"
        );
    }

    #[test]
    fn test_season_deserializes_backend_row() {
        let json = r#"{
            "id": 3,
            "name": "Easter",
            "description": null,
            "start_date": "2026-03-20",
            "end_date": "2026-04-12",
            "created_at": "2026-01-05T10:00:00+00:00"
        }"#;
        let season: Season = serde_json::from_str(json).unwrap();
        assert_eq!(season.id, SeasonId::new(3));
        assert!(season.is_current(date(2026, 4, 1)));
        assert!(!season.is_current(date(2026, 4, 13)));
    }
}
