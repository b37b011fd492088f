//! Status enums and their display mapping tables.
//!
//! Every status carries three presentations: the wire value stored by the
//! backend (`snake_case`), a human label, and the badge CSS class used by the
//! admin console.

use core::fmt;
use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Error returned when a status string does not match any known value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} status: {value}")]
pub struct UnknownStatus {
    kind: &'static str,
    value: String,
}

impl UnknownStatus {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order, for filter dropdowns.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Value stored by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Short label shown to customers and admins.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Preparing => "Being Prepared",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Sentence explaining the status on the customer's order page.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pending => "We received your order and will confirm it shortly.",
            Self::Confirmed => "Your order is confirmed and scheduled for this purchase cycle.",
            Self::Preparing => "Our chocolatiers are hand-making and packing your order.",
            Self::Shipped => "Your order is on its way.",
            Self::Delivered => "Your order was delivered. Enjoy!",
            Self::Cancelled => "This order was cancelled.",
        }
    }

    /// Badge CSS class used in the admin console.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Pending => "badge-warning",
            Self::Confirmed => "badge-info",
            Self::Preparing => "badge-primary",
            Self::Shipped => "badge-accent",
            Self::Delivered => "badge-success",
            Self::Cancelled => "badge-error",
        }
    }

    /// Whether the order still needs work.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether the order counts toward revenue.
    #[must_use]
    pub const fn counts_as_revenue(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus::new("order", s))
    }
}

/// Purchase cycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseCycleStatus {
    #[default]
    Planned,
    Open,
    Closed,
    Fulfilled,
}

impl PurchaseCycleStatus {
    pub const ALL: [Self; 4] = [Self::Planned, Self::Open, Self::Closed, Self::Fulfilled];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Fulfilled => "fulfilled",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Planned => "Planned",
            Self::Open => "Open for Orders",
            Self::Closed => "Closed",
            Self::Fulfilled => "Fulfilled",
        }
    }

    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Planned => "badge-ghost",
            Self::Open => "badge-success",
            Self::Closed => "badge-warning",
            Self::Fulfilled => "badge-neutral",
        }
    }
}

impl fmt::Display for PurchaseCycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseCycleStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus::new("purchase cycle", s))
    }
}

/// Where a season sits relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonPhase {
    Upcoming,
    Current,
    Past,
}

impl SeasonPhase {
    /// Derive the phase of an inclusive date range on `today`.
    #[must_use]
    pub fn of(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Self {
        if today < start {
            Self::Upcoming
        } else if today > end {
            Self::Past
        } else {
            Self::Current
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upcoming => "Coming Soon",
            Self::Current => "In Season",
            Self::Past => "Past Season",
        }
    }

    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Upcoming => "badge-info",
            Self::Current => "badge-success",
            Self::Past => "badge-ghost",
        }
    }
}

/// Role of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownStatus::new("role", s)),
        }
    }
}
