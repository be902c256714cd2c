use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use forgedesk_core::DomainError;

/// Reservation lifecycle status.
///
/// `Active` and `OnHold` are legacy values still found in stored data; they count
/// as active but nothing transitions into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Draft,
    Committed,
    Active,
    InProgress,
    OnHold,
    Fulfilled,
    Cancelled,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 7] = [
        ReservationStatus::Draft,
        ReservationStatus::Committed,
        ReservationStatus::Active,
        ReservationStatus::InProgress,
        ReservationStatus::OnHold,
        ReservationStatus::Fulfilled,
        ReservationStatus::Cancelled,
    ];

    /// Statuses whose reservation items hold stock.
    pub const ACTIVE: [ReservationStatus; 5] = [
        ReservationStatus::Draft,
        ReservationStatus::Committed,
        ReservationStatus::Active,
        ReservationStatus::InProgress,
        ReservationStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Draft => "draft",
            ReservationStatus::Committed => "committed",
            ReservationStatus::Active => "active",
            ReservationStatus::InProgress => "in_progress",
            ReservationStatus::OnHold => "on_hold",
            ReservationStatus::Fulfilled => "fulfilled",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReservationStatus::Draft => "Draft",
            ReservationStatus::Committed => "Committed",
            ReservationStatus::Active => "Active",
            ReservationStatus::InProgress => "In Process",
            ReservationStatus::OnHold => "On Hold",
            ReservationStatus::Fulfilled => "Fulfilled",
            ReservationStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Fulfilled | ReservationStatus::Cancelled)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("invalid reservation status '{s}'")))
    }
}
