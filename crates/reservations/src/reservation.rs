use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use forgedesk_core::{DomainError, DomainResult, ItemId, ReservationId};

use crate::status::ReservationStatus;

/// Job details supplied when committing stock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub job_number: String,
    pub job_name: String,
    pub requested_by: String,
    /// `YYYY-MM-DD`; blank means no date.
    #[serde(default)]
    pub needed_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Job metadata after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidJobMetadata {
    pub job_number: String,
    pub job_name: String,
    pub requested_by: String,
    pub needed_by: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl JobMetadata {
    pub fn new(
        job_number: impl Into<String>,
        job_name: impl Into<String>,
        requested_by: impl Into<String>,
    ) -> Self {
        Self {
            job_number: job_number.into(),
            job_name: job_name.into(),
            requested_by: requested_by.into(),
            needed_by: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> DomainResult<ValidJobMetadata> {
        let job_number = self.job_number.trim();
        let job_name = self.job_name.trim();
        let requested_by = self.requested_by.trim();
        if job_number.is_empty() || job_name.is_empty() || requested_by.is_empty() {
            return Err(DomainError::validation(
                "job number, job name and requester are required",
            ));
        }

        let needed_by = match self.needed_by.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                DomainError::validation(format!("needed-by date '{raw}' is not in YYYY-MM-DD format"))
            })?),
        };

        Ok(ValidJobMetadata {
            job_number: job_number.to_string(),
            job_name: job_name.to_string(),
            requested_by: requested_by.to_string(),
            needed_by,
            notes: self
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        })
    }
}

/// Stored reservation header. `job_number` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReservation {
    pub id: ReservationId,
    pub job_number: String,
    pub job_name: String,
    pub requested_by: String,
    pub needed_by: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobReservation {
    pub fn from_metadata(meta: ValidJobMetadata, now: DateTime<Utc>) -> Self {
        Self {
            id: ReservationId::new(),
            job_number: meta.job_number,
            job_name: meta.job_name,
            requested_by: meta.requested_by,
            needed_by: meta.needed_by,
            notes: meta.notes,
            status: ReservationStatus::Committed,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge metadata from a repeated commit for the same job number.
    ///
    /// The reservation returns to `committed`; terminal reservations cannot be
    /// committed against again.
    pub fn merge_metadata(&mut self, meta: ValidJobMetadata, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                ReservationStatus::Committed.as_str(),
            ));
        }
        self.job_name = meta.job_name;
        self.requested_by = meta.requested_by;
        self.needed_by = meta.needed_by;
        self.notes = meta.notes;
        self.status = ReservationStatus::Committed;
        self.updated_at = now;
        Ok(())
    }
}

/// Quantities one reservation holds against one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationItem {
    pub reservation_id: ReservationId,
    pub item_id: ItemId,
    /// Informational; what the estimate asked for.
    pub requested_qty: i64,
    /// Currently held against the item.
    pub committed_qty: i64,
    /// Permanently taken; never decreases.
    pub consumed_qty: i64,
}

/// Reservation item with resolved inventory details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationItemView {
    #[serde(flatten)]
    pub line: ReservationItem,
    pub sku: String,
    pub item_name: String,
    pub stock: i64,
    pub available_qty: i64,
}

/// Row in the reservation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationSummary {
    #[serde(flatten)]
    pub reservation: JobReservation,
    pub line_count: usize,
    pub requested_total: i64,
    pub committed_total: i64,
    pub consumed_total: i64,
}

impl ReservationSummary {
    pub fn new(reservation: JobReservation, items: &[ReservationItem]) -> Self {
        Self {
            reservation,
            line_count: items.len(),
            requested_total: items.iter().map(|i| i.requested_qty).sum(),
            committed_total: items.iter().map(|i| i.committed_qty).sum(),
            consumed_total: items.iter().map(|i| i.consumed_qty).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: JobReservation,
    pub lines: Vec<ReservationItemView>,
}
