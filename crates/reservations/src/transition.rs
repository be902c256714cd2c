//! Reservation status transitions.
//!
//! The only transition is `committed -> in_progress`; requesting the current
//! status is a no-op. Completion (`in_progress -> fulfilled`) has its own
//! operation and is not reachable through a plain status change.

use serde::{Deserialize, Serialize};

use forgedesk_core::{DomainError, DomainResult, ItemId, ReservationId};

use crate::reservation::ReservationItem;
use crate::status::ReservationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    Apply(ReservationStatus),
}

pub fn check_transition(
    from: ReservationStatus,
    to: ReservationStatus,
) -> DomainResult<StatusChange> {
    if from == to {
        return Ok(StatusChange::Unchanged);
    }
    match (from, to) {
        (ReservationStatus::Committed, ReservationStatus::InProgress) => Ok(StatusChange::Apply(to)),
        _ => Err(DomainError::invalid_transition(from.as_str(), to.as_str())),
    }
}

/// A line whose commitment exceeds stock on hand when work starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortage {
    pub item_id: ItemId,
    pub sku: String,
    pub item_name: String,
    pub committed_qty: i64,
    pub stock: i64,
    pub shortfall: i64,
}

impl Shortage {
    pub fn detect(line: &ReservationItem, stock: i64, sku: &str, item_name: &str) -> Option<Self> {
        (line.committed_qty > stock).then(|| Shortage {
            item_id: line.item_id,
            sku: sku.to_string(),
            item_name: item_name.to_string(),
            committed_qty: line.committed_qty,
            stock,
            shortfall: line.committed_qty - stock,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub reservation_id: ReservationId,
    pub job_number: String,
    pub previous_status: ReservationStatus,
    pub new_status: ReservationStatus,
    pub changed: bool,
    /// Advisory only; the transition has already happened.
    pub shortages: Vec<Shortage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_committed_to_in_progress_is_allowed() {
        for from in ReservationStatus::ALL {
            for to in ReservationStatus::ALL {
                let result = check_transition(from, to);
                if from == to {
                    assert_eq!(result.unwrap(), StatusChange::Unchanged);
                } else if from == ReservationStatus::Committed && to == ReservationStatus::InProgress {
                    assert_eq!(result.unwrap(), StatusChange::Apply(to));
                } else {
                    match result {
                        Err(DomainError::InvalidTransition { from: f, to: t }) => {
                            assert_eq!(f, from.as_str());
                            assert_eq!(t, to.as_str());
                        }
                        other => panic!("{from} -> {to}: expected InvalidTransition, got {other:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn shortage_when_commitment_exceeds_stock() {
        let line = ReservationItem {
            reservation_id: ReservationId::new(),
            item_id: ItemId::new(),
            requested_qty: 60,
            committed_qty: 60,
            consumed_qty: 0,
        };
        let shortage = Shortage::detect(&line, 50, "HB-100", "Hinge").unwrap();
        assert_eq!(shortage.shortfall, 10);
        assert!(Shortage::detect(&line, 60, "HB-100", "Hinge").is_none());
    }
}
