//! Committing stock to a job.

use serde::{Deserialize, Serialize};

use forgedesk_core::{DomainError, DomainResult, ItemId, ReservationId};

use crate::status::ReservationStatus;

/// One requested commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitLine {
    pub item_id: ItemId,
    #[serde(default)]
    pub requested_qty: i64,
    pub commit_qty: i64,
}

impl CommitLine {
    pub fn new(item_id: ItemId, requested_qty: i64, commit_qty: i64) -> Self {
        Self {
            item_id,
            requested_qty,
            commit_qty,
        }
    }
}

/// Drop zero-quantity lines and reject negative ones.
///
/// Fails when nothing is left to commit.
pub fn effective_lines(lines: &[CommitLine]) -> DomainResult<Vec<CommitLine>> {
    if lines.is_empty() {
        return Err(DomainError::validation(
            "at least one inventory line item must be provided",
        ));
    }
    let mut kept = Vec::with_capacity(lines.len());
    for line in lines {
        if line.requested_qty < 0 || line.commit_qty < 0 {
            return Err(DomainError::validation(format!(
                "quantities for item {} cannot be negative",
                line.item_id
            )));
        }
        if line.commit_qty > 0 {
            kept.push(line.clone());
        }
    }
    if kept.is_empty() {
        return Err(DomainError::validation("no valid reservation items were provided"));
    }
    Ok(kept)
}

/// Availability before and after one committed line.
///
/// Values are not clamped: a negative `available_after` is the oversubscription
/// signal operators watch for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSnapshot {
    pub item_id: ItemId,
    pub sku: String,
    pub item_name: String,
    pub requested_qty: i64,
    pub committed_qty: i64,
    pub available_before: i64,
    pub available_after: i64,
}

impl CommitSnapshot {
    pub fn oversubscribed(&self) -> bool {
        self.available_after < 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub reservation_id: ReservationId,
    pub job_number: String,
    pub job_name: String,
    pub status: ReservationStatus,
    pub items: Vec<CommitSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_lines_are_skipped() {
        let a = ItemId::new();
        let lines = effective_lines(&[CommitLine::new(a, 5, 5), CommitLine::new(ItemId::new(), 3, 0)]).unwrap();
        assert_eq!(lines, vec![CommitLine::new(a, 5, 5)]);
    }

    #[test]
    fn nothing_to_commit_is_a_validation_error() {
        let err = effective_lines(&[CommitLine::new(ItemId::new(), 3, 0)]).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("no valid reservation items") => {}
            _ => panic!("Expected Validation when every line is zero"),
        }
        assert!(matches!(effective_lines(&[]), Err(DomainError::Validation(_))));
    }

    #[test]
    fn negative_quantities_are_rejected() {
        let err = effective_lines(&[CommitLine::new(ItemId::new(), 1, -1)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
