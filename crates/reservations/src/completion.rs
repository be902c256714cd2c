//! Completing a reservation: consume what the job used, release the rest.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use forgedesk_core::{DomainError, DomainResult, ItemId, ReservationId, TransactionId};

use crate::reservation::ReservationItem;

/// What completion does to one reservation line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionLine {
    pub item_id: ItemId,
    pub prior_committed: i64,
    pub prior_consumed: i64,
    pub target_consumed: i64,
    /// Newly consumed; posted to the ledger as a negative movement.
    pub consume_delta: i64,
    /// Committed quantity handed back without being consumed.
    pub released: i64,
}

impl CompletionLine {
    /// The item's committed quantity drops by the full prior line commitment.
    pub fn commitment_release(&self) -> i64 {
        self.prior_committed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionPlan {
    pub lines: Vec<CompletionLine>,
}

impl CompletionPlan {
    pub fn consumed_total(&self) -> i64 {
        self.lines.iter().map(|l| l.consume_delta).sum()
    }

    pub fn released_total(&self) -> i64 {
        self.lines.iter().map(|l| l.released).sum()
    }
}

/// Plan a completion.
///
/// For each line the target consumed quantity defaults to `committed + consumed`
/// unless `actuals` names the item. A target below what was already consumed, or
/// above what was ever committed, is an `Integrity` error.
pub fn plan_completion(
    items: &[ReservationItem],
    actuals: &HashMap<ItemId, i64>,
) -> DomainResult<CompletionPlan> {
    let known: HashSet<ItemId> = items.iter().map(|i| i.item_id).collect();
    if let Some(unknown) = actuals.keys().find(|id| !known.contains(id)) {
        return Err(DomainError::validation(format!(
            "item {unknown} is not part of this reservation"
        )));
    }

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let ceiling = item.committed_qty + item.consumed_qty;
        let target = actuals.get(&item.item_id).copied().unwrap_or(ceiling);

        if target < 0 {
            return Err(DomainError::validation(format!(
                "actual quantity for item {} cannot be negative",
                item.item_id
            )));
        }
        if target < item.consumed_qty {
            return Err(DomainError::integrity(format!(
                "item {}: cannot reduce consumed quantity from {} to {}",
                item.item_id, item.consumed_qty, target
            )));
        }
        if target > ceiling {
            return Err(DomainError::integrity(format!(
                "item {}: cannot consume {} when only {} was committed",
                item.item_id, target, ceiling
            )));
        }

        let consume_delta = target - item.consumed_qty;
        lines.push(CompletionLine {
            item_id: item.item_id,
            prior_committed: item.committed_qty,
            prior_consumed: item.consumed_qty,
            target_consumed: target,
            consume_delta,
            released: item.committed_qty - consume_delta,
        });
    }

    Ok(CompletionPlan { lines })
}

/// Returned to the caller of a completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub reservation_id: ReservationId,
    pub job_number: String,
    pub consumed: i64,
    pub released: i64,
    pub transaction_id: Option<TransactionId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(committed: i64, consumed: i64) -> ReservationItem {
        ReservationItem {
            reservation_id: ReservationId::new(),
            item_id: ItemId::new(),
            requested_qty: committed,
            committed_qty: committed,
            consumed_qty: consumed,
        }
    }

    #[test]
    fn default_consumes_everything_committed() {
        let items = vec![line(10, 2)];
        let plan = plan_completion(&items, &HashMap::new()).unwrap();
        assert_eq!(plan.lines[0].target_consumed, 12);
        assert_eq!(plan.lines[0].consume_delta, 10);
        assert_eq!(plan.lines[0].released, 0);
        assert_eq!(plan.consumed_total(), 10);
    }

    #[test]
    fn partial_actuals_release_the_remainder() {
        let items = vec![line(10, 0)];
        let actuals = HashMap::from([(items[0].item_id, 7)]);
        let plan = plan_completion(&items, &actuals).unwrap();
        assert_eq!(plan.lines[0].consume_delta, 7);
        assert_eq!(plan.lines[0].released, 3);
        assert_eq!(plan.lines[0].commitment_release(), 10);
        assert_eq!(plan.released_total(), 3);
    }

    #[test]
    fn below_consumed_is_an_integrity_error() {
        let items = vec![line(5, 4)];
        let actuals = HashMap::from([(items[0].item_id, 3)]);
        let err = plan_completion(&items, &actuals).unwrap_err();
        match err {
            DomainError::Integrity(msg) if msg.contains("cannot reduce") => {}
            _ => panic!("Expected Integrity when un-consuming"),
        }
    }

    #[test]
    fn above_ever_committed_is_an_integrity_error() {
        let items = vec![line(5, 4)];
        let actuals = HashMap::from([(items[0].item_id, 10)]);
        assert!(matches!(
            plan_completion(&items, &actuals),
            Err(DomainError::Integrity(_))
        ));
    }

    #[test]
    fn actuals_for_foreign_items_are_rejected() {
        let items = vec![line(5, 0)];
        let actuals = HashMap::from([(ItemId::new(), 1)]);
        assert!(matches!(
            plan_completion(&items, &actuals),
            Err(DomainError::Validation(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a successful plan never lowers consumed and never exceeds the commitment.
        #[test]
        fn consumed_is_monotonic(committed in 0i64..100, consumed in 0i64..100, actual in 0i64..250) {
            let items = vec![line(committed, consumed)];
            let actuals = HashMap::from([(items[0].item_id, actual)]);
            match plan_completion(&items, &actuals) {
                Ok(plan) => {
                    let l = &plan.lines[0];
                    prop_assert!(l.target_consumed >= consumed);
                    prop_assert!(l.target_consumed <= committed + consumed);
                    prop_assert!(l.released >= 0);
                    prop_assert_eq!(l.consume_delta + l.released, committed);
                }
                Err(DomainError::Integrity(_)) => {
                    prop_assert!(actual < consumed || actual > committed + consumed);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
