//! Ledger posting rules.
//!
//! A posting is planned against a snapshot of current stock before anything is
//! written: either every line fits (no item goes below zero) or the whole posting
//! is refused.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgedesk_core::{DomainError, DomainResult, ItemId, TransactionId};

/// One requested stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub item_id: ItemId,
    pub quantity_change: i64,
    #[serde(default)]
    pub note: Option<String>,
}

impl LedgerLine {
    pub fn new(item_id: ItemId, quantity_change: i64) -> Self {
        Self {
            item_id,
            quantity_change,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Request to post a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTransaction {
    pub reference: String,
    pub notes: Option<String>,
    pub lines: Vec<LedgerLine>,
    pub occurred_at: DateTime<Utc>,
}

impl PostTransaction {
    pub fn new(reference: impl Into<String>, lines: Vec<LedgerLine>) -> Self {
        Self {
            reference: reference.into(),
            notes: None,
            lines,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.reference.trim().is_empty() {
            return Err(DomainError::validation("transaction reference cannot be empty"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("transaction requires at least one line"));
        }
        if let Some(line) = self.lines.iter().find(|l| l.quantity_change == 0) {
            return Err(DomainError::validation(format!(
                "quantity change for item {} cannot be zero",
                line.item_id
            )));
        }
        Ok(())
    }

    /// Distinct items touched, ascending (the canonical lock order).
    pub fn item_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.lines.iter().map(|l| l.item_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// An immutable audit line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub item_id: ItemId,
    pub quantity_change: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub note: Option<String>,
}

/// An immutable audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: TransactionId,
    pub reference: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<TransactionLine>,
}

/// Compute audit lines for `request` against current stock levels.
///
/// Lines are evaluated in caller order with a running balance, so two lines for
/// the same item see each other. Fails with `NotFound` for an unknown item and
/// `Integrity` when any balance would drop below zero.
pub fn plan_lines(
    request: &PostTransaction,
    current_stock: &HashMap<ItemId, i64>,
) -> DomainResult<Vec<TransactionLine>> {
    request.validate()?;

    let mut running: HashMap<ItemId, i64> = HashMap::new();
    let mut planned = Vec::with_capacity(request.lines.len());

    for line in &request.lines {
        let before = match running.get(&line.item_id) {
            Some(stock) => *stock,
            None => *current_stock
                .get(&line.item_id)
                .ok_or_else(|| DomainError::not_found(format!("inventory item {}", line.item_id)))?,
        };

        let after = before
            .checked_add(line.quantity_change)
            .ok_or_else(|| DomainError::integrity(format!("stock overflow for item {}", line.item_id)))?;
        if after < 0 {
            return Err(DomainError::integrity(format!(
                "insufficient stock for item {}: have {}, change {}",
                line.item_id, before, line.quantity_change
            )));
        }

        running.insert(line.item_id, after);
        planned.push(TransactionLine {
            item_id: line.item_id,
            quantity_change: line.quantity_change,
            stock_before: before,
            stock_after: after,
            note: line.note.clone(),
        });
    }

    Ok(planned)
}

/// Final stock per item after applying planned lines.
pub fn final_stock(lines: &[TransactionLine]) -> BTreeMap<ItemId, i64> {
    lines.iter().map(|l| (l.item_id, l.stock_after)).collect()
}

/// Consumed quantity per item (magnitudes of negative lines).
pub fn consumption_by_item(lines: &[TransactionLine]) -> BTreeMap<ItemId, i64> {
    let mut used = BTreeMap::new();
    for line in lines.iter().filter(|l| l.quantity_change < 0) {
        *used.entry(line.item_id).or_insert(0) += -line.quantity_change;
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stock_of(entries: &[(ItemId, i64)]) -> HashMap<ItemId, i64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn duplicate_lines_use_a_running_balance() {
        let item = ItemId::new();
        let req = PostTransaction::new(
            "Cycle count",
            vec![LedgerLine::new(item, -3), LedgerLine::new(item, -4)],
        );
        let lines = plan_lines(&req, &stock_of(&[(item, 10)])).unwrap();
        assert_eq!(lines[0].stock_before, 10);
        assert_eq!(lines[0].stock_after, 7);
        assert_eq!(lines[1].stock_before, 7);
        assert_eq!(lines[1].stock_after, 3);
        assert_eq!(final_stock(&lines)[&item], 3);
        assert_eq!(consumption_by_item(&lines)[&item], 7);
    }

    #[test]
    fn negative_balance_is_an_integrity_error() {
        let ok = ItemId::new();
        let short = ItemId::new();
        let req = PostTransaction::new(
            "Job pull",
            vec![LedgerLine::new(ok, -1), LedgerLine::new(short, -6)],
        );
        let err = plan_lines(&req, &stock_of(&[(ok, 5), (short, 5)])).unwrap_err();
        match err {
            DomainError::Integrity(msg) if msg.contains(&short.to_string()) => {}
            _ => panic!("Expected Integrity naming the short item"),
        }
    }

    #[test]
    fn unknown_item_is_not_found() {
        let req = PostTransaction::new("Adjust", vec![LedgerLine::new(ItemId::new(), 1)]);
        assert!(matches!(
            plan_lines(&req, &HashMap::new()),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn empty_and_zero_lines_are_rejected() {
        let req = PostTransaction::new("Adjust", vec![]);
        assert!(matches!(req.validate(), Err(DomainError::Validation(_))));

        let req = PostTransaction::new("Adjust", vec![LedgerLine::new(ItemId::new(), 0)]);
        assert!(matches!(req.validate(), Err(DomainError::Validation(_))));

        let req = PostTransaction::new("  ", vec![LedgerLine::new(ItemId::new(), 1)]);
        assert!(matches!(req.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn item_ids_are_sorted_and_distinct() {
        let a = ItemId::new();
        let b = ItemId::new();
        let req = PostTransaction::new(
            "Adjust",
            vec![LedgerLine::new(b, 1), LedgerLine::new(a, 1), LedgerLine::new(b, 2)],
        );
        assert_eq!(req.item_ids(), vec![a, b]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a successful plan never leaves stock below zero, and a refused
        /// plan is exactly one where some running balance would have gone negative.
        #[test]
        fn planning_never_goes_negative(
            start in 0i64..50,
            changes in proptest::collection::vec((-30i64..30).prop_filter("non-zero", |c| *c != 0), 1..8)
        ) {
            let item = ItemId::new();
            let req = PostTransaction::new(
                "Random",
                changes.iter().map(|c| LedgerLine::new(item, *c)).collect(),
            );

            let mut balance = start;
            let mut would_fail = false;
            for c in &changes {
                balance += c;
                if balance < 0 {
                    would_fail = true;
                    break;
                }
            }

            match plan_lines(&req, &stock_of(&[(item, start)])) {
                Ok(lines) => {
                    prop_assert!(!would_fail);
                    prop_assert!(lines.iter().all(|l| l.stock_after >= 0));
                    prop_assert_eq!(final_stock(&lines)[&item], start + changes.iter().sum::<i64>());
                }
                Err(DomainError::Integrity(_)) => prop_assert!(would_fail),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
