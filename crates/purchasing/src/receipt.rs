//! Receiving against purchase order lines.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use forgedesk_core::{
    DomainError, DomainResult, ItemId, PurchaseOrderId, PurchaseOrderLineId, ReceiptId, TransactionId,
};
use forgedesk_inventory::LedgerLine;

use crate::order::{PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus};

/// Quantities to receive, keyed by line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRequest {
    pub lines: BTreeMap<PurchaseOrderLineId, Decimal>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReceiptRequest {
    pub fn new(lines: impl IntoIterator<Item = (PurchaseOrderLineId, Decimal)>) -> Self {
        Self {
            lines: lines.into_iter().collect(),
            reference: None,
            notes: None,
        }
    }
}

/// A receipt quantity the order accepted after clamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedReceiptLine {
    pub line_id: PurchaseOrderLineId,
    pub item_id: Option<ItemId>,
    pub received_delta: Decimal,
    pub received_total: Decimal,
}

/// What a receipt will change, computed before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptPlan {
    pub reference: String,
    pub notes: Option<String>,
    pub accepted: Vec<AcceptedReceiptLine>,
    /// Positive stock movements; lines without an item or rounding to zero are absent.
    pub ledger_lines: Vec<LedgerLine>,
}

impl ReceiptPlan {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Apply accepted quantities to the order's lines in place.
    pub fn apply_to(&self, lines: &mut [PurchaseOrderLine]) {
        let totals: HashMap<PurchaseOrderLineId, Decimal> = self
            .accepted
            .iter()
            .map(|a| (a.line_id, a.received_total))
            .collect();
        for line in lines {
            if let Some(total) = totals.get(&line.id) {
                line.quantity_received = *total;
            }
        }
    }
}

/// Default receipt reference for an order.
pub fn default_reference(order: &PurchaseOrder) -> String {
    format!("PO {} receipt", order.label())
}

/// Clamp each requested quantity to what is still outstanding on its line.
///
/// Unknown line ids are `NotFound`; negative quantities are `Validation`.
/// Requests that clamp to zero are skipped, so re-receiving a closed line is a no-op.
///
/// Stock is whole units. Each accepted line posts its own receipt quantity
/// rounded half away from zero, independent of earlier receipts: three
/// receipts of 0.4 raise `quantity_received` by 1.2 and post no stock.
/// Rounding is never carried across receipts.
pub fn plan_receipt(
    order: &PurchaseOrder,
    lines: &[PurchaseOrderLine],
    request: &ReceiptRequest,
) -> DomainResult<ReceiptPlan> {
    let by_id: HashMap<PurchaseOrderLineId, &PurchaseOrderLine> =
        lines.iter().map(|line| (line.id, line)).collect();

    let mut accepted = Vec::new();
    let mut ledger_lines = Vec::new();

    for (line_id, requested) in &request.lines {
        let line = by_id.get(line_id).ok_or_else(|| {
            DomainError::not_found(format!("purchase order line {line_id} on order {}", order.id))
        })?;
        if *requested < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "receipt quantity for line {line_id} cannot be negative"
            )));
        }

        let receipt_qty = (*requested).min(line.outstanding());
        if receipt_qty <= Decimal::ZERO {
            continue;
        }

        if let Some(item_id) = line.item_id {
            let stock_change = receipt_qty
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .unwrap_or(0);
            if stock_change != 0 {
                ledger_lines.push(
                    LedgerLine::new(item_id, stock_change)
                        .with_note(format!("PO {} line {} receipt", order.label(), line_id)),
                );
            }
        }

        accepted.push(AcceptedReceiptLine {
            line_id: *line_id,
            item_id: line.item_id,
            received_delta: receipt_qty,
            received_total: line.quantity_received + receipt_qty,
        });
    }

    let reference = request
        .reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_reference(order));

    Ok(ReceiptPlan {
        reference,
        notes: request.notes.clone(),
        accepted,
        ledger_lines,
    })
}

/// One row of receipt history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderReceipt {
    pub id: ReceiptId,
    pub order_id: PurchaseOrderId,
    pub transaction_id: Option<TransactionId>,
    pub reference: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<ReceiptLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub line_id: PurchaseOrderLineId,
    pub quantity_received: Decimal,
}

impl PurchaseOrderReceipt {
    pub fn from_plan(
        order_id: PurchaseOrderId,
        plan: &ReceiptPlan,
        transaction_id: Option<TransactionId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReceiptId::new(),
            order_id,
            transaction_id,
            reference: plan.reference.clone(),
            notes: plan.notes.clone(),
            created_at,
            lines: plan
                .accepted
                .iter()
                .map(|a| ReceiptLine {
                    line_id: a.line_id,
                    quantity_received: a.received_delta,
                })
                .collect(),
        }
    }
}

/// Returned to the caller of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptOutcome {
    pub receipt_id: Option<ReceiptId>,
    pub transaction_id: Option<TransactionId>,
    pub status: PurchaseOrderStatus,
    pub lines: Vec<AcceptedReceiptLine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{CreateOrder, OrderLineInput, derive_status};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn test_order(ordered: Decimal) -> (PurchaseOrder, Vec<PurchaseOrderLine>) {
        CreateOrder::new(None, vec![OrderLineInput::for_item(ItemId::new(), ordered, dec!(2))])
            .build(Utc::now())
            .unwrap()
    }

    #[test]
    fn second_receipt_clamps_to_remaining() {
        let (order, mut lines) = test_order(dec!(100));
        let line_id = lines[0].id;

        let first = plan_receipt(&order, &lines, &ReceiptRequest::new([(line_id, dec!(40))])).unwrap();
        first.apply_to(&mut lines);
        assert_eq!(lines[0].quantity_received, dec!(40));
        assert_eq!(derive_status(&lines), PurchaseOrderStatus::PartiallyReceived);

        let second = plan_receipt(&order, &lines, &ReceiptRequest::new([(line_id, dec!(70))])).unwrap();
        assert_eq!(second.accepted[0].received_delta, dec!(60));
        assert_eq!(second.ledger_lines[0].quantity_change, 60);
        second.apply_to(&mut lines);
        assert_eq!(lines[0].quantity_received, dec!(100));
        assert_eq!(lines[0].outstanding(), Decimal::ZERO);
        assert_eq!(derive_status(&lines), PurchaseOrderStatus::Closed);
    }

    #[test]
    fn receiving_a_closed_line_is_a_no_op() {
        let (order, mut lines) = test_order(dec!(5));
        lines[0].quantity_received = dec!(5);
        let plan = plan_receipt(&order, &lines, &ReceiptRequest::new([(lines[0].id, dec!(5))])).unwrap();
        assert!(plan.is_empty());
        assert!(plan.ledger_lines.is_empty());
    }

    #[test]
    fn default_reference_uses_order_number_when_present() {
        let (mut order, lines) = test_order(dec!(5));
        let plan = plan_receipt(&order, &lines, &ReceiptRequest::new([(lines[0].id, dec!(1))])).unwrap();
        assert_eq!(plan.reference, format!("PO {} receipt", order.id));

        order.order_number = Some("PO-1042".into());
        let plan = plan_receipt(&order, &lines, &ReceiptRequest::new([(lines[0].id, dec!(1))])).unwrap();
        assert_eq!(plan.reference, "PO PO-1042 receipt");
    }

    #[test]
    fn fractional_receipts_round_for_stock() {
        let (order, lines) = test_order(dec!(10));
        let plan = plan_receipt(&order, &lines, &ReceiptRequest::new([(lines[0].id, dec!(2.5))])).unwrap();
        assert_eq!(plan.accepted[0].received_delta, dec!(2.5));
        assert_eq!(plan.ledger_lines[0].quantity_change, 3);

        let plan = plan_receipt(&order, &lines, &ReceiptRequest::new([(lines[0].id, dec!(0.4))])).unwrap();
        assert_eq!(plan.accepted.len(), 1);
        assert!(plan.ledger_lines.is_empty());
    }

    #[test]
    fn small_receipts_round_per_receipt_not_cumulatively() {
        let (order, mut lines) = test_order(dec!(10));
        let mut stock_posted = 0;
        for _ in 0..3 {
            let plan = plan_receipt(&order, &lines, &ReceiptRequest::new([(lines[0].id, dec!(0.4))])).unwrap();
            stock_posted += plan.ledger_lines.iter().map(|l| l.quantity_change).sum::<i64>();
            plan.apply_to(&mut lines);
        }
        assert_eq!(lines[0].quantity_received, dec!(1.2));
        assert_eq!(stock_posted, 0);
    }

    #[test]
    fn unknown_line_and_negative_quantity_are_rejected() {
        let (order, lines) = test_order(dec!(10));
        let err = plan_receipt(
            &order,
            &lines,
            &ReceiptRequest::new([(PurchaseOrderLineId::new(), dec!(1))]),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        let err = plan_receipt(&order, &lines, &ReceiptRequest::new([(lines[0].id, dec!(-1))])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any sequence of receipts keeps 0 <= received <= ordered.
        #[test]
        fn received_stays_within_ordered(
            ordered in 1u32..500,
            receipts in proptest::collection::vec(0u32..300, 1..10)
        ) {
            let (order, mut lines) = test_order(Decimal::from(ordered));
            let line_id = lines[0].id;
            for qty in receipts {
                let plan = plan_receipt(&order, &lines, &ReceiptRequest::new([(line_id, Decimal::from(qty))])).unwrap();
                plan.apply_to(&mut lines);
                prop_assert!(lines[0].quantity_received >= Decimal::ZERO);
                prop_assert!(lines[0].quantity_received <= lines[0].quantity_ordered);
            }
        }
    }
}
