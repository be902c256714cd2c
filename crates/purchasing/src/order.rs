use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use core::fmt;
use core::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgedesk_core::{DomainError, DomainResult, ItemId, PurchaseOrderId, PurchaseOrderLineId, SupplierId};

use crate::supplier::Supplier;

/// Outstanding totals at or below this are treated as fully received.
pub fn outstanding_epsilon() -> Decimal {
    Decimal::new(1, 6)
}

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    PartiallyReceived,
    Closed,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub const ALL: [PurchaseOrderStatus; 5] = [
        PurchaseOrderStatus::Draft,
        PurchaseOrderStatus::Sent,
        PurchaseOrderStatus::PartiallyReceived,
        PurchaseOrderStatus::Closed,
        PurchaseOrderStatus::Cancelled,
    ];

    /// Statuses whose outstanding quantity counts as on order.
    pub const OPEN: [PurchaseOrderStatus; 3] = [
        PurchaseOrderStatus::Draft,
        PurchaseOrderStatus::Sent,
        PurchaseOrderStatus::PartiallyReceived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Sent => "sent",
            PurchaseOrderStatus::PartiallyReceived => "partially_received",
            PurchaseOrderStatus::Closed => "closed",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("invalid purchase order status '{s}'")))
    }
}

/// Stored purchase order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub order_number: Option<String>,
    pub supplier_id: Option<SupplierId>,
    pub status: PurchaseOrderStatus,
    pub order_date: Option<NaiveDate>,
    pub expected_date: Option<NaiveDate>,
    pub total_cost: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// Human label used in receipt references: the order number, else the id.
    pub fn label(&self) -> String {
        match &self.order_number {
            Some(number) => number.clone(),
            None => self.id.to_string(),
        }
    }
}

/// Stored purchase order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: PurchaseOrderLineId,
    pub order_id: PurchaseOrderId,
    pub item_id: Option<ItemId>,
    pub supplier_sku: Option<String>,
    pub description: Option<String>,
    pub quantity_ordered: Decimal,
    pub quantity_received: Decimal,
    pub unit_cost: Decimal,
    pub expected_date: Option<NaiveDate>,
}

impl PurchaseOrderLine {
    /// `max(ordered - received, 0)`.
    pub fn outstanding(&self) -> Decimal {
        (self.quantity_ordered - self.quantity_received).max(Decimal::ZERO)
    }

    pub fn extended_cost(&self) -> Decimal {
        self.quantity_ordered * self.unit_cost
    }
}

/// Line as supplied by a caller creating or editing an order.
///
/// `id` is set when editing an existing line; an id the order does not know is
/// treated as a new line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineInput {
    #[serde(default)]
    pub id: Option<PurchaseOrderLineId>,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub supplier_sku: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity_ordered: Decimal,
    #[serde(default)]
    pub unit_cost: Decimal,
    #[serde(default)]
    pub expected_date: Option<NaiveDate>,
}

impl OrderLineInput {
    pub fn for_item(item_id: ItemId, quantity_ordered: Decimal, unit_cost: Decimal) -> Self {
        Self {
            id: None,
            item_id: Some(item_id),
            supplier_sku: None,
            description: None,
            quantity_ordered,
            unit_cost,
            expected_date: None,
        }
    }

    fn validate(&self, position: usize) -> DomainResult<()> {
        if self.quantity_ordered <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "line {}: quantity ordered must be positive",
                position + 1
            )));
        }
        if self.unit_cost < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "line {}: unit cost cannot be negative",
                position + 1
            )));
        }
        if self.item_id.is_none() && blank(&self.description) && blank(&self.supplier_sku) {
            return Err(DomainError::validation(format!(
                "line {}: an inventory item, supplier SKU or description is required",
                position + 1
            )));
        }
        Ok(())
    }

    fn into_line(self, id: PurchaseOrderLineId, order_id: PurchaseOrderId, received: Decimal) -> PurchaseOrderLine {
        PurchaseOrderLine {
            id,
            order_id,
            item_id: self.item_id,
            supplier_sku: trimmed(self.supplier_sku),
            description: trimmed(self.description),
            quantity_ordered: self.quantity_ordered,
            quantity_received: received,
            unit_cost: self.unit_cost,
            expected_date: self.expected_date,
        }
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Request to create an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub status: Option<PurchaseOrderStatus>,
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub expected_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<OrderLineInput>,
}

impl CreateOrder {
    pub fn new(supplier_id: Option<SupplierId>, lines: Vec<OrderLineInput>) -> Self {
        Self {
            order_number: None,
            supplier_id,
            status: None,
            order_date: None,
            expected_date: None,
            notes: None,
            lines,
        }
    }

    /// Validate and build the header plus lines to insert.
    pub fn build(self, now: DateTime<Utc>) -> DomainResult<(PurchaseOrder, Vec<PurchaseOrderLine>)> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("purchase order requires at least one line"));
        }
        for (position, line) in self.lines.iter().enumerate() {
            line.validate(position)?;
        }

        let id = PurchaseOrderId::new();
        let lines: Vec<PurchaseOrderLine> = self
            .lines
            .into_iter()
            .map(|line| line.into_line(PurchaseOrderLineId::new(), id, Decimal::ZERO))
            .collect();

        let header = PurchaseOrder {
            id,
            order_number: trimmed(self.order_number),
            supplier_id: self.supplier_id,
            status: self.status.unwrap_or(PurchaseOrderStatus::Draft),
            order_date: Some(self.order_date.unwrap_or_else(|| now.date_naive())),
            expected_date: self.expected_date,
            total_cost: total_cost(&lines),
            notes: trimmed(self.notes),
            created_at: now,
            updated_at: now,
        };
        Ok((header, lines))
    }
}

/// Header edits; only supplied fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeaderUpdate {
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub status: Option<PurchaseOrderStatus>,
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub expected_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl OrderHeaderUpdate {
    pub fn apply(self, order: &mut PurchaseOrder, now: DateTime<Utc>) {
        if let Some(number) = self.order_number {
            order.order_number = trimmed(Some(number));
        }
        if let Some(supplier_id) = self.supplier_id {
            order.supplier_id = Some(supplier_id);
        }
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(date) = self.order_date {
            order.order_date = Some(date);
        }
        if let Some(date) = self.expected_date {
            order.expected_date = Some(date);
        }
        if let Some(notes) = self.notes {
            order.notes = trimmed(Some(notes));
        }
        order.updated_at = now;
    }
}

/// Result of reconciling an edited line set against the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineReconciliation {
    pub updated: Vec<PurchaseOrderLine>,
    pub inserted: Vec<PurchaseOrderLine>,
    pub deleted: Vec<PurchaseOrderLineId>,
    /// Items referenced before or after the edit; their on-order caches are stale.
    pub affected_items: BTreeSet<ItemId>,
}

impl LineReconciliation {
    /// Lines as they stand after the edit.
    pub fn resulting_lines(&self) -> Vec<PurchaseOrderLine> {
        self.updated.iter().chain(self.inserted.iter()).cloned().collect()
    }
}

/// Set-diff `incoming` against `existing`.
///
/// Known ids update in place (received quantities are preserved), unknown or
/// missing ids insert, and stored lines absent from `incoming` are deleted.
/// Lowering `quantity_ordered` below what was already received is refused.
pub fn reconcile_lines(
    order_id: PurchaseOrderId,
    existing: &[PurchaseOrderLine],
    incoming: Vec<OrderLineInput>,
) -> DomainResult<LineReconciliation> {
    for (position, line) in incoming.iter().enumerate() {
        line.validate(position)?;
    }

    let by_id: HashMap<PurchaseOrderLineId, &PurchaseOrderLine> =
        existing.iter().map(|line| (line.id, line)).collect();
    let mut result = LineReconciliation::default();
    let mut kept: BTreeSet<PurchaseOrderLineId> = BTreeSet::new();

    result
        .affected_items
        .extend(existing.iter().filter_map(|line| line.item_id));

    for input in incoming {
        let current = input.id.and_then(|id| by_id.get(&id).copied());
        match current {
            Some(current) if kept.insert(current.id) => {
                if input.quantity_ordered < current.quantity_received {
                    return Err(DomainError::integrity(format!(
                        "line {}: quantity ordered {} is below quantity already received {}",
                        current.id, input.quantity_ordered, current.quantity_received
                    )));
                }
                let line = input.into_line(current.id, order_id, current.quantity_received);
                result.affected_items.extend(line.item_id);
                result.updated.push(line);
            }
            _ => {
                let line = input.into_line(PurchaseOrderLineId::new(), order_id, Decimal::ZERO);
                result.affected_items.extend(line.item_id);
                result.inserted.push(line);
            }
        }
    }

    result.deleted = existing
        .iter()
        .filter(|line| !kept.contains(&line.id))
        .map(|line| line.id)
        .collect();

    Ok(result)
}

/// `Σ quantity_ordered × unit_cost`.
pub fn total_cost(lines: &[PurchaseOrderLine]) -> Decimal {
    lines.iter().map(PurchaseOrderLine::extended_cost).sum()
}

/// Recalculate order status from aggregate line sums.
///
/// `draft` when nothing is ordered, `closed` when nothing is outstanding,
/// `partially_received` when something arrived, else `sent`.
pub fn derive_status(lines: &[PurchaseOrderLine]) -> PurchaseOrderStatus {
    let ordered: Decimal = lines.iter().map(|l| l.quantity_ordered).sum();
    let received: Decimal = lines.iter().map(|l| l.quantity_received).sum();
    let outstanding: Decimal = lines.iter().map(PurchaseOrderLine::outstanding).sum();

    if ordered <= Decimal::ZERO {
        PurchaseOrderStatus::Draft
    } else if outstanding <= outstanding_epsilon() {
        PurchaseOrderStatus::Closed
    } else if received > Decimal::ZERO {
        PurchaseOrderStatus::PartiallyReceived
    } else {
        PurchaseOrderStatus::Sent
    }
}

/// On-order quantity per item over lines of open orders.
pub fn outstanding_by_item<'a>(
    lines: impl IntoIterator<Item = (&'a PurchaseOrderLine, PurchaseOrderStatus)>,
) -> HashMap<ItemId, Decimal> {
    let mut totals: HashMap<ItemId, Decimal> = HashMap::new();
    for (line, status) in lines {
        let Some(item_id) = line.item_id else { continue };
        if status.is_open() {
            *totals.entry(item_id).or_insert(Decimal::ZERO) += line.outstanding();
        }
    }
    totals
}

/// Line read model with resolved item details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLineView {
    #[serde(flatten)]
    pub line: PurchaseOrderLine,
    pub sku: Option<String>,
    pub item_name: Option<String>,
    pub outstanding: Decimal,
}

/// Order read model: header, resolved supplier and lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub supplier: Option<Supplier>,
    pub lines: Vec<PurchaseOrderLineView>,
    pub outstanding_total: Decimal,
}

/// Row in the open-orders list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrderSummary {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub supplier_name: Option<String>,
    pub line_count: usize,
    pub outstanding_total: Decimal,
}
