use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use forgedesk_core::{DomainError, DomainResult, ItemId, PurchaseOrderLineId, SupplierId};
use forgedesk_infra::engine::{CommitRequest, NewItem, UpdateOrder};
use forgedesk_inventory::{
    EstimateRequirement, Finish, ImportRow, ItemDetails, LedgerLine, PostTransaction, PurchaseUom,
};
use forgedesk_purchasing::{
    CreateOrder, OrderHeaderUpdate, OrderLineInput, PurchaseOrderStatus, ReceiptRequest,
};
use forgedesk_reservations::{CommitLine, JobMetadata, ReservationStatus};

/// `YYYY-MM-DD`; blank or absent means no date.
pub fn parse_date(field: &str, raw: Option<&str>) -> DomainResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                DomainError::validation(format!("{field} '{value}' is not in YYYY-MM-DD format"))
            }),
    }
}

fn parse_opt<T>(raw: Option<&str>) -> DomainResult<Option<T>>
where
    T: FromStr<Err = DomainError>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

// -------------------------
// Items
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub name: String,
    pub part_number: String,
    /// Unknown finish codes are dropped.
    #[serde(default)]
    pub finish: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub discontinued: bool,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub supplier_name: String,
    #[serde(default)]
    pub supplier_contact: Option<String>,
    #[serde(default)]
    pub reorder_point: i64,
    #[serde(default)]
    pub lead_time_days: i32,
    #[serde(default)]
    pub safety_stock: Decimal,
    #[serde(default)]
    pub min_order_qty: Decimal,
    #[serde(default)]
    pub order_multiple: Decimal,
    #[serde(default)]
    pub pack_size: Decimal,
    #[serde(default)]
    pub purchase_uom: Option<String>,
}

impl ItemRequest {
    pub fn into_details(self) -> DomainResult<ItemDetails> {
        let purchase_uom: PurchaseUom = parse_opt(self.purchase_uom.as_deref())?.unwrap_or_default();
        let mut details = ItemDetails::new(self.name, self.part_number);
        details.finish = Finish::normalize(self.finish.as_deref());
        details.location = self.location;
        details.discontinued = self.discontinued;
        details.supplier_id = self.supplier_id;
        details.supplier_name = self.supplier_name;
        details.supplier_contact = self.supplier_contact;
        details.reorder_point = self.reorder_point;
        details.lead_time_days = self.lead_time_days;
        details.safety_stock = self.safety_stock;
        details.min_order_qty = self.min_order_qty;
        details.order_multiple = self.order_multiple;
        details.pack_size = self.pack_size;
        details.purchase_uom = purchase_uom;
        Ok(details)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    #[serde(flatten)]
    pub item: ItemRequest,
    #[serde(default)]
    pub stock: i64,
}

impl CreateItemRequest {
    pub fn into_domain(self) -> DomainResult<NewItem> {
        Ok(NewItem {
            details: self.item.into_details()?,
            stock: self.stock,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub rows: Vec<ImportRow>,
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub requirements: Vec<EstimateRequirement>,
}

// -------------------------
// Ledger
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LedgerLineRequest {
    pub item_id: ItemId,
    pub quantity_change: i64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostTransactionRequest {
    pub reference: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<LedgerLineRequest>,
}

impl PostTransactionRequest {
    pub fn into_domain(self) -> PostTransaction {
        let lines = self
            .lines
            .into_iter()
            .map(|line| {
                let ledger_line = LedgerLine::new(line.item_id, line.quantity_change);
                match line.note {
                    Some(note) => ledger_line.with_note(note),
                    None => ledger_line,
                }
            })
            .collect();
        PostTransaction::new(self.reference, lines).with_notes(self.notes)
    }
}

// -------------------------
// Reservations
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CommitReservationRequest {
    #[serde(flatten)]
    pub job: JobMetadata,
    pub lines: Vec<CommitLine>,
}

impl CommitReservationRequest {
    pub fn into_domain(self) -> CommitRequest {
        CommitRequest {
            job: self.job,
            lines: self.lines,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    pub fn parse(&self) -> DomainResult<ReservationStatus> {
        self.status.parse()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    /// Item id -> quantity actually used.
    #[serde(default)]
    pub actuals: HashMap<String, i64>,
}

impl CompleteRequest {
    pub fn parse(self) -> DomainResult<HashMap<ItemId, i64>> {
        self.actuals
            .into_iter()
            .map(|(id, qty)| Ok((id.parse::<ItemId>()?, qty)))
            .collect()
    }
}

// -------------------------
// Purchasing
// -------------------------

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
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
    pub expected_date: Option<String>,
}

impl OrderLineRequest {
    fn into_domain(self) -> DomainResult<OrderLineInput> {
        Ok(OrderLineInput {
            id: self.id,
            item_id: self.item_id,
            supplier_sku: self.supplier_sku,
            description: self.description,
            quantity_ordered: self.quantity_ordered,
            unit_cost: self.unit_cost,
            expected_date: parse_date("expected_date", self.expected_date.as_deref())?,
        })
    }
}

fn order_lines(lines: Vec<OrderLineRequest>) -> DomainResult<Vec<OrderLineInput>> {
    lines.into_iter().map(OrderLineRequest::into_domain).collect()
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub expected_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<OrderLineRequest>,
}

impl CreateOrderRequest {
    pub fn into_domain(self) -> DomainResult<CreateOrder> {
        Ok(CreateOrder {
            order_number: self.order_number,
            supplier_id: self.supplier_id,
            status: parse_opt::<PurchaseOrderStatus>(self.status.as_deref())?,
            order_date: parse_date("order_date", self.order_date.as_deref())?,
            expected_date: parse_date("expected_date", self.expected_date.as_deref())?,
            notes: self.notes,
            lines: order_lines(self.lines)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub expected_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Full replacement line set; absent leaves lines untouched.
    #[serde(default)]
    pub lines: Option<Vec<OrderLineRequest>>,
}

impl UpdateOrderRequest {
    pub fn into_domain(self) -> DomainResult<UpdateOrder> {
        let header = OrderHeaderUpdate {
            order_number: self.order_number,
            supplier_id: self.supplier_id,
            status: parse_opt::<PurchaseOrderStatus>(self.status.as_deref())?,
            order_date: parse_date("order_date", self.order_date.as_deref())?,
            expected_date: parse_date("expected_date", self.expected_date.as_deref())?,
            notes: self.notes,
        };
        Ok(UpdateOrder {
            header: Some(header),
            lines: self.lines.map(order_lines).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceiptLineRequest {
    pub line_id: PurchaseOrderLineId,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveRequest {
    pub lines: Vec<ReceiptLineRequest>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReceiveRequest {
    /// Repeated line ids are summed.
    pub fn into_domain(self) -> ReceiptRequest {
        let mut lines: BTreeMap<PurchaseOrderLineId, Decimal> = BTreeMap::new();
        for line in self.lines {
            *lines.entry(line.line_id).or_insert(Decimal::ZERO) += line.quantity;
        }
        ReceiptRequest {
            lines,
            reference: self.reference,
            notes: self.notes,
        }
    }
}

// -------------------------
// Replenishment
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub as_of: Option<String>,
}

impl RefreshRequest {
    pub fn as_of(&self, today: NaiveDate) -> DomainResult<NaiveDate> {
        Ok(parse_date("as_of", self.as_of.as_deref())?.unwrap_or(today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_dates_are_validation_errors() {
        assert_eq!(parse_date("d", Some(" ")).unwrap(), None);
        assert_eq!(
            parse_date("d", Some("2025-03-01")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert!(matches!(
            parse_date("d", Some("03/01/2025")),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn unknown_order_status_is_rejected() {
        let request: CreateOrderRequest = serde_json::from_value(json!({
            "status": "shipped",
            "lines": [{ "quantity_ordered": "1" }]
        }))
        .unwrap();
        assert!(matches!(request.into_domain(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn repeated_receipt_lines_are_summed() {
        let line_id = PurchaseOrderLineId::new();
        let request: ReceiveRequest = serde_json::from_value(json!({
            "lines": [
                { "line_id": line_id, "quantity": "2" },
                { "line_id": line_id, "quantity": "3" }
            ]
        }))
        .unwrap();
        let receipt = request.into_domain();
        assert_eq!(receipt.lines[&line_id], Decimal::from(5));
    }

    #[test]
    fn item_request_drops_unknown_finish_and_parses_uom() {
        let request: CreateItemRequest = serde_json::from_value(json!({
            "name": "Hinge",
            "part_number": "HB-100",
            "finish": "zz",
            "purchase_uom": "pack",
            "stock": 4
        }))
        .unwrap();
        let item = request.into_domain().unwrap();
        assert_eq!(item.details.finish, None);
        assert_eq!(item.details.purchase_uom, PurchaseUom::Pack);
        assert_eq!(item.stock, 4);
    }
}
