//! Inventory item model.

use chrono::{DateTime, Utc};
use core::fmt;
use core::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgedesk_core::{DomainError, DomainResult, ItemId, SupplierId};

use crate::replenishment::derive_status;
use crate::sku::{Finish, compose_sku};

/// Unit an item is purchased in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseUom {
    #[default]
    Each,
    Pack,
}

impl PurchaseUom {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseUom::Each => "each",
            PurchaseUom::Pack => "pack",
        }
    }
}

impl FromStr for PurchaseUom {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "each" | "ea" | "" => Ok(PurchaseUom::Each),
            "pack" | "pk" => Ok(PurchaseUom::Pack),
            other => Err(DomainError::validation(format!("unknown purchase uom '{other}'"))),
        }
    }
}

/// Displayed stock status. Always derived on read; only `Discontinued` is persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    #[serde(rename = "In Stock")]
    InStock,
    Low,
    Critical,
    Discontinued,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::InStock => "In Stock",
            ItemStatus::Low => "Low",
            ItemStatus::Critical => "Critical",
            ItemStatus::Discontinued => "Discontinued",
        }
    }

    /// Whether a free-text status from an external source marks the item discontinued.
    pub fn is_discontinued_label(raw: &str) -> bool {
        raw.trim().eq_ignore_ascii_case("discontinued")
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stock-keeping row.
///
/// `stock` is the source of truth and changes only through a ledger posting.
/// `committed_qty`, `on_order_qty` and `average_daily_use` are maintained by the
/// reservation engine, purchase-order engine and usage aggregator respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub part_number: String,
    pub finish: Option<Finish>,
    pub sku: String,
    pub location: String,
    pub stock: i64,
    pub committed_qty: i64,
    pub discontinued: bool,
    pub supplier_id: Option<SupplierId>,
    /// Legacy free-text supplier name, used when no supplier record is linked.
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    pub reorder_point: i64,
    pub lead_time_days: i32,
    pub average_daily_use: Option<Decimal>,
    pub safety_stock: Decimal,
    pub min_order_qty: Decimal,
    pub order_multiple: Decimal,
    pub pack_size: Decimal,
    pub purchase_uom: PurchaseUom,
    pub on_order_qty: Decimal,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Build a new item from validated details with zero stock.
    ///
    /// Opening stock is posted through the ledger afterwards so it is audited.
    pub fn from_details(id: ItemId, details: ItemDetails, created_at: DateTime<Utc>) -> Self {
        let sku = compose_sku(&details.part_number, details.finish);
        Self {
            id,
            name: details.name,
            part_number: details.part_number,
            finish: details.finish,
            sku,
            location: details.location,
            stock: 0,
            committed_qty: 0,
            discontinued: details.discontinued,
            supplier_id: details.supplier_id,
            supplier_name: details.supplier_name,
            supplier_contact: details.supplier_contact,
            reorder_point: details.reorder_point,
            lead_time_days: details.lead_time_days,
            average_daily_use: None,
            safety_stock: details.safety_stock,
            min_order_qty: details.min_order_qty,
            order_multiple: details.order_multiple,
            pack_size: details.pack_size,
            purchase_uom: details.purchase_uom,
            on_order_qty: Decimal::ZERO,
            created_at,
        }
    }

    /// Replace descriptive and planning fields. Quantities are left untouched.
    pub fn apply_details(&mut self, details: ItemDetails) {
        self.sku = compose_sku(&details.part_number, details.finish);
        self.name = details.name;
        self.part_number = details.part_number;
        self.finish = details.finish;
        self.location = details.location;
        self.discontinued = details.discontinued;
        self.supplier_id = details.supplier_id;
        self.supplier_name = details.supplier_name;
        self.supplier_contact = details.supplier_contact;
        self.reorder_point = details.reorder_point;
        self.lead_time_days = details.lead_time_days;
        self.safety_stock = details.safety_stock;
        self.min_order_qty = details.min_order_qty;
        self.order_multiple = details.order_multiple;
        self.pack_size = details.pack_size;
        self.purchase_uom = details.purchase_uom;
    }

    /// `stock - committed_qty`; negative when oversubscribed.
    pub fn available_qty(&self) -> i64 {
        self.stock - self.committed_qty
    }

    pub fn status(&self) -> ItemStatus {
        derive_status(self.discontinued, self.available_qty(), self.reorder_point)
    }

    pub fn details(&self) -> ItemDetails {
        ItemDetails {
            name: self.name.clone(),
            part_number: self.part_number.clone(),
            finish: self.finish,
            location: self.location.clone(),
            discontinued: self.discontinued,
            supplier_id: self.supplier_id,
            supplier_name: self.supplier_name.clone(),
            supplier_contact: self.supplier_contact.clone(),
            reorder_point: self.reorder_point,
            lead_time_days: self.lead_time_days,
            safety_stock: self.safety_stock,
            min_order_qty: self.min_order_qty,
            order_multiple: self.order_multiple,
            pack_size: self.pack_size,
            purchase_uom: self.purchase_uom,
        }
    }
}

/// Descriptive and planning fields an operator may edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub name: String,
    pub part_number: String,
    pub finish: Option<Finish>,
    pub location: String,
    pub discontinued: bool,
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    pub reorder_point: i64,
    pub lead_time_days: i32,
    pub safety_stock: Decimal,
    pub min_order_qty: Decimal,
    pub order_multiple: Decimal,
    pub pack_size: Decimal,
    pub purchase_uom: PurchaseUom,
}

impl ItemDetails {
    /// Minimal details for a new item; planning fields default to zero.
    pub fn new(name: impl Into<String>, part_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            part_number: part_number.into(),
            finish: None,
            location: String::new(),
            discontinued: false,
            supplier_id: None,
            supplier_name: String::new(),
            supplier_contact: None,
            reorder_point: 0,
            lead_time_days: 0,
            safety_stock: Decimal::ZERO,
            min_order_qty: Decimal::ZERO,
            order_multiple: Decimal::ZERO,
            pack_size: Decimal::ZERO,
            purchase_uom: PurchaseUom::Each,
        }
    }

    /// Trim text fields and reject values no item can have.
    pub fn validated(mut self) -> DomainResult<Self> {
        self.name = self.name.trim().to_string();
        self.part_number = self.part_number.trim().to_string();
        self.location = self.location.trim().to_string();
        self.supplier_name = self.supplier_name.trim().to_string();
        self.supplier_contact = self
            .supplier_contact
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        if self.name.is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if self.part_number.is_empty() {
            return Err(DomainError::validation("part number cannot be empty"));
        }
        if self.lead_time_days < 0 {
            return Err(DomainError::validation("lead time cannot be negative"));
        }
        for (field, value) in [
            ("safety_stock", self.safety_stock),
            ("min_order_qty", self.min_order_qty),
            ("order_multiple", self.order_multiple),
            ("pack_size", self.pack_size),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(DomainError::validation(format!("{field} cannot be negative")));
            }
        }
        Ok(self)
    }
}

/// Read model for an item: stored fields plus the derived figures every caller shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub available_qty: i64,
    pub status: ItemStatus,
    pub active_reservations: i64,
}

impl ItemView {
    pub fn new(item: InventoryItem, active_reservations: i64) -> Self {
        Self {
            available_qty: item.available_qty(),
            status: item.status(),
            active_reservations,
            item,
        }
    }
}
