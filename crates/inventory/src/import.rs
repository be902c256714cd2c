//! Spreadsheet import rows.
//!
//! Rows are create-or-update keyed by the derived SKU. Status text is ignored
//! except for an explicit "discontinued".

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgedesk_core::{DomainError, DomainResult};

use crate::item::{InventoryItem, ItemDetails, ItemStatus};
use crate::sku::{Finish, compose_sku, parse_sku};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    pub item: String,
    #[serde(default)]
    pub part_number: String,
    #[serde(default)]
    pub finish: Option<String>,
    /// Used to recover part number and finish when the sheet only carries a SKU.
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub location: String,
    pub stock: i64,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub reorder_point: i64,
    #[serde(default)]
    pub lead_time_days: i32,
    #[serde(default)]
    pub average_daily_use: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A validated import row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImportRow {
    pub sku: String,
    pub name: String,
    pub part_number: String,
    pub finish: Option<Finish>,
    pub location: String,
    pub stock: i64,
    pub supplier_name: String,
    pub reorder_point: i64,
    pub lead_time_days: i32,
    pub average_daily_use: Option<Decimal>,
    /// `Some(true)` only for an explicit discontinued status; other text is dropped.
    pub discontinued: Option<bool>,
}

impl ImportRow {
    /// `index` is the zero-based row position, used in error messages.
    pub fn normalize(&self, index: usize) -> DomainResult<NormalizedImportRow> {
        let row_no = index + 1;

        let (part_number, finish) = if self.part_number.trim().is_empty() {
            let parsed = parse_sku(self.sku.as_deref().unwrap_or(""));
            let finish = Finish::normalize(self.finish.as_deref()).or(parsed.finish);
            (parsed.part_number, finish)
        } else {
            (
                self.part_number.trim().to_string(),
                Finish::normalize(self.finish.as_deref()),
            )
        };

        if part_number.is_empty() {
            return Err(DomainError::validation(format!(
                "row {row_no}: part number or SKU is required"
            )));
        }
        if self.item.trim().is_empty() {
            return Err(DomainError::validation(format!("row {row_no}: item name is required")));
        }
        if self.stock < 0 {
            return Err(DomainError::validation(format!("row {row_no}: stock cannot be negative")));
        }
        if self.lead_time_days < 0 {
            return Err(DomainError::validation(format!(
                "row {row_no}: lead time cannot be negative"
            )));
        }

        Ok(NormalizedImportRow {
            sku: compose_sku(&part_number, finish),
            name: self.item.trim().to_string(),
            part_number,
            finish,
            location: self.location.trim().to_string(),
            stock: self.stock,
            supplier_name: self.supplier.trim().to_string(),
            reorder_point: self.reorder_point,
            lead_time_days: self.lead_time_days,
            average_daily_use: self.average_daily_use,
            discontinued: self
                .status
                .as_deref()
                .map(ItemStatus::is_discontinued_label),
        })
    }
}

impl NormalizedImportRow {
    /// Details to store, keeping fields the sheet does not carry from `existing`.
    pub fn details(&self, existing: Option<&InventoryItem>) -> ItemDetails {
        let mut details = match existing {
            Some(item) => item.details(),
            None => ItemDetails::new(self.name.clone(), self.part_number.clone()),
        };
        details.name = self.name.clone();
        details.part_number = self.part_number.clone();
        details.finish = self.finish;
        details.location = self.location.clone();
        details.supplier_name = self.supplier_name.clone();
        details.reorder_point = self.reorder_point;
        details.lead_time_days = self.lead_time_days;
        details.discontinued = match (self.discontinued, existing) {
            (Some(flag), _) => flag,
            (None, Some(item)) => item.discontinued,
            (None, None) => false,
        };
        details
    }
}

/// Counts returned by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forgedesk_core::ItemId;

    fn test_row() -> ImportRow {
        ImportRow {
            item: "Hinge".into(),
            part_number: String::new(),
            finish: None,
            sku: Some("HB-100-BL".into()),
            location: "A1".into(),
            stock: 12,
            supplier: " Acme ".into(),
            reorder_point: 4,
            lead_time_days: 7,
            average_daily_use: None,
            status: Some("Low".into()),
        }
    }

    #[test]
    fn sku_only_rows_recover_part_and_finish() {
        let row = test_row().normalize(0).unwrap();
        assert_eq!(row.part_number, "HB-100");
        assert_eq!(row.finish, Some(Finish::Bl));
        assert_eq!(row.sku, "HB-100-BL");
        assert_eq!(row.supplier_name, "Acme");
    }

    #[test]
    fn only_discontinued_status_is_honored() {
        let row = test_row().normalize(0).unwrap();
        assert_eq!(row.discontinued, Some(false));

        let mut raw = test_row();
        raw.status = Some(" DISCONTINUED ".into());
        assert_eq!(raw.normalize(0).unwrap().discontinued, Some(true));

        raw.status = None;
        assert_eq!(raw.normalize(0).unwrap().discontinued, None);
    }

    #[test]
    fn missing_part_number_reports_row_number() {
        let mut raw = test_row();
        raw.sku = None;
        let err = raw.normalize(4).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.starts_with("row 5") => {}
            _ => panic!("Expected Validation naming row 5"),
        }
    }

    #[test]
    fn update_keeps_fields_the_sheet_does_not_carry() {
        let mut existing =
            InventoryItem::from_details(ItemId::new(), ItemDetails::new("Old", "HB-100"), Utc::now());
        existing.discontinued = true;
        existing.safety_stock = Decimal::new(5, 0);

        let mut raw = test_row();
        raw.status = None;
        let details = raw.normalize(0).unwrap().details(Some(&existing));
        assert_eq!(details.name, "Hinge");
        assert!(details.discontinued);
        assert_eq!(details.safety_stock, Decimal::new(5, 0));
    }
}
