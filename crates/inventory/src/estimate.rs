//! Estimate check: compare a job's material requirements against stock on hand.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use forgedesk_core::{DomainError, DomainResult, ItemId};

use crate::item::InventoryItem;
use crate::sku::{Finish, compose_sku};

/// One requirement row as supplied by the estimate import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateRequirement {
    pub part_number: String,
    #[serde(default)]
    pub finish: Option<String>,
    pub required_qty: i64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateStatus {
    Missing,
    Short,
    Available,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateLine {
    pub part_number: String,
    pub finish: Option<Finish>,
    pub sku: String,
    pub required_qty: i64,
    pub item_id: Option<ItemId>,
    pub item_name: Option<String>,
    pub on_hand: i64,
    pub shortfall: i64,
    pub status: EstimateStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateCounts {
    pub total: usize,
    pub available: usize,
    pub short: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateReport {
    pub lines: Vec<EstimateLine>,
    pub counts: EstimateCounts,
}

/// Merged requirement: upper-cased part number, normalized finish, summed quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRequirement {
    pub part_number: String,
    pub finish: Option<Finish>,
    pub sku: String,
    pub required_qty: i64,
}

/// Fold duplicate `(part, finish)` rows together. Blank part numbers are skipped.
pub fn merge_requirements(rows: &[EstimateRequirement]) -> DomainResult<Vec<MergedRequirement>> {
    let mut merged: BTreeMap<(String, Option<Finish>), i64> = BTreeMap::new();

    for row in rows {
        let part = row.part_number.trim().to_uppercase();
        if part.is_empty() {
            continue;
        }
        if row.required_qty < 0 {
            return Err(DomainError::validation(format!(
                "required quantity for {part} cannot be negative"
            )));
        }
        let finish = Finish::normalize(row.finish.as_deref());
        *merged.entry((part, finish)).or_insert(0) += row.required_qty;
    }

    Ok(merged
        .into_iter()
        .map(|((part_number, finish), required_qty)| MergedRequirement {
            sku: compose_sku(&part_number, finish),
            part_number,
            finish,
            required_qty,
        })
        .collect())
}

/// Evaluate merged requirements against items keyed by upper-cased SKU.
pub fn evaluate(
    requirements: Vec<MergedRequirement>,
    items_by_sku: &HashMap<String, InventoryItem>,
) -> EstimateReport {
    let mut counts = EstimateCounts::default();
    let mut lines: Vec<EstimateLine> = requirements
        .into_iter()
        .map(|req| {
            let item = items_by_sku.get(&req.sku.to_uppercase());
            let on_hand = item.map(|i| i.stock).unwrap_or(0);
            let status = match item {
                None => EstimateStatus::Missing,
                Some(i) if i.stock >= req.required_qty => EstimateStatus::Available,
                Some(_) => EstimateStatus::Short,
            };
            let shortfall = (req.required_qty - on_hand).max(0);

            counts.total += 1;
            match status {
                EstimateStatus::Available => counts.available += 1,
                EstimateStatus::Short => counts.short += 1,
                EstimateStatus::Missing => counts.missing += 1,
            }

            EstimateLine {
                part_number: req.part_number,
                finish: req.finish,
                sku: req.sku,
                required_qty: req.required_qty,
                item_id: item.map(|i| i.id),
                item_name: item.map(|i| i.name.clone()),
                on_hand,
                shortfall,
                status,
            }
        })
        .collect();

    lines.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| a.part_number.cmp(&b.part_number))
            .then_with(|| a.finish.cmp(&b.finish))
    });

    EstimateReport { lines, counts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemDetails;
    use chrono::Utc;

    fn req(part: &str, finish: Option<&str>, qty: i64) -> EstimateRequirement {
        EstimateRequirement {
            part_number: part.into(),
            finish: finish.map(Into::into),
            required_qty: qty,
        }
    }

    fn stocked(part: &str, finish: Option<Finish>, stock: i64) -> (String, InventoryItem) {
        let mut details = ItemDetails::new(part, part);
        details.finish = finish;
        let mut item = InventoryItem::from_details(ItemId::new(), details, Utc::now());
        item.stock = stock;
        (item.sku.to_uppercase(), item)
    }

    #[test]
    fn duplicates_merge_case_insensitively() {
        let merged = merge_requirements(&[
            req("hb-100", Some("bl"), 2),
            req("HB-100", Some("BL"), 3),
            req("HB-100", None, 1),
            req("   ", None, 9),
        ])
        .unwrap();
        assert_eq!(merged.len(), 2);
        let with_finish = merged.iter().find(|m| m.finish == Some(Finish::Bl)).unwrap();
        assert_eq!(with_finish.required_qty, 5);
        assert_eq!(with_finish.sku, "HB-100-BL");
    }

    #[test]
    fn lines_sort_missing_then_short_then_available() {
        let items: HashMap<String, InventoryItem> = [
            stocked("AA-1", None, 100),
            stocked("BB-2", None, 1),
        ]
        .into_iter()
        .collect();

        let merged = merge_requirements(&[
            req("AA-1", None, 10),
            req("BB-2", None, 4),
            req("ZZ-9", None, 1),
            req("CC-3", None, 1),
        ])
        .unwrap();
        let report = evaluate(merged, &items);

        let order: Vec<(&str, EstimateStatus)> =
            report.lines.iter().map(|l| (l.part_number.as_str(), l.status)).collect();
        assert_eq!(
            order,
            vec![
                ("CC-3", EstimateStatus::Missing),
                ("ZZ-9", EstimateStatus::Missing),
                ("BB-2", EstimateStatus::Short),
                ("AA-1", EstimateStatus::Available),
            ]
        );
        assert_eq!(report.lines[2].shortfall, 3);
        assert_eq!(report.counts.missing, 2);
        assert_eq!(report.counts.short, 1);
        assert_eq!(report.counts.available, 1);
        assert_eq!(report.counts.total, 4);
    }

    #[test]
    fn negative_requirement_is_rejected() {
        assert!(matches!(
            merge_requirements(&[req("AA-1", None, -1)]),
            Err(DomainError::Validation(_))
        ));
    }
}
