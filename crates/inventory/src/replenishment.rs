//! Replenishment math: status derivation, reorder recommendation, lead-time demand,
//! pack conversions and the supplier-grouped report.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use forgedesk_core::{ItemId, SupplierId};

use crate::item::{InventoryItem, ItemStatus, PurchaseUom};

/// Group label for items with neither a linked supplier nor a legacy supplier name.
pub const UNASSIGNED_SUPPLIER: &str = "Unassigned Supplier";

/// Recommended quantities at or below this are treated as "nothing to order".
pub fn needs_order_threshold() -> Decimal {
    Decimal::new(1, 4)
}

/// Derive the displayed status.
///
/// `Critical` below the reorder point, `Low` up to 130% of it (floored), otherwise
/// `In Stock`. Negative reorder points behave as zero.
pub fn derive_status(discontinued: bool, available: i64, reorder_point: i64) -> ItemStatus {
    if discontinued {
        return ItemStatus::Discontinued;
    }
    let threshold = reorder_point.max(0);
    // floor(threshold * 1.3) in integer arithmetic
    let low_ceiling = threshold.saturating_mul(13).div_euclid(10);
    if available < threshold {
        ItemStatus::Critical
    } else if available <= low_ceiling {
        ItemStatus::Low
    } else {
        ItemStatus::InStock
    }
}

/// Quantity needed to bring availability back to the reorder point, rounded to
/// three places. Order multiples, minimums and pack sizes are not applied.
pub fn recommended_order_qty(reorder_point: i64, available: Decimal) -> Decimal {
    let target = Decimal::from(reorder_point.max(0));
    (target - available)
        .max(Decimal::ZERO)
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
}

/// Lead time used for planning: the item's own, or the supplier default when the
/// item has none.
pub fn effective_lead_time(item_lead_time: i32, supplier_default: Option<i32>) -> i32 {
    if item_lead_time > 0 {
        item_lead_time
    } else {
        supplier_default.unwrap_or(0).max(0)
    }
}

fn usable_pack(pack_size: Decimal, uom: PurchaseUom) -> Option<Decimal> {
    (uom == PurchaseUom::Pack && pack_size > Decimal::ZERO).then_some(pack_size)
}

/// Convert a purchase-unit quantity into eaches.
pub fn quantity_to_each(quantity: Decimal, pack_size: Decimal, uom: PurchaseUom) -> Decimal {
    match usable_pack(pack_size, uom) {
        Some(pack) => quantity * pack,
        None => quantity,
    }
}

/// Convert an each quantity into purchase units.
pub fn each_to_unit(quantity: Decimal, pack_size: Decimal, uom: PurchaseUom) -> Decimal {
    match usable_pack(pack_size, uom) {
        Some(pack) => quantity / pack,
        None => quantity,
    }
}

/// Inputs for one item's replenishment figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningInputs {
    pub stock: i64,
    pub committed: i64,
    pub on_order: Decimal,
    pub average_daily_use: Option<Decimal>,
    pub lead_time_days: i32,
    pub safety_stock: Decimal,
    pub reorder_point: i64,
}

/// Derived replenishment figures for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentSnapshot {
    pub available_now: i64,
    pub projected_available: Decimal,
    pub demand_during_lead: Decimal,
    pub target_stock: Decimal,
    pub projected_shortfall: Decimal,
    pub recommended_order_qty: Decimal,
    pub days_of_supply: Option<Decimal>,
}

impl ReplenishmentSnapshot {
    pub fn compute(inputs: &PlanningInputs) -> Self {
        let available_now = inputs.stock - inputs.committed;
        let available = Decimal::from(available_now);
        let projected_available = available + inputs.on_order;
        let usage = inputs.average_daily_use.unwrap_or(Decimal::ZERO);
        let demand_during_lead = usage * Decimal::from(inputs.lead_time_days.max(0));
        let target_stock = demand_during_lead + inputs.safety_stock;
        let projected_shortfall = (target_stock - projected_available).max(Decimal::ZERO);
        let days_of_supply = (usage > Decimal::ZERO).then(|| (projected_available / usage).round_dp(2));

        Self {
            available_now,
            projected_available,
            demand_during_lead,
            target_stock,
            projected_shortfall,
            recommended_order_qty: recommended_order_qty(inputs.reorder_point, available),
            days_of_supply,
        }
    }
}

/// Supplier facts the report needs, resolved by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRef {
    pub id: SupplierId,
    pub name: String,
    pub default_lead_time_days: i32,
}

/// One report line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentRow {
    pub item_id: ItemId,
    pub sku: String,
    pub name: String,
    pub location: String,
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: String,
    pub status: ItemStatus,
    pub stock: i64,
    pub committed_qty: i64,
    pub on_order_qty: Decimal,
    pub average_daily_use: Option<Decimal>,
    pub lead_time_days: i32,
    pub safety_stock: Decimal,
    pub reorder_point: i64,
    pub min_order_qty: Decimal,
    pub order_multiple: Decimal,
    pub pack_size: Decimal,
    pub purchase_uom: PurchaseUom,
    /// Recommended quantity expressed in purchase units.
    pub recommended_purchase_units: Decimal,
    #[serde(flatten)]
    pub plan: ReplenishmentSnapshot,
}

impl ReplenishmentRow {
    pub fn for_item(item: &InventoryItem, supplier: Option<&SupplierRef>) -> Self {
        let lead_time_days =
            effective_lead_time(item.lead_time_days, supplier.map(|s| s.default_lead_time_days));
        let plan = ReplenishmentSnapshot::compute(&PlanningInputs {
            stock: item.stock,
            committed: item.committed_qty,
            on_order: item.on_order_qty,
            average_daily_use: item.average_daily_use,
            lead_time_days,
            safety_stock: item.safety_stock,
            reorder_point: item.reorder_point,
        });
        let supplier_name = match supplier {
            Some(s) => s.name.clone(),
            None => item.supplier_name.clone(),
        };

        Self {
            item_id: item.id,
            sku: item.sku.clone(),
            name: item.name.clone(),
            location: item.location.clone(),
            supplier_id: supplier.map(|s| s.id),
            supplier_name,
            status: item.status(),
            stock: item.stock,
            committed_qty: item.committed_qty,
            on_order_qty: item.on_order_qty,
            average_daily_use: item.average_daily_use,
            lead_time_days,
            safety_stock: item.safety_stock,
            reorder_point: item.reorder_point,
            min_order_qty: item.min_order_qty,
            order_multiple: item.order_multiple,
            pack_size: item.pack_size,
            purchase_uom: item.purchase_uom,
            recommended_purchase_units: each_to_unit(
                plan.recommended_order_qty,
                item.pack_size,
                item.purchase_uom,
            )
            .round_dp(3),
            plan,
        }
    }

    fn group_key(&self) -> (String, String) {
        if let Some(id) = self.supplier_id {
            return (format!("supplier:{id}"), self.supplier_name.clone());
        }
        let legacy = self.supplier_name.trim();
        if legacy.is_empty() {
            ("unassigned".to_string(), UNASSIGNED_SUPPLIER.to_string())
        } else {
            (format!("legacy:{}", legacy.to_lowercase()), legacy.to_string())
        }
    }
}

/// Aggregate figures for a group or the whole report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentTotals {
    pub item_count: usize,
    pub needs_order: usize,
    pub recommended_total: Decimal,
    pub on_hand_total: i64,
    pub committed_total: i64,
    pub on_order_total: Decimal,
}

impl ReplenishmentTotals {
    fn add(&mut self, row: &ReplenishmentRow) {
        self.item_count += 1;
        if row.plan.recommended_order_qty > needs_order_threshold() {
            self.needs_order += 1;
        }
        self.recommended_total += row.plan.recommended_order_qty;
        self.on_hand_total += row.stock;
        self.committed_total += row.committed_qty;
        self.on_order_total += row.on_order_qty;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierGroup {
    pub key: String,
    pub supplier_id: Option<SupplierId>,
    pub name: String,
    pub items: Vec<ReplenishmentRow>,
    pub totals: ReplenishmentTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentReport {
    pub groups: Vec<SupplierGroup>,
    pub totals: ReplenishmentTotals,
}

/// Group rows by supplier (linked id, else legacy name, else unassigned).
/// Groups are ordered by name, rows within a group by item name.
pub fn build_report(rows: Vec<ReplenishmentRow>) -> ReplenishmentReport {
    let mut totals = ReplenishmentTotals::default();
    let mut groups: BTreeMap<String, SupplierGroup> = BTreeMap::new();

    for row in rows {
        totals.add(&row);
        let (key, name) = row.group_key();
        let group = groups.entry(key.clone()).or_insert_with(|| SupplierGroup {
            key,
            supplier_id: row.supplier_id,
            name,
            items: Vec::new(),
            totals: ReplenishmentTotals::default(),
        });
        group.totals.add(&row);
        group.items.push(row);
    }

    let mut groups: Vec<SupplierGroup> = groups.into_values().collect();
    for group in &mut groups {
        group
            .items
            .sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.sku.cmp(&b.sku)));
    }
    groups.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.key.cmp(&b.key)));

    ReplenishmentReport { groups, totals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemDetails;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn test_item(name: &str, stock: i64, reorder_point: i64) -> InventoryItem {
        let mut details = ItemDetails::new(name, format!("P-{name}"));
        details.reorder_point = reorder_point;
        let mut item = InventoryItem::from_details(ItemId::new(), details, Utc::now());
        item.stock = stock;
        item
    }

    #[test]
    fn status_thresholds_follow_reorder_point() {
        assert_eq!(derive_status(false, 50, 20), ItemStatus::InStock);
        assert_eq!(derive_status(false, 26, 20), ItemStatus::Low);
        assert_eq!(derive_status(false, 25, 20), ItemStatus::Low);
        assert_eq!(derive_status(false, 20, 20), ItemStatus::Low);
        assert_eq!(derive_status(false, 15, 20), ItemStatus::Critical);
        assert_eq!(derive_status(true, 500, 20), ItemStatus::Discontinued);
    }

    #[test]
    fn zero_reorder_point_is_low_only_at_or_below_zero() {
        assert_eq!(derive_status(false, 0, 0), ItemStatus::Low);
        assert_eq!(derive_status(false, 1, 0), ItemStatus::InStock);
        assert_eq!(derive_status(false, -1, -5), ItemStatus::Critical);
    }

    #[test]
    fn recommendation_covers_reorder_point_shortfall() {
        assert_eq!(recommended_order_qty(30, dec!(35)), Decimal::ZERO);
        assert_eq!(recommended_order_qty(30, dec!(-2)), dec!(32));
        assert_eq!(recommended_order_qty(-5, dec!(-10)), dec!(10));
        assert_eq!(recommended_order_qty(5, dec!(1.6665)), dec!(3.334));
    }

    #[test]
    fn pack_conversions() {
        assert_eq!(quantity_to_each(dec!(3), dec!(12), PurchaseUom::Pack), dec!(36));
        assert_eq!(each_to_unit(dec!(36), dec!(12), PurchaseUom::Pack), dec!(3));
        assert_eq!(quantity_to_each(dec!(5), dec!(0), PurchaseUom::Pack), dec!(5));
        assert_eq!(each_to_unit(dec!(5), dec!(0), PurchaseUom::Pack), dec!(5));
        assert_eq!(quantity_to_each(dec!(5), dec!(12), PurchaseUom::Each), dec!(5));
    }

    #[test]
    fn lead_time_falls_back_to_supplier_default() {
        assert_eq!(effective_lead_time(7, Some(14)), 7);
        assert_eq!(effective_lead_time(0, Some(14)), 14);
        assert_eq!(effective_lead_time(0, None), 0);
    }

    #[test]
    fn snapshot_combines_usage_lead_time_and_on_order() {
        let snap = ReplenishmentSnapshot::compute(&PlanningInputs {
            stock: 40,
            committed: 10,
            on_order: dec!(5),
            average_daily_use: Some(dec!(2.5)),
            lead_time_days: 10,
            safety_stock: dec!(8),
            reorder_point: 40,
        });
        assert_eq!(snap.available_now, 30);
        assert_eq!(snap.projected_available, dec!(35));
        assert_eq!(snap.demand_during_lead, dec!(25));
        assert_eq!(snap.target_stock, dec!(33));
        assert_eq!(snap.projected_shortfall, Decimal::ZERO);
        assert_eq!(snap.recommended_order_qty, dec!(10));
        assert_eq!(snap.days_of_supply, Some(dec!(14)));
    }

    #[test]
    fn unknown_usage_means_no_lead_demand() {
        let snap = ReplenishmentSnapshot::compute(&PlanningInputs {
            stock: 0,
            committed: 0,
            on_order: Decimal::ZERO,
            average_daily_use: None,
            lead_time_days: 30,
            safety_stock: dec!(4),
            reorder_point: 0,
        });
        assert_eq!(snap.demand_during_lead, Decimal::ZERO);
        assert_eq!(snap.projected_shortfall, dec!(4));
        assert_eq!(snap.days_of_supply, None);
    }

    #[test]
    fn report_groups_by_supplier_then_legacy_name_then_unassigned() {
        let supplier = SupplierRef {
            id: SupplierId::new(),
            name: "Acme Metals".into(),
            default_lead_time_days: 12,
        };
        let linked = test_item("Bolt", 5, 10);
        let mut legacy = test_item("Washer", 50, 10);
        legacy.supplier_name = "Old Co".into();
        let orphan = test_item("Anchor", 0, 4);

        let report = build_report(vec![
            ReplenishmentRow::for_item(&linked, Some(&supplier)),
            ReplenishmentRow::for_item(&legacy, None),
            ReplenishmentRow::for_item(&orphan, None),
        ]);

        let names: Vec<&str> = report.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Acme Metals", "Old Co", UNASSIGNED_SUPPLIER]);
        assert_eq!(report.groups[0].items[0].lead_time_days, 12);
        assert_eq!(report.totals.item_count, 3);
        assert_eq!(report.totals.needs_order, 2);
        assert_eq!(report.totals.recommended_total, dec!(9));
        assert_eq!(report.totals.on_hand_total, 55);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: Critical exactly when available is below max(R, 0).
        #[test]
        fn critical_iff_below_reorder_point(available in -100i64..200, reorder_point in -20i64..100) {
            let status = derive_status(false, available, reorder_point);
            prop_assert_eq!(status == ItemStatus::Critical, available < reorder_point.max(0));
        }

        /// Property: the recommendation is never negative and fills the gap exactly.
        #[test]
        fn recommendation_reaches_reorder_point(available in -100i64..200, reorder_point in -20i64..100) {
            let qty = recommended_order_qty(reorder_point, Decimal::from(available));
            prop_assert!(qty >= Decimal::ZERO);
            if qty > Decimal::ZERO {
                prop_assert_eq!(Decimal::from(available) + qty, Decimal::from(reorder_point.max(0)));
            }
        }
    }
}
