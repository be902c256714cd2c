//! Replenishment report and the planning caches behind it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use forgedesk_core::{ItemId, SupplierId};
use forgedesk_inventory::replenishment::{ReplenishmentRow, SupplierRef, build_report};
use forgedesk_inventory::ReplenishmentReport;
use forgedesk_purchasing::PurchaseOrderStatus;
use forgedesk_purchasing::order::outstanding_by_item;

use super::{finish, usage};
use crate::error::EngineResult;
use crate::store::{InventoryStore, StoreTx};

/// Recompute the on-order cache for `ids` from lines on open orders.
///
/// Items with nothing outstanding are reset to zero. Unknown ids are skipped.
#[instrument(skip(tx, ids), fields(items = ids.len()), err)]
pub async fn refresh_on_order_in(tx: &mut dyn StoreTx, ids: &[ItemId]) -> EngineResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let items = tx.lock_items(ids).await?;
    let ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();

    let lines = tx
        .order_lines_for_items(&ids, &PurchaseOrderStatus::OPEN)
        .await?;
    let outstanding = outstanding_by_item(lines.iter().map(|(line, status)| (line, *status)));

    let mut changed = 0;
    for item in &items {
        let on_order = outstanding.get(&item.id).copied().unwrap_or(Decimal::ZERO);
        if on_order != item.on_order_qty {
            tx.set_on_order(item.id, on_order).await?;
            changed += 1;
        }
    }
    Ok(changed)
}

async fn refresh_on_order(store: &dyn InventoryStore, ids: &[ItemId]) -> EngineResult<usize> {
    let mut tx = store.begin().await?;
    let result = refresh_on_order_in(tx.as_mut(), ids).await;
    finish(tx, result).await
}

/// Refresh on-order caches once the purchasing unit of work has committed.
pub(crate) async fn refresh_on_order_after_commit(store: &dyn InventoryStore, ids: &[ItemId]) {
    if ids.is_empty() {
        return;
    }
    match refresh_on_order(store, ids).await {
        Ok(changed) => debug!(items = ids.len(), changed, "on-order cache refreshed"),
        Err(err) => warn!(error = %err, items = ids.len(), "on-order cache refresh failed"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub as_of: NaiveDate,
    pub items: usize,
    pub on_order_changed: usize,
}

#[derive(Clone)]
pub struct ReplenishmentEngine {
    store: Arc<dyn InventoryStore>,
}

impl ReplenishmentEngine {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Planning snapshot for every stocked item, grouped by supplier.
    /// Discontinued items are left out.
    pub async fn report(&self) -> EngineResult<ReplenishmentReport> {
        let mut tx = self.store.begin().await?;
        let result = report_in(tx.as_mut()).await;
        finish(tx, result).await
    }

    /// Recompute the on-order cache for the given items.
    pub async fn refresh_on_order(&self, ids: &[ItemId]) -> EngineResult<usize> {
        refresh_on_order(self.store.as_ref(), ids).await
    }

    /// Recompute averages and on-order caches for every item in one unit of work.
    pub async fn refresh_planning_caches(&self, as_of: NaiveDate) -> EngineResult<RefreshSummary> {
        let mut tx = self.store.begin().await?;
        let result = refresh_all_in(tx.as_mut(), as_of).await;
        let summary = finish(tx, result).await?;
        info!(
            items = summary.items,
            on_order_changed = summary.on_order_changed,
            %as_of,
            "planning caches refreshed"
        );
        Ok(summary)
    }
}

async fn report_in(tx: &mut dyn StoreTx) -> EngineResult<ReplenishmentReport> {
    let suppliers: HashMap<SupplierId, SupplierRef> = tx
        .list_suppliers()
        .await?
        .into_iter()
        .map(|s| {
            (
                s.id,
                SupplierRef {
                    id: s.id,
                    name: s.name,
                    default_lead_time_days: s.default_lead_time_days,
                },
            )
        })
        .collect();

    let rows = tx
        .list_items()
        .await?
        .iter()
        .filter(|item| !item.discontinued)
        .map(|item| {
            let supplier = item.supplier_id.and_then(|id| suppliers.get(&id));
            ReplenishmentRow::for_item(item, supplier)
        })
        .collect();

    Ok(build_report(rows))
}

async fn refresh_all_in(tx: &mut dyn StoreTx, as_of: NaiveDate) -> EngineResult<RefreshSummary> {
    let averages = usage::recalculate_all_in(tx, as_of).await?;
    let ids: Vec<ItemId> = averages.iter().map(|a| a.item_id).collect();
    let on_order_changed = refresh_on_order_in(tx, &ids).await?;
    Ok(RefreshSummary {
        as_of,
        items: ids.len(),
        on_order_changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NewItem;
    use crate::engine::test_support::{engines, seed_item};
    use chrono::Utc;
    use forgedesk_inventory::{ItemDetails, ItemStatus};
    use forgedesk_purchasing::{CreateOrder, NewSupplier, OrderLineInput};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn status_follows_the_reorder_point() {
        let engines = engines();
        for (part, stock, status) in [
            ("S-50", 50, ItemStatus::InStock),
            ("S-25", 25, ItemStatus::Low),
            ("S-15", 15, ItemStatus::Critical),
        ] {
            let item = seed_item(&engines, part, stock, 20).await;
            assert_eq!(item.status, status, "{part}");
        }
    }

    #[tokio::test]
    async fn report_groups_by_supplier_and_skips_discontinued() {
        let engines = engines();
        let supplier = engines
            .purchasing
            .create_supplier(NewSupplier {
                default_lead_time_days: 10,
                ..NewSupplier::named("Acme Hardware")
            })
            .await
            .unwrap();

        let mut linked = ItemDetails::new("Hinge", "HB-100");
        linked.supplier_id = Some(supplier.id);
        linked.reorder_point = 40;
        engines
            .catalog
            .create_item(NewItem { details: linked, stock: 10 })
            .await
            .unwrap();

        let mut legacy = ItemDetails::new("Closer", "DC-200");
        legacy.supplier_name = "Old Vendor".into();
        engines
            .catalog
            .create_item(NewItem { details: legacy, stock: 5 })
            .await
            .unwrap();

        let mut gone = ItemDetails::new("Latch", "LT-1");
        gone.discontinued = true;
        engines
            .catalog
            .create_item(NewItem { details: gone, stock: 5 })
            .await
            .unwrap();

        let report = engines.replenishment.report().await.unwrap();
        let names: Vec<&str> = report.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Acme Hardware", "Old Vendor"]);
        assert_eq!(report.totals.item_count, 2);

        let hinge = &report.groups[0].items[0];
        assert_eq!(hinge.lead_time_days, 10);
        assert_eq!(hinge.plan.recommended_order_qty, dec!(30));
        assert_eq!(report.totals.needs_order, 1);
    }

    #[tokio::test]
    async fn on_order_counts_only_open_orders() {
        let engines = engines();
        let item = seed_item(&engines, "OO-1", 0, 0).await;

        engines
            .purchasing
            .create_order(CreateOrder::new(
                None,
                vec![OrderLineInput::for_item(item.item.id, dec!(12), dec!(1))],
            ))
            .await
            .unwrap();
        let mut cancelled = CreateOrder::new(
            None,
            vec![OrderLineInput::for_item(item.item.id, dec!(100), dec!(1))],
        );
        cancelled.status = Some(PurchaseOrderStatus::Cancelled);
        engines.purchasing.create_order(cancelled).await.unwrap();

        let stored = engines.catalog.get_item(item.item.id).await.unwrap();
        assert_eq!(stored.item.on_order_qty, dec!(12));
    }

    #[tokio::test]
    async fn refresh_planning_caches_repairs_drift() {
        let engines = engines();
        let item = seed_item(&engines, "R-1", 5, 0).await;

        {
            let mut tx = engines.replenishment.store.begin().await.unwrap();
            tx.set_on_order(item.item.id, dec!(99)).await.unwrap();
            tx.commit().await.unwrap();
        }

        let today = Utc::now().date_naive();
        let summary = engines.replenishment.refresh_planning_caches(today).await.unwrap();
        assert_eq!(summary.items, 1);
        assert_eq!(summary.on_order_changed, 1);

        let stored = engines.catalog.get_item(item.item.id).await.unwrap();
        assert_eq!(stored.item.on_order_qty, Decimal::ZERO);
        assert_eq!(stored.item.average_daily_use, Some(Decimal::ZERO));
    }
}
