//! Item catalog: entry, edits, import, estimates and read views.
//!
//! Stock never changes here directly. Opening stock and import differences go
//! through the ledger like any other movement.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use forgedesk_core::{DomainError, ItemId};
use forgedesk_inventory::estimate::{evaluate, merge_requirements};
use forgedesk_inventory::{
    EstimateReport, EstimateRequirement, ImportOutcome, ImportRow, InventoryItem, InventorySummary,
    ItemDetails, ItemView, LedgerLine, NormalizedImportRow, PostTransaction, compose_sku,
};

use super::finish;
use super::ledger::post_transaction;
use crate::capabilities::Capabilities;
use crate::error::EngineResult;
use crate::store::{InventoryStore, StoreTx};

const INITIAL_STOCK_REFERENCE: &str = "Initial stock";
const IMPORT_REFERENCE: &str = "Inventory import";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    #[serde(flatten)]
    pub details: ItemDetails,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Clone)]
pub struct CatalogEngine {
    store: Arc<dyn InventoryStore>,
    capabilities: Capabilities,
}

impl CatalogEngine {
    pub fn new(store: Arc<dyn InventoryStore>, capabilities: Capabilities) -> Self {
        Self {
            store,
            capabilities,
        }
    }

    /// Create an item. Non-zero opening stock is posted as an "Initial stock"
    /// transaction in the same unit of work.
    #[instrument(skip(self, request), fields(part_number = %request.details.part_number), err)]
    pub async fn create_item(&self, request: NewItem) -> EngineResult<ItemView> {
        let details = request.details.validated()?;
        if request.stock < 0 {
            return Err(DomainError::validation("opening stock cannot be negative").into());
        }

        let mut tx = self.store.begin().await?;
        let result = create_in(tx.as_mut(), details, request.stock).await;
        let item = finish(tx, result).await?;

        info!(item_id = %item.id, sku = %item.sku, stock = item.stock, "inventory item created");
        Ok(ItemView::new(item, 0))
    }

    /// Replace descriptive and planning fields. Quantities are untouched.
    #[instrument(skip(self, details), err)]
    pub async fn update_item(&self, id: ItemId, details: ItemDetails) -> EngineResult<ItemView> {
        let details = details.validated()?;
        let mut tx = self.store.begin().await?;
        let result = update_in(tx.as_mut(), id, details, self.capabilities).await;
        let view = finish(tx, result).await?;
        info!(item_id = %id, sku = %view.item.sku, "inventory item updated");
        Ok(view)
    }

    pub async fn get_item(&self, id: ItemId) -> EngineResult<ItemView> {
        let mut tx = self.store.begin().await?;
        let result = get_in(tx.as_mut(), id, self.capabilities).await;
        finish(tx, result).await
    }

    /// Every item, ordered by name then SKU.
    pub async fn list_items(&self) -> EngineResult<Vec<ItemView>> {
        let mut tx = self.store.begin().await?;
        let result = list_in(tx.as_mut(), self.capabilities).await;
        finish(tx, result).await
    }

    /// Case-insensitive SKU lookup.
    pub async fn find_by_sku(&self, sku: &str) -> EngineResult<ItemView> {
        let mut tx = self.store.begin().await?;
        let result = find_in(tx.as_mut(), sku, self.capabilities).await;
        finish(tx, result).await
    }

    /// Create-or-update items keyed by derived SKU.
    ///
    /// Every row is validated before anything is written; one bad row rejects
    /// the whole sheet.
    #[instrument(skip(self, rows), fields(rows = rows.len()), err)]
    pub async fn import_items(&self, rows: Vec<ImportRow>) -> EngineResult<ImportOutcome> {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(index, row)| row.normalize(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.store.begin().await?;
        let result = import_in(tx.as_mut(), &rows).await;
        let outcome = finish(tx, result).await?;

        info!(
            created = outcome.created,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            "inventory import applied"
        );
        Ok(outcome)
    }

    /// Compare estimate requirements against stock on hand.
    pub async fn check_estimate(
        &self,
        requirements: Vec<EstimateRequirement>,
    ) -> EngineResult<EstimateReport> {
        let merged = merge_requirements(&requirements)?;
        let mut tx = self.store.begin().await?;
        let result = tx.list_items().await.map_err(Into::into);
        let items = finish(tx, result).await?;

        let by_sku: HashMap<String, InventoryItem> = items
            .into_iter()
            .map(|item| (item.sku.to_uppercase(), item))
            .collect();
        Ok(evaluate(merged, &by_sku))
    }

    pub async fn inventory_summary(&self) -> EngineResult<InventorySummary> {
        let mut tx = self.store.begin().await?;
        let result = summary_in(tx.as_mut(), self.capabilities).await;
        finish(tx, result).await
    }
}

/// SKUs are unique across the catalog, ignoring case.
async fn ensure_sku_free(tx: &mut dyn StoreTx, sku: &str, owner: Option<ItemId>) -> EngineResult<()> {
    match tx.find_item_by_sku(sku).await? {
        Some(existing) if Some(existing.id) != owner => Err(DomainError::validation(format!(
            "SKU {sku} is already used by {}",
            existing.name
        ))
        .into()),
        _ => Ok(()),
    }
}

async fn ensure_supplier(tx: &mut dyn StoreTx, details: &ItemDetails) -> EngineResult<()> {
    if let Some(id) = details.supplier_id {
        if tx.get_supplier(id).await?.is_none() {
            return Err(DomainError::not_found(format!("supplier {id}")).into());
        }
    }
    Ok(())
}

async fn active_counts(
    tx: &mut dyn StoreTx,
    ids: &[ItemId],
    capabilities: Capabilities,
) -> EngineResult<HashMap<ItemId, i64>> {
    if !capabilities.reservations || ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(tx.active_reservation_counts(ids).await?)
}

async fn view_of(
    tx: &mut dyn StoreTx,
    item: InventoryItem,
    capabilities: Capabilities,
) -> EngineResult<ItemView> {
    let counts = active_counts(tx, &[item.id], capabilities).await?;
    let active = counts.get(&item.id).copied().unwrap_or(0);
    Ok(ItemView::new(item, active))
}

async fn reload(tx: &mut dyn StoreTx, id: ItemId) -> EngineResult<InventoryItem> {
    tx.items_by_id(&[id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::not_found(format!("inventory item {id}")).into())
}

async fn create_in(
    tx: &mut dyn StoreTx,
    details: ItemDetails,
    stock: i64,
) -> EngineResult<InventoryItem> {
    let sku = compose_sku(&details.part_number, details.finish);
    ensure_sku_free(tx, &sku, None).await?;
    ensure_supplier(tx, &details).await?;

    let item = InventoryItem::from_details(ItemId::new(), details, Utc::now());
    tx.insert_item(&item).await?;

    if stock > 0 {
        let posting =
            PostTransaction::new(INITIAL_STOCK_REFERENCE, vec![LedgerLine::new(item.id, stock)]);
        post_transaction(tx, &posting).await?;
    }
    reload(tx, item.id).await
}

async fn update_in(
    tx: &mut dyn StoreTx,
    id: ItemId,
    details: ItemDetails,
    capabilities: Capabilities,
) -> EngineResult<ItemView> {
    let mut item = tx
        .lock_items(&[id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::not_found(format!("inventory item {id}")))?;

    let sku = compose_sku(&details.part_number, details.finish);
    ensure_sku_free(tx, &sku, Some(id)).await?;
    ensure_supplier(tx, &details).await?;

    item.apply_details(details);
    tx.update_item_details(&item).await?;
    view_of(tx, item, capabilities).await
}

async fn get_in(tx: &mut dyn StoreTx, id: ItemId, capabilities: Capabilities) -> EngineResult<ItemView> {
    let item = reload(tx, id).await?;
    view_of(tx, item, capabilities).await
}

async fn find_in(tx: &mut dyn StoreTx, sku: &str, capabilities: Capabilities) -> EngineResult<ItemView> {
    let item = tx
        .find_item_by_sku(sku)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("inventory item with SKU {}", sku.trim())))?;
    view_of(tx, item, capabilities).await
}

async fn list_in(tx: &mut dyn StoreTx, capabilities: Capabilities) -> EngineResult<Vec<ItemView>> {
    let mut items = tx.list_items().await?;
    items.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.sku.cmp(&b.sku))
    });
    let ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();
    let counts = active_counts(tx, &ids, capabilities).await?;

    Ok(items
        .into_iter()
        .map(|item| {
            let active = counts.get(&item.id).copied().unwrap_or(0);
            ItemView::new(item, active)
        })
        .collect())
}

async fn summary_in(tx: &mut dyn StoreTx, capabilities: Capabilities) -> EngineResult<InventorySummary> {
    let items = tx.list_items().await?;
    let active = if capabilities.reservations {
        tx.count_active_reservations().await?
    } else {
        0
    };
    Ok(InventorySummary::from_items(&items, active))
}

async fn import_in(tx: &mut dyn StoreTx, rows: &[NormalizedImportRow]) -> EngineResult<ImportOutcome> {
    let mut outcome = ImportOutcome::default();
    for row in rows {
        match tx.find_item_by_sku(&row.sku).await? {
            None => {
                create_imported(tx, row).await?;
                outcome.created += 1;
            }
            Some(existing) => {
                if update_imported(tx, row, existing).await? {
                    outcome.updated += 1;
                } else {
                    outcome.unchanged += 1;
                }
            }
        }
    }
    Ok(outcome)
}

async fn post_import_delta(tx: &mut dyn StoreTx, item: &InventoryItem, delta: i64) -> EngineResult<()> {
    if delta == 0 {
        return Ok(());
    }
    let posting = PostTransaction::new(
        IMPORT_REFERENCE,
        vec![LedgerLine::new(item.id, delta).with_note(item.sku.clone())],
    );
    post_transaction(tx, &posting).await?;
    Ok(())
}

async fn create_imported(tx: &mut dyn StoreTx, row: &NormalizedImportRow) -> EngineResult<()> {
    let details = row.details(None).validated()?;
    let item = InventoryItem::from_details(ItemId::new(), details, Utc::now());
    tx.insert_item(&item).await?;
    post_import_delta(tx, &item, row.stock).await?;
    if let Some(average) = row.average_daily_use {
        tx.set_average_daily_use(item.id, average).await?;
    }
    Ok(())
}

/// Returns whether anything about the item changed.
async fn update_imported(
    tx: &mut dyn StoreTx,
    row: &NormalizedImportRow,
    existing: InventoryItem,
) -> EngineResult<bool> {
    let mut item = existing;
    let details = row.details(Some(&item)).validated()?;
    let mut changed = false;

    if details != item.details() {
        item.apply_details(details);
        tx.update_item_details(&item).await?;
        changed = true;
    }

    let delta = row.stock - item.stock;
    if delta != 0 {
        post_import_delta(tx, &item, delta).await?;
        changed = true;
    }

    if let Some(average) = row.average_daily_use {
        if item.average_daily_use != Some(average) {
            tx.set_average_daily_use(item.id, average).await?;
            changed = true;
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{engines, engines_without_reservations, seed_item};
    use crate::error::EngineError;
    use forgedesk_inventory::{EstimateStatus, Finish, ItemStatus};
    use forgedesk_reservations::{CommitLine, JobMetadata};
    use rust_decimal_macros::dec;

    use crate::engine::CommitRequest;

    fn import_row(item: &str, part: &str, stock: i64) -> ImportRow {
        ImportRow {
            item: item.to_string(),
            part_number: part.to_string(),
            finish: None,
            sku: None,
            location: String::new(),
            stock,
            supplier: String::new(),
            reorder_point: 0,
            lead_time_days: 0,
            average_daily_use: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn opening_stock_is_posted_through_the_ledger() {
        let engines = engines();
        let mut details = ItemDetails::new("Hinge", "hb-100");
        details.finish = Some(Finish::Bl);
        let view = engines
            .catalog
            .create_item(NewItem { details, stock: 12 })
            .await
            .unwrap();
        assert_eq!(view.item.sku, "hb-100-BL");
        assert_eq!(view.item.stock, 12);
        assert_eq!(view.status, ItemStatus::InStock);

        let history = engines.ledger.history(view.item.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reference, "Initial stock");
        assert_eq!(history[0].lines[0].stock_after, 12);
    }

    #[tokio::test]
    async fn zero_opening_stock_posts_nothing() {
        let engines = engines();
        let view = seed_item(&engines, "Z-1", 0, 0).await;
        assert!(engines.ledger.history(view.item.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_sku_is_rejected_on_create_and_update() {
        let engines = engines();
        seed_item(&engines, "DUP-1", 0, 0).await;
        let other = seed_item(&engines, "DUP-2", 0, 0).await;

        let err = engines
            .catalog
            .create_item(NewItem {
                details: ItemDetails::new("Copy", "dup-1"),
                stock: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Domain(DomainError::Validation(_))));

        let err = engines
            .catalog
            .update_item(other.item.id, ItemDetails::new("Renamed", "DUP-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Domain(DomainError::Validation(_))));

        // Keeping its own SKU is fine.
        let renamed = engines
            .catalog
            .update_item(other.item.id, ItemDetails::new("Renamed", "DUP-2"))
            .await
            .unwrap();
        assert_eq!(renamed.item.name, "Renamed");
    }

    #[tokio::test]
    async fn negative_opening_stock_is_rejected() {
        let engines = engines();
        let err = engines
            .catalog
            .create_item(NewItem {
                details: ItemDetails::new("Bad", "NEG-1"),
                stock: -1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Domain(DomainError::Validation(_))));
        assert!(engines.catalog.list_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_keeps_quantities() {
        let engines = engines();
        let view = seed_item(&engines, "UP-1", 9, 0).await;
        let mut details = view.item.details();
        details.reorder_point = 20;
        details.location = "Aisle 4".into();

        let updated = engines.catalog.update_item(view.item.id, details).await.unwrap();
        assert_eq!(updated.item.stock, 9);
        assert_eq!(updated.item.location, "Aisle 4");
        assert_eq!(updated.status, ItemStatus::Critical);
    }

    #[tokio::test]
    async fn list_is_sorted_by_name_and_lookup_ignores_case() {
        let engines = engines();
        for (name, part) in [("washer", "W-1"), ("Anchor", "A-1"), ("bolt", "B-1")] {
            engines
                .catalog
                .create_item(NewItem {
                    details: ItemDetails::new(name, part),
                    stock: 0,
                })
                .await
                .unwrap();
        }
        let names: Vec<String> = engines
            .catalog
            .list_items()
            .await
            .unwrap()
            .into_iter()
            .map(|view| view.item.name)
            .collect();
        assert_eq!(names, vec!["Anchor", "bolt", "washer"]);

        let found = engines.catalog.find_by_sku(" b-1 ").await.unwrap();
        assert_eq!(found.item.name, "bolt");
        let err = engines.catalog.find_by_sku("NOPE").await.unwrap_err();
        assert!(matches!(err, EngineError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn import_creates_updates_and_counts_unchanged() {
        let engines = engines();
        let first = engines
            .catalog
            .import_items(vec![
                import_row("Hinge", "HB-100", 10),
                import_row("Closer", "DC-200", 0),
            ])
            .await
            .unwrap();
        assert_eq!(first, ImportOutcome { created: 2, updated: 0, unchanged: 0 });

        let mut recount = import_row("Hinge", "HB-100", 7);
        recount.average_daily_use = Some(dec!(1.5));
        let mut retired = import_row("Closer", "DC-200", 0);
        retired.status = Some("Discontinued".into());
        let second = engines
            .catalog
            .import_items(vec![recount, retired, import_row("Closer", "DC-200", 0)])
            .await
            .unwrap();
        // The repeated Closer row no longer says discontinued, so it keeps the flag.
        assert_eq!(second, ImportOutcome { created: 0, updated: 2, unchanged: 1 });

        let hinge = engines.catalog.find_by_sku("HB-100").await.unwrap();
        assert_eq!(hinge.item.stock, 7);
        assert_eq!(hinge.item.average_daily_use, Some(dec!(1.5)));
        let history = engines.ledger.history(hinge.item.id).await.unwrap();
        assert_eq!(history[0].reference, "Inventory import");
        assert_eq!(history[0].lines[0].quantity_change, -3);

        let closer = engines.catalog.find_by_sku("DC-200").await.unwrap();
        assert_eq!(closer.status, ItemStatus::Discontinued);
    }

    #[tokio::test]
    async fn one_bad_row_rejects_the_sheet() {
        let engines = engines();
        let err = engines
            .catalog
            .import_items(vec![import_row("Hinge", "HB-100", 10), import_row("", "X-1", 1)])
            .await
            .unwrap_err();
        match err {
            EngineError::Domain(DomainError::Validation(msg)) if msg.contains("row 2") => {}
            _ => panic!("Expected Validation naming the row"),
        }
        assert!(engines.catalog.list_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn estimate_compares_merged_requirements() {
        let engines = engines();
        seed_item(&engines, "HB-100", 10, 0).await;
        seed_item(&engines, "DC-200", 2, 0).await;

        let report = engines
            .catalog
            .check_estimate(vec![
                EstimateRequirement { part_number: "hb-100".into(), finish: None, required_qty: 4 },
                EstimateRequirement { part_number: "HB-100".into(), finish: None, required_qty: 4 },
                EstimateRequirement { part_number: "DC-200".into(), finish: None, required_qty: 5 },
                EstimateRequirement { part_number: "ZZ-9".into(), finish: None, required_qty: 1 },
            ])
            .await
            .unwrap();

        let statuses: Vec<EstimateStatus> = report.lines.iter().map(|l| l.status).collect();
        assert_eq!(
            statuses,
            vec![EstimateStatus::Missing, EstimateStatus::Short, EstimateStatus::Available]
        );
        assert_eq!(report.lines[1].shortfall, 3);
        assert_eq!(report.lines[2].required_qty, 8);
        assert_eq!(report.counts.total, 3);
    }

    #[tokio::test]
    async fn summary_counts_commitments_and_reservations() {
        let engines = engines();
        let a = seed_item(&engines, "S-A", 10, 0).await;
        let b = seed_item(&engines, "S-B", 4, 0).await;
        engines
            .reservations
            .commit_items(CommitRequest {
                job: JobMetadata::new("J-1", "Lobby", "Dana"),
                lines: vec![CommitLine::new(a.item.id, 0, 3), CommitLine::new(b.item.id, 0, 6)],
            })
            .await
            .unwrap();

        let summary = engines.catalog.inventory_summary().await.unwrap();
        assert_eq!(summary.total_stock, 14);
        assert_eq!(summary.total_committed, 9);
        // B is oversubscribed and counts as zero.
        assert_eq!(summary.total_available, 7);
        assert_eq!(summary.active_reservations, 1);
    }

    #[tokio::test]
    async fn summary_without_reservations_reports_zero() {
        let engines = engines_without_reservations();
        seed_item(&engines, "S-C", 10, 0).await;
        let summary = engines.catalog.inventory_summary().await.unwrap();
        assert_eq!(summary.active_reservations, 0);
        assert_eq!(summary.total_available, 10);
    }
}
