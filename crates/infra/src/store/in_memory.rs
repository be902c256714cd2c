use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use forgedesk_core::{ItemId, PurchaseOrderId, PurchaseOrderLineId, ReservationId, SupplierId};
use forgedesk_inventory::{InventoryItem, InventoryTransaction};
use forgedesk_purchasing::{
    PurchaseOrder, PurchaseOrderLine, PurchaseOrderReceipt, PurchaseOrderStatus, Supplier,
};
use forgedesk_reservations::{JobReservation, ReservationItem};

use super::{InventoryStore, StoreTx, lock_order};
use crate::capabilities::Capabilities;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    items: BTreeMap<ItemId, InventoryItem>,
    transactions: Vec<InventoryTransaction>,
    daily_usage: BTreeMap<(ItemId, NaiveDate), i64>,
    suppliers: BTreeMap<SupplierId, Supplier>,
    orders: BTreeMap<PurchaseOrderId, PurchaseOrder>,
    order_lines: Vec<PurchaseOrderLine>,
    receipts: Vec<PurchaseOrderReceipt>,
    reservations: BTreeMap<ReservationId, JobReservation>,
    reservation_items: BTreeMap<(ReservationId, ItemId), ReservationItem>,
}

/// In-memory store.
///
/// Intended for tests/dev. One async mutex guards every table, so units of
/// work run one at a time; each edits a private copy that replaces the shared
/// tables on commit and is thrown away on rollback or drop.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    reservations: bool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            reservations: true,
        }
    }

    /// A deployment without job reservation tables.
    pub fn without_reservations() -> Self {
        Self {
            reservations: false,
            ..Self::new()
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(InMemoryTx {
            guard,
            work,
            reservations: self.reservations,
        }))
    }

    async fn migrate(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn detect_capabilities(&self) -> StoreResult<Capabilities> {
        Ok(Capabilities {
            reservations: self.reservations,
        })
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
    reservations: bool,
}

impl InMemoryTx {
    fn item_mut(&mut self, id: ItemId) -> StoreResult<&mut InventoryItem> {
        self.work
            .items
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(format!("inventory item {id} does not exist")))
    }

    fn reservation_tables(&self) -> StoreResult<()> {
        if self.reservations {
            Ok(())
        } else {
            Err(StoreError::Backend(
                "relation \"job_reservations\" does not exist".to_string(),
            ))
        }
    }

    fn active_reservation_ids(&self) -> HashSet<ReservationId> {
        self.work
            .reservations
            .values()
            .filter(|r| r.status.is_active())
            .map(|r| r.id)
            .collect()
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn lock_items(&mut self, ids: &[ItemId]) -> StoreResult<Vec<InventoryItem>> {
        Ok(lock_order(ids)
            .into_iter()
            .filter_map(|id| self.work.items.get(&id).cloned())
            .collect())
    }

    async fn items_by_id(&mut self, ids: &[ItemId]) -> StoreResult<Vec<InventoryItem>> {
        self.lock_items(ids).await
    }

    async fn find_item_by_sku(&mut self, sku: &str) -> StoreResult<Option<InventoryItem>> {
        let wanted = sku.trim();
        Ok(self
            .work
            .items
            .values()
            .find(|item| item.sku.eq_ignore_ascii_case(wanted))
            .cloned())
    }

    async fn list_items(&mut self) -> StoreResult<Vec<InventoryItem>> {
        Ok(self.work.items.values().cloned().collect())
    }

    async fn insert_item(&mut self, item: &InventoryItem) -> StoreResult<()> {
        if self.work.items.contains_key(&item.id) {
            return Err(StoreError::Conflict(format!("inventory item {} already exists", item.id)));
        }
        self.work.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update_item_details(&mut self, item: &InventoryItem) -> StoreResult<()> {
        let stored = self.item_mut(item.id)?;
        stored.apply_details(item.details());
        Ok(())
    }

    async fn set_stock(&mut self, id: ItemId, stock: i64) -> StoreResult<()> {
        if stock < 0 {
            return Err(StoreError::Constraint(format!("stock for item {id} cannot be negative")));
        }
        self.item_mut(id)?.stock = stock;
        Ok(())
    }

    async fn set_committed(&mut self, id: ItemId, committed_qty: i64) -> StoreResult<()> {
        self.item_mut(id)?.committed_qty = committed_qty;
        Ok(())
    }

    async fn set_on_order(&mut self, id: ItemId, on_order_qty: Decimal) -> StoreResult<()> {
        self.item_mut(id)?.on_order_qty = on_order_qty;
        Ok(())
    }

    async fn set_average_daily_use(&mut self, id: ItemId, average: Decimal) -> StoreResult<()> {
        self.item_mut(id)?.average_daily_use = Some(average);
        Ok(())
    }

    async fn insert_transaction(&mut self, txn: &InventoryTransaction) -> StoreResult<()> {
        self.work.transactions.push(txn.clone());
        Ok(())
    }

    async fn list_transactions(
        &mut self,
        item_id: Option<ItemId>,
    ) -> StoreResult<Vec<InventoryTransaction>> {
        Ok(self
            .work
            .transactions
            .iter()
            .rev()
            .filter(|txn| match item_id {
                Some(id) => txn.lines.iter().any(|line| line.item_id == id),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn add_daily_usage(
        &mut self,
        item_id: ItemId,
        date: NaiveDate,
        quantity: i64,
    ) -> StoreResult<()> {
        *self.work.daily_usage.entry((item_id, date)).or_insert(0) += quantity;
        Ok(())
    }

    async fn usage_totals(
        &mut self,
        ids: &[ItemId],
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<HashMap<ItemId, i64>> {
        let wanted: HashSet<&ItemId> = ids.iter().collect();
        let mut totals = HashMap::new();
        for ((item_id, date), qty) in &self.work.daily_usage {
            if wanted.contains(item_id) && *date >= from && *date <= to {
                *totals.entry(*item_id).or_insert(0) += qty;
            }
        }
        Ok(totals)
    }

    async fn first_usage_dates(
        &mut self,
        ids: &[ItemId],
        up_to: NaiveDate,
    ) -> StoreResult<HashMap<ItemId, NaiveDate>> {
        let wanted: HashSet<&ItemId> = ids.iter().collect();
        let mut firsts: HashMap<ItemId, NaiveDate> = HashMap::new();
        for (item_id, date) in self.work.daily_usage.keys() {
            if wanted.contains(item_id) && *date <= up_to {
                firsts
                    .entry(*item_id)
                    .and_modify(|first| *first = (*first).min(*date))
                    .or_insert(*date);
            }
        }
        Ok(firsts)
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        self.work.suppliers.insert(supplier.id, supplier.clone());
        Ok(())
    }

    async fn get_supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        Ok(self.work.suppliers.get(&id).cloned())
    }

    async fn list_suppliers(&mut self) -> StoreResult<Vec<Supplier>> {
        let mut suppliers: Vec<Supplier> = self.work.suppliers.values().cloned().collect();
        suppliers.sort_by_key(|s| s.name.to_lowercase());
        Ok(suppliers)
    }

    async fn insert_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        self.work.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        match self.work.orders.get_mut(&order.id) {
            Some(stored) => {
                *stored = order.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!("purchase order {} does not exist", order.id))),
        }
    }

    async fn get_order(&mut self, id: PurchaseOrderId) -> StoreResult<Option<PurchaseOrder>> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn load_order_for_update(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>> {
        self.get_order(id).await
    }

    async fn list_orders(
        &mut self,
        statuses: &[PurchaseOrderStatus],
    ) -> StoreResult<Vec<PurchaseOrder>> {
        let mut orders: Vec<PurchaseOrder> = self
            .work
            .orders
            .values()
            .filter(|o| statuses.contains(&o.status))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn order_lines(&mut self, order_id: PurchaseOrderId) -> StoreResult<Vec<PurchaseOrderLine>> {
        Ok(self
            .work
            .order_lines
            .iter()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_order_line(&mut self, line: &PurchaseOrderLine) -> StoreResult<()> {
        if !self.work.orders.contains_key(&line.order_id) {
            return Err(StoreError::Constraint(format!(
                "purchase order {} does not exist",
                line.order_id
            )));
        }
        self.work.order_lines.push(line.clone());
        Ok(())
    }

    async fn update_order_line(&mut self, line: &PurchaseOrderLine) -> StoreResult<()> {
        match self.work.order_lines.iter_mut().find(|l| l.id == line.id) {
            Some(stored) => {
                *stored = line.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "purchase order line {} does not exist",
                line.id
            ))),
        }
    }

    async fn delete_order_line(&mut self, id: PurchaseOrderLineId) -> StoreResult<()> {
        self.work.order_lines.retain(|line| line.id != id);
        Ok(())
    }

    async fn order_lines_for_items(
        &mut self,
        ids: &[ItemId],
        statuses: &[PurchaseOrderStatus],
    ) -> StoreResult<Vec<(PurchaseOrderLine, PurchaseOrderStatus)>> {
        let wanted: HashSet<&ItemId> = ids.iter().collect();
        Ok(self
            .work
            .order_lines
            .iter()
            .filter(|line| line.item_id.as_ref().is_some_and(|id| wanted.contains(id)))
            .filter_map(|line| {
                let status = self.work.orders.get(&line.order_id)?.status;
                statuses.contains(&status).then(|| (line.clone(), status))
            })
            .collect())
    }

    async fn insert_receipt(&mut self, receipt: &PurchaseOrderReceipt) -> StoreResult<()> {
        self.work.receipts.push(receipt.clone());
        Ok(())
    }

    async fn list_receipts(
        &mut self,
        order_id: PurchaseOrderId,
    ) -> StoreResult<Vec<PurchaseOrderReceipt>> {
        Ok(self
            .work
            .receipts
            .iter()
            .rev()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn upsert_reservation(&mut self, candidate: &JobReservation) -> StoreResult<JobReservation> {
        self.reservation_tables()?;
        if let Some(existing) = self
            .work
            .reservations
            .values()
            .find(|r| r.job_number == candidate.job_number)
        {
            return Ok(existing.clone());
        }
        self.work.reservations.insert(candidate.id, candidate.clone());
        Ok(candidate.clone())
    }

    async fn update_reservation(&mut self, reservation: &JobReservation) -> StoreResult<()> {
        self.reservation_tables()?;
        match self.work.reservations.get_mut(&reservation.id) {
            Some(stored) => {
                *stored = reservation.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "reservation {} does not exist",
                reservation.id
            ))),
        }
    }

    async fn get_reservation(&mut self, id: ReservationId) -> StoreResult<Option<JobReservation>> {
        self.reservation_tables()?;
        Ok(self.work.reservations.get(&id).cloned())
    }

    async fn load_reservation_for_update(
        &mut self,
        id: ReservationId,
    ) -> StoreResult<Option<JobReservation>> {
        self.get_reservation(id).await
    }

    async fn list_reservations(&mut self) -> StoreResult<Vec<JobReservation>> {
        self.reservation_tables()?;
        let mut all: Vec<JobReservation> = self.work.reservations.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn reservation_items(&mut self, id: ReservationId) -> StoreResult<Vec<ReservationItem>> {
        self.reservation_tables()?;
        Ok(self
            .work
            .reservation_items
            .values()
            .filter(|line| line.reservation_id == id)
            .cloned()
            .collect())
    }

    async fn add_reservation_item(
        &mut self,
        reservation_id: ReservationId,
        item_id: ItemId,
        requested_qty: i64,
        committed_qty: i64,
    ) -> StoreResult<ReservationItem> {
        self.reservation_tables()?;
        let line = self
            .work
            .reservation_items
            .entry((reservation_id, item_id))
            .or_insert(ReservationItem {
                reservation_id,
                item_id,
                requested_qty: 0,
                committed_qty: 0,
                consumed_qty: 0,
            });
        line.requested_qty += requested_qty;
        line.committed_qty += committed_qty;
        Ok(line.clone())
    }

    async fn update_reservation_item(&mut self, item: &ReservationItem) -> StoreResult<()> {
        self.reservation_tables()?;
        self.work
            .reservation_items
            .insert((item.reservation_id, item.item_id), item.clone());
        Ok(())
    }

    async fn active_reservation_items(&mut self) -> StoreResult<Vec<ReservationItem>> {
        self.reservation_tables()?;
        let active = self.active_reservation_ids();
        Ok(self
            .work
            .reservation_items
            .values()
            .filter(|line| active.contains(&line.reservation_id))
            .cloned()
            .collect())
    }

    async fn active_reservation_counts(
        &mut self,
        ids: &[ItemId],
    ) -> StoreResult<HashMap<ItemId, i64>> {
        self.reservation_tables()?;
        let active = self.active_reservation_ids();
        let wanted: HashSet<&ItemId> = ids.iter().collect();
        let mut counts = HashMap::new();
        for (reservation_id, item_id) in self.work.reservation_items.keys() {
            if active.contains(reservation_id) && wanted.contains(item_id) {
                *counts.entry(*item_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn count_active_reservations(&mut self) -> StoreResult<i64> {
        self.reservation_tables()?;
        Ok(self.active_reservation_ids().len() as i64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTx {
            mut guard, work, ..
        } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
