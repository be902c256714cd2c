//! Storage boundary.
//!
//! Engines never talk to a database directly. They open a unit of work with
//! [`InventoryStore::begin`], run row-level operations on the returned
//! [`StoreTx`] and finish it with [`StoreTx::commit`] or [`StoreTx::rollback`].
//!
//! ## Locking
//!
//! [`StoreTx::lock_items`] is the only way to take exclusive item-row locks.
//! Implementations always acquire them in ascending id order whatever order
//! the caller passes, so two units of work touching the same items cannot
//! deadlock against each other.
//!
//! ## Nesting
//!
//! Nested engine operations receive `&mut dyn StoreTx` explicitly. There is no
//! ambient "current transaction": whoever called `begin` owns the commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use forgedesk_core::{ItemId, PurchaseOrderId, PurchaseOrderLineId, ReservationId, SupplierId};
use forgedesk_inventory::{InventoryItem, InventoryTransaction};
use forgedesk_purchasing::{
    PurchaseOrder, PurchaseOrderLine, PurchaseOrderReceipt, PurchaseOrderStatus, Supplier,
};
use forgedesk_reservations::{JobReservation, ReservationItem};

use crate::capabilities::Capabilities;
use crate::error::StoreResult;

pub mod in_memory;
pub mod migrations;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Entry point into a storage backend.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Open a unit of work. Dropping it without committing discards its writes.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Create or upgrade the schema. Idempotent; run once at startup.
    async fn migrate(&self) -> StoreResult<()>;

    /// Report which optional subsystems this deployment carries.
    async fn detect_capabilities(&self) -> StoreResult<Capabilities>;
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        (**self).begin().await
    }

    async fn migrate(&self) -> StoreResult<()> {
        (**self).migrate().await
    }

    async fn detect_capabilities(&self) -> StoreResult<Capabilities> {
        (**self).detect_capabilities().await
    }
}

/// One open unit of work.
///
/// Every method runs inside the same backend transaction. Writes become
/// visible to other units of work only after [`StoreTx::commit`].
#[async_trait]
pub trait StoreTx: Send {
    // -- items ------------------------------------------------------------

    /// Lock item rows for update in ascending id order and return the ones that
    /// exist, in that order. Unknown ids are silently absent from the result.
    async fn lock_items(&mut self, ids: &[ItemId]) -> StoreResult<Vec<InventoryItem>>;

    /// Read items without locking them.
    async fn items_by_id(&mut self, ids: &[ItemId]) -> StoreResult<Vec<InventoryItem>>;

    /// Case-insensitive SKU lookup.
    async fn find_item_by_sku(&mut self, sku: &str) -> StoreResult<Option<InventoryItem>>;

    async fn list_items(&mut self) -> StoreResult<Vec<InventoryItem>>;

    async fn insert_item(&mut self, item: &InventoryItem) -> StoreResult<()>;

    /// Persist descriptive and planning fields. Quantities and caches are untouched.
    async fn update_item_details(&mut self, item: &InventoryItem) -> StoreResult<()>;

    async fn set_stock(&mut self, id: ItemId, stock: i64) -> StoreResult<()>;

    async fn set_committed(&mut self, id: ItemId, committed_qty: i64) -> StoreResult<()>;

    async fn set_on_order(&mut self, id: ItemId, on_order_qty: Decimal) -> StoreResult<()>;

    async fn set_average_daily_use(&mut self, id: ItemId, average: Decimal) -> StoreResult<()>;

    // -- ledger and usage -------------------------------------------------

    /// Append a transaction header and its lines.
    async fn insert_transaction(&mut self, txn: &InventoryTransaction) -> StoreResult<()>;

    /// Transactions touching `item_id` (or all of them), newest first.
    async fn list_transactions(
        &mut self,
        item_id: Option<ItemId>,
    ) -> StoreResult<Vec<InventoryTransaction>>;

    /// Add `quantity` to the item's usage total for `date`.
    async fn add_daily_usage(
        &mut self,
        item_id: ItemId,
        date: NaiveDate,
        quantity: i64,
    ) -> StoreResult<()>;

    /// Total usage per item over `from..=to`.
    async fn usage_totals(
        &mut self,
        ids: &[ItemId],
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<HashMap<ItemId, i64>>;

    /// Earliest usage day per item, on or before `up_to`.
    async fn first_usage_dates(
        &mut self,
        ids: &[ItemId],
        up_to: NaiveDate,
    ) -> StoreResult<HashMap<ItemId, NaiveDate>>;

    // -- suppliers --------------------------------------------------------

    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()>;

    async fn get_supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>>;

    async fn list_suppliers(&mut self) -> StoreResult<Vec<Supplier>>;

    // -- purchase orders --------------------------------------------------

    async fn insert_order(&mut self, order: &PurchaseOrder) -> StoreResult<()>;

    async fn update_order(&mut self, order: &PurchaseOrder) -> StoreResult<()>;

    async fn get_order(&mut self, id: PurchaseOrderId) -> StoreResult<Option<PurchaseOrder>>;

    /// Read the order header and lock it against concurrent receipts and edits.
    async fn load_order_for_update(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>>;

    async fn list_orders(
        &mut self,
        statuses: &[PurchaseOrderStatus],
    ) -> StoreResult<Vec<PurchaseOrder>>;

    async fn order_lines(&mut self, order_id: PurchaseOrderId) -> StoreResult<Vec<PurchaseOrderLine>>;

    async fn insert_order_line(&mut self, line: &PurchaseOrderLine) -> StoreResult<()>;

    async fn update_order_line(&mut self, line: &PurchaseOrderLine) -> StoreResult<()>;

    async fn delete_order_line(&mut self, id: PurchaseOrderLineId) -> StoreResult<()>;

    /// Lines referencing `ids` on orders whose status is in `statuses`,
    /// paired with that status.
    async fn order_lines_for_items(
        &mut self,
        ids: &[ItemId],
        statuses: &[PurchaseOrderStatus],
    ) -> StoreResult<Vec<(PurchaseOrderLine, PurchaseOrderStatus)>>;

    async fn insert_receipt(&mut self, receipt: &PurchaseOrderReceipt) -> StoreResult<()>;

    /// Receipts for an order, newest first.
    async fn list_receipts(
        &mut self,
        order_id: PurchaseOrderId,
    ) -> StoreResult<Vec<PurchaseOrderReceipt>>;

    // -- reservations -----------------------------------------------------

    /// Insert `candidate` unless its job number is taken, then return the stored
    /// reservation for that job number, locked for update.
    ///
    /// The returned id differs from `candidate.id` when the job already existed.
    async fn upsert_reservation(&mut self, candidate: &JobReservation) -> StoreResult<JobReservation>;

    async fn update_reservation(&mut self, reservation: &JobReservation) -> StoreResult<()>;

    async fn get_reservation(&mut self, id: ReservationId) -> StoreResult<Option<JobReservation>>;

    async fn load_reservation_for_update(
        &mut self,
        id: ReservationId,
    ) -> StoreResult<Option<JobReservation>>;

    async fn list_reservations(&mut self) -> StoreResult<Vec<JobReservation>>;

    async fn reservation_items(&mut self, id: ReservationId) -> StoreResult<Vec<ReservationItem>>;

    /// Additive upsert: an existing (reservation, item) row grows by the given
    /// quantities instead of being replaced. Returns the resulting row.
    async fn add_reservation_item(
        &mut self,
        reservation_id: ReservationId,
        item_id: ItemId,
        requested_qty: i64,
        committed_qty: i64,
    ) -> StoreResult<ReservationItem>;

    async fn update_reservation_item(&mut self, item: &ReservationItem) -> StoreResult<()>;

    /// Reservation items whose reservation is in an active status.
    async fn active_reservation_items(&mut self) -> StoreResult<Vec<ReservationItem>>;

    /// Number of active reservations with at least one line per item.
    async fn active_reservation_counts(
        &mut self,
        ids: &[ItemId],
    ) -> StoreResult<HashMap<ItemId, i64>>;

    async fn count_active_reservations(&mut self) -> StoreResult<i64>;

    // -- lifecycle --------------------------------------------------------

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Sort and dedupe ids into canonical lock order.
pub(crate) fn lock_order(ids: &[ItemId]) -> Vec<ItemId> {
    let mut ordered = ids.to_vec();
    ordered.sort();
    ordered.dedup();
    ordered
}
