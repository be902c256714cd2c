//! Postgres-backed store.
//!
//! Each unit of work is one SQLx transaction. Item rows are locked with
//! `SELECT ... ORDER BY id FOR UPDATE`, which takes the locks in ascending id
//! order. Daily usage, reservations and reservation items are written with
//! `INSERT ... ON CONFLICT` so concurrent writers merge instead of failing.
//!
//! ## Error Mapping
//!
//! SQLx errors go through [`map_sqlx_error`]: a unique violation (`23505`)
//! becomes `StoreError::Conflict`, foreign key and check violations become
//! `StoreError::Constraint`, pool and IO failures `StoreError::Unavailable`.
//! Stored text that no longer parses into its enum is `StoreError::Decode`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use forgedesk_core::{
    ItemId, PurchaseOrderId, PurchaseOrderLineId, ReceiptId, ReservationId, SupplierId,
    TransactionId,
};
use forgedesk_inventory::{Finish, InventoryItem, InventoryTransaction, PurchaseUom, TransactionLine};
use forgedesk_purchasing::{
    PurchaseOrder, PurchaseOrderLine, PurchaseOrderReceipt, PurchaseOrderStatus, ReceiptLine,
    Supplier,
};
use forgedesk_reservations::{JobReservation, ReservationItem, ReservationStatus};

use super::migrations::{CORE_SCHEMA, RESERVATION_SCHEMA, RESERVATION_TABLES};
use super::{InventoryStore, StoreTx, lock_order};
use crate::capabilities::Capabilities;
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const ITEM_COLUMNS: &str = "id, name, part_number, finish, sku, location, stock, committed_qty, \
     discontinued, supplier_id, supplier_name, supplier_contact, reorder_point, lead_time_days, \
     average_daily_use, safety_stock, min_order_qty, order_multiple, pack_size, purchase_uom, \
     on_order_qty, created_at";

const ORDER_COLUMNS: &str = "id, order_number, supplier_id, status, order_date, expected_date, \
     total_cost, notes, created_at, updated_at";

const LINE_COLUMNS: &str = "l.id, l.order_id, l.item_id, l.supplier_sku, l.description, \
     l.quantity_ordered, l.quantity_received, l.unit_cost, l.expected_date";

const RESERVATION_COLUMNS: &str = "id, job_number, job_name, requested_by, needed_by, notes, \
     status, created_at, updated_at";

const SUPPLIER_COLUMNS: &str = "id, name, contact_name, contact_email, contact_phone, \
     default_lead_time_days, notes, created_at";

/// Postgres-backed inventory store.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool which is thread-safe (Arc + Send + Sync).
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }

    #[instrument(skip(self), err)]
    async fn migrate(&self) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        for sql in CORE_SCHEMA.iter().chain(RESERVATION_SCHEMA) {
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        tx.commit().await.map_err(|e| map_sqlx_error("migrate", e))?;
        tracing::info!(
            statements = CORE_SCHEMA.len() + RESERVATION_SCHEMA.len(),
            "schema migrated"
        );
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn detect_capabilities(&self) -> StoreResult<Capabilities> {
        let mut reservations = true;
        for table in RESERVATION_TABLES {
            let present: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
                .bind(format!("public.{table}"))
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("detect_capabilities", e))?;
            reservations &= present;
        }
        Ok(Capabilities { reservations })
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

fn uuids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

fn status_texts<T, F: Fn(&T) -> &'static str>(statuses: &[T], as_str: F) -> Vec<String> {
    statuses.iter().map(|s| as_str(s).to_string()).collect()
}

fn decode<T, E: std::fmt::Display>(what: &str, result: Result<T, E>) -> StoreResult<T> {
    result.map_err(|e| StoreError::Decode(format!("{what}: {e}")))
}

#[async_trait]
impl StoreTx for PostgresTx {
    #[instrument(skip(self), fields(count = ids.len()), err)]
    async fn lock_items(&mut self, ids: &[ItemId]) -> StoreResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        );
        let rows: Vec<ItemRow> = sqlx::query_as(&sql)
            .bind(uuids(&lock_order(ids)))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_items", e))?;
        rows.into_iter().map(InventoryItem::try_from).collect()
    }

    async fn items_by_id(&mut self, ids: &[ItemId]) -> StoreResult<Vec<InventoryItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ANY($1) ORDER BY id");
        let rows: Vec<ItemRow> = sqlx::query_as(&sql)
            .bind(uuids(ids))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("items_by_id", e))?;
        rows.into_iter().map(InventoryItem::try_from).collect()
    }

    async fn find_item_by_sku(&mut self, sku: &str) -> StoreResult<Option<InventoryItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE upper(sku) = upper($1)");
        let row: Option<ItemRow> = sqlx::query_as(&sql)
            .bind(sku.trim())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_item_by_sku", e))?;
        row.map(InventoryItem::try_from).transpose()
    }

    async fn list_items(&mut self) -> StoreResult<Vec<InventoryItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items ORDER BY id");
        let rows: Vec<ItemRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        rows.into_iter().map(InventoryItem::try_from).collect()
    }

    #[instrument(skip(self, item), fields(item_id = %item.id, sku = %item.sku), err)]
    async fn insert_item(&mut self, item: &InventoryItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, name, part_number, finish, sku, location, stock, committed_qty,
                discontinued, supplier_id, supplier_name, supplier_contact, reorder_point,
                lead_time_days, average_daily_use, safety_stock, min_order_qty, order_multiple,
                pack_size, purchase_uom, on_order_qty, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.part_number)
        .bind(item.finish.map(|f| f.code()))
        .bind(&item.sku)
        .bind(&item.location)
        .bind(item.stock)
        .bind(item.committed_qty)
        .bind(item.discontinued)
        .bind(item.supplier_id.map(Uuid::from))
        .bind(&item.supplier_name)
        .bind(&item.supplier_contact)
        .bind(item.reorder_point)
        .bind(item.lead_time_days)
        .bind(item.average_daily_use)
        .bind(item.safety_stock)
        .bind(item.min_order_qty)
        .bind(item.order_multiple)
        .bind(item.pack_size)
        .bind(item.purchase_uom.as_str())
        .bind(item.on_order_qty)
        .bind(item.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(())
    }

    async fn update_item_details(&mut self, item: &InventoryItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE inventory_items SET
                name = $2, part_number = $3, finish = $4, sku = $5, location = $6,
                discontinued = $7, supplier_id = $8, supplier_name = $9, supplier_contact = $10,
                reorder_point = $11, lead_time_days = $12, safety_stock = $13,
                min_order_qty = $14, order_multiple = $15, pack_size = $16, purchase_uom = $17
            WHERE id = $1
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.part_number)
        .bind(item.finish.map(|f| f.code()))
        .bind(&item.sku)
        .bind(&item.location)
        .bind(item.discontinued)
        .bind(item.supplier_id.map(Uuid::from))
        .bind(&item.supplier_name)
        .bind(&item.supplier_contact)
        .bind(item.reorder_point)
        .bind(item.lead_time_days)
        .bind(item.safety_stock)
        .bind(item.min_order_qty)
        .bind(item.order_multiple)
        .bind(item.pack_size)
        .bind(item.purchase_uom.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_item_details", e))?;
        Ok(())
    }

    async fn set_stock(&mut self, id: ItemId, stock: i64) -> StoreResult<()> {
        sqlx::query("UPDATE inventory_items SET stock = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(stock)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_stock", e))?;
        Ok(())
    }

    async fn set_committed(&mut self, id: ItemId, committed_qty: i64) -> StoreResult<()> {
        sqlx::query("UPDATE inventory_items SET committed_qty = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(committed_qty)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_committed", e))?;
        Ok(())
    }

    async fn set_on_order(&mut self, id: ItemId, on_order_qty: Decimal) -> StoreResult<()> {
        sqlx::query("UPDATE inventory_items SET on_order_qty = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(on_order_qty)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_on_order", e))?;
        Ok(())
    }

    async fn set_average_daily_use(&mut self, id: ItemId, average: Decimal) -> StoreResult<()> {
        sqlx::query("UPDATE inventory_items SET average_daily_use = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(average)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_average_daily_use", e))?;
        Ok(())
    }

    #[instrument(skip(self, txn), fields(transaction_id = %txn.id, lines = txn.lines.len()), err)]
    async fn insert_transaction(&mut self, txn: &InventoryTransaction) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO inventory_transactions (id, reference, notes, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(txn.id.as_uuid())
        .bind(&txn.reference)
        .bind(&txn.notes)
        .bind(txn.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_transaction", e))?;

        for line in &txn.lines {
            sqlx::query(
                r#"
                INSERT INTO inventory_transaction_lines
                    (transaction_id, item_id, quantity_change, stock_before, stock_after, note)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(txn.id.as_uuid())
            .bind(line.item_id.as_uuid())
            .bind(line.quantity_change)
            .bind(line.stock_before)
            .bind(line.stock_after)
            .bind(&line.note)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_transaction_line", e))?;
        }
        Ok(())
    }

    async fn list_transactions(
        &mut self,
        item_id: Option<ItemId>,
    ) -> StoreResult<Vec<InventoryTransaction>> {
        let headers = sqlx::query(
            r#"
            SELECT id, reference, notes, created_at
            FROM inventory_transactions
            WHERE $1::uuid IS NULL
               OR id IN (SELECT transaction_id FROM inventory_transaction_lines WHERE item_id = $1)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(item_id.map(Uuid::from))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_transactions", e))?;

        let mut transactions = Vec::with_capacity(headers.len());
        for row in &headers {
            transactions.push(InventoryTransaction {
                id: TransactionId::from_uuid(decode("id", row.try_get("id"))?),
                reference: decode("reference", row.try_get("reference"))?,
                notes: decode("notes", row.try_get("notes"))?,
                created_at: decode("created_at", row.try_get("created_at"))?,
                lines: Vec::new(),
            });
        }
        let ids: Vec<Uuid> = transactions.iter().map(|t| Uuid::from(t.id)).collect();

        let lines = sqlx::query(
            r#"
            SELECT transaction_id, item_id, quantity_change, stock_before, stock_after, note
            FROM inventory_transaction_lines
            WHERE transaction_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_transaction_lines", e))?;

        let mut by_txn: HashMap<Uuid, Vec<TransactionLine>> = HashMap::new();
        for row in &lines {
            let txn_id: Uuid = decode("transaction_id", row.try_get("transaction_id"))?;
            by_txn.entry(txn_id).or_default().push(TransactionLine {
                item_id: ItemId::from_uuid(decode("item_id", row.try_get("item_id"))?),
                quantity_change: decode("quantity_change", row.try_get("quantity_change"))?,
                stock_before: decode("stock_before", row.try_get("stock_before"))?,
                stock_after: decode("stock_after", row.try_get("stock_after"))?,
                note: decode("note", row.try_get("note"))?,
            });
        }
        for txn in &mut transactions {
            txn.lines = by_txn.remove(txn.id.as_uuid()).unwrap_or_default();
        }
        Ok(transactions)
    }

    async fn add_daily_usage(
        &mut self,
        item_id: ItemId,
        date: NaiveDate,
        quantity: i64,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_daily_usage (item_id, usage_date, quantity_used)
            VALUES ($1, $2, $3)
            ON CONFLICT (item_id, usage_date)
            DO UPDATE SET quantity_used = inventory_daily_usage.quantity_used + EXCLUDED.quantity_used
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(date)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("add_daily_usage", e))?;
        Ok(())
    }

    async fn usage_totals(
        &mut self,
        ids: &[ItemId],
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<HashMap<ItemId, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, SUM(quantity_used)::BIGINT AS total
            FROM inventory_daily_usage
            WHERE item_id = ANY($1) AND usage_date BETWEEN $2 AND $3
            GROUP BY item_id
            "#,
        )
        .bind(uuids(ids))
        .bind(from)
        .bind(to)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("usage_totals", e))?;

        let mut totals = HashMap::with_capacity(rows.len());
        for row in &rows {
            totals.insert(
                ItemId::from_uuid(decode("item_id", row.try_get("item_id"))?),
                decode("total", row.try_get("total"))?,
            );
        }
        Ok(totals)
    }

    async fn first_usage_dates(
        &mut self,
        ids: &[ItemId],
        up_to: NaiveDate,
    ) -> StoreResult<HashMap<ItemId, NaiveDate>> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, MIN(usage_date) AS first_day
            FROM inventory_daily_usage
            WHERE item_id = ANY($1) AND usage_date <= $2
            GROUP BY item_id
            "#,
        )
        .bind(uuids(ids))
        .bind(up_to)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("first_usage_dates", e))?;

        let mut firsts = HashMap::with_capacity(rows.len());
        for row in &rows {
            firsts.insert(
                ItemId::from_uuid(decode("item_id", row.try_get("item_id"))?),
                decode("first_day", row.try_get("first_day"))?,
            );
        }
        Ok(firsts)
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, contact_name, contact_email, contact_phone,
                                   default_lead_time_days, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(supplier.id.as_uuid())
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.contact_email)
        .bind(&supplier.contact_phone)
        .bind(supplier.default_lead_time_days)
        .bind(&supplier.notes)
        .bind(supplier.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_supplier", e))?;
        Ok(())
    }

    async fn get_supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1");
        let row: Option<SupplierRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_supplier", e))?;
        Ok(row.map(Supplier::from))
    }

    async fn list_suppliers(&mut self) -> StoreResult<Vec<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY lower(name), id");
        let rows: Vec<SupplierRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_suppliers", e))?;
        Ok(rows.into_iter().map(Supplier::from).collect())
    }

    #[instrument(skip(self, order), fields(order_id = %order.id), err)]
    async fn insert_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_orders (id, order_number, supplier_id, status, order_date,
                                         expected_date, total_cost, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.supplier_id.map(Uuid::from))
        .bind(order.status.as_str())
        .bind(order.order_date)
        .bind(order.expected_date)
        .bind(order.total_cost)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    async fn update_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE purchase_orders SET
                order_number = $2, supplier_id = $3, status = $4, order_date = $5,
                expected_date = $6, total_cost = $7, notes = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.supplier_id.map(Uuid::from))
        .bind(order.status.as_str())
        .bind(order.order_date)
        .bind(order.expected_date)
        .bind(order.total_cost)
        .bind(&order.notes)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;
        Ok(())
    }

    async fn get_order(&mut self, id: PurchaseOrderId) -> StoreResult<Option<PurchaseOrder>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = $1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        row.map(PurchaseOrder::try_from).transpose()
    }

    async fn load_order_for_update(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = $1 FOR UPDATE");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("load_order_for_update", e))?;
        row.map(PurchaseOrder::try_from).transpose()
    }

    async fn list_orders(
        &mut self,
        statuses: &[PurchaseOrderStatus],
    ) -> StoreResult<Vec<PurchaseOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE status = ANY($1) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(status_texts(statuses, PurchaseOrderStatus::as_str))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;
        rows.into_iter().map(PurchaseOrder::try_from).collect()
    }

    async fn order_lines(&mut self, order_id: PurchaseOrderId) -> StoreResult<Vec<PurchaseOrderLine>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS}, NULL::TEXT AS order_status FROM purchase_order_lines l \
             WHERE l.order_id = $1 ORDER BY l.id"
        );
        let rows: Vec<LineRow> = sqlx::query_as(&sql)
            .bind(order_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("order_lines", e))?;
        Ok(rows.into_iter().map(|row| row.line).collect())
    }

    async fn insert_order_line(&mut self, line: &PurchaseOrderLine) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_order_lines (id, order_id, item_id, supplier_sku, description,
                quantity_ordered, quantity_received, unit_cost, expected_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.order_id.as_uuid())
        .bind(line.item_id.map(Uuid::from))
        .bind(&line.supplier_sku)
        .bind(&line.description)
        .bind(line.quantity_ordered)
        .bind(line.quantity_received)
        .bind(line.unit_cost)
        .bind(line.expected_date)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order_line", e))?;
        Ok(())
    }

    async fn update_order_line(&mut self, line: &PurchaseOrderLine) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE purchase_order_lines SET
                item_id = $2, supplier_sku = $3, description = $4, quantity_ordered = $5,
                quantity_received = $6, unit_cost = $7, expected_date = $8
            WHERE id = $1
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.item_id.map(Uuid::from))
        .bind(&line.supplier_sku)
        .bind(&line.description)
        .bind(line.quantity_ordered)
        .bind(line.quantity_received)
        .bind(line.unit_cost)
        .bind(line.expected_date)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_order_line", e))?;
        Ok(())
    }

    async fn delete_order_line(&mut self, id: PurchaseOrderLineId) -> StoreResult<()> {
        sqlx::query("DELETE FROM purchase_order_lines WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order_line", e))?;
        Ok(())
    }

    async fn order_lines_for_items(
        &mut self,
        ids: &[ItemId],
        statuses: &[PurchaseOrderStatus],
    ) -> StoreResult<Vec<(PurchaseOrderLine, PurchaseOrderStatus)>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS}, o.status AS order_status FROM purchase_order_lines l \
             JOIN purchase_orders o ON o.id = l.order_id \
             WHERE l.item_id = ANY($1) AND o.status = ANY($2)"
        );
        let rows: Vec<LineRow> = sqlx::query_as(&sql)
            .bind(uuids(ids))
            .bind(status_texts(statuses, PurchaseOrderStatus::as_str))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("order_lines_for_items", e))?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let raw = row.order_status.unwrap_or_default();
            let status: PurchaseOrderStatus = decode("order status", raw.parse())?;
            lines.push((row.line, status));
        }
        Ok(lines)
    }

    #[instrument(skip(self, receipt), fields(receipt_id = %receipt.id, order_id = %receipt.order_id), err)]
    async fn insert_receipt(&mut self, receipt: &PurchaseOrderReceipt) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_order_receipts (id, order_id, transaction_id, reference, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(receipt.id.as_uuid())
        .bind(receipt.order_id.as_uuid())
        .bind(receipt.transaction_id.map(Uuid::from))
        .bind(&receipt.reference)
        .bind(&receipt.notes)
        .bind(receipt.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_receipt", e))?;

        for line in &receipt.lines {
            sqlx::query(
                "INSERT INTO purchase_order_receipt_lines (receipt_id, line_id, quantity_received) \
                 VALUES ($1, $2, $3)",
            )
            .bind(receipt.id.as_uuid())
            .bind(line.line_id.as_uuid())
            .bind(line.quantity_received)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_receipt_line", e))?;
        }
        Ok(())
    }

    async fn list_receipts(
        &mut self,
        order_id: PurchaseOrderId,
    ) -> StoreResult<Vec<PurchaseOrderReceipt>> {
        let headers = sqlx::query(
            r#"
            SELECT id, order_id, transaction_id, reference, notes, created_at
            FROM purchase_order_receipts
            WHERE order_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_receipts", e))?;

        let mut receipts = Vec::with_capacity(headers.len());
        for row in &headers {
            let transaction_id: Option<Uuid> = decode("transaction_id", row.try_get("transaction_id"))?;
            receipts.push(PurchaseOrderReceipt {
                id: ReceiptId::from_uuid(decode("id", row.try_get("id"))?),
                order_id,
                transaction_id: transaction_id.map(TransactionId::from_uuid),
                reference: decode("reference", row.try_get("reference"))?,
                notes: decode("notes", row.try_get("notes"))?,
                created_at: decode("created_at", row.try_get("created_at"))?,
                lines: Vec::new(),
            });
        }

        let ids: Vec<Uuid> = receipts.iter().map(|r| Uuid::from(r.id)).collect();
        let rows = sqlx::query(
            r#"
            SELECT receipt_id, line_id, quantity_received
            FROM purchase_order_receipt_lines
            WHERE receipt_id = ANY($1)
            ORDER BY line_id
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_receipt_lines", e))?;

        let mut by_receipt: HashMap<Uuid, Vec<ReceiptLine>> = HashMap::new();
        for row in &rows {
            let receipt_id: Uuid = decode("receipt_id", row.try_get("receipt_id"))?;
            by_receipt.entry(receipt_id).or_default().push(ReceiptLine {
                line_id: PurchaseOrderLineId::from_uuid(decode("line_id", row.try_get("line_id"))?),
                quantity_received: decode("quantity_received", row.try_get("quantity_received"))?,
            });
        }
        for receipt in &mut receipts {
            receipt.lines = by_receipt.remove(receipt.id.as_uuid()).unwrap_or_default();
        }
        Ok(receipts)
    }

    #[instrument(skip(self, candidate), fields(job_number = %candidate.job_number), err)]
    async fn upsert_reservation(&mut self, candidate: &JobReservation) -> StoreResult<JobReservation> {
        sqlx::query(
            r#"
            INSERT INTO job_reservations (id, job_number, job_name, requested_by, needed_by,
                                          notes, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (job_number) DO NOTHING
            "#,
        )
        .bind(candidate.id.as_uuid())
        .bind(&candidate.job_number)
        .bind(&candidate.job_name)
        .bind(&candidate.requested_by)
        .bind(candidate.needed_by)
        .bind(&candidate.notes)
        .bind(candidate.status.as_str())
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_reservation", e))?;

        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM job_reservations WHERE job_number = $1 FOR UPDATE"
        );
        let row: ReservationRow = sqlx::query_as(&sql)
            .bind(&candidate.job_number)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("upsert_reservation", e))?;
        JobReservation::try_from(row)
    }

    async fn update_reservation(&mut self, reservation: &JobReservation) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE job_reservations SET
                job_name = $2, requested_by = $3, needed_by = $4, notes = $5, status = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(reservation.id.as_uuid())
        .bind(&reservation.job_name)
        .bind(&reservation.requested_by)
        .bind(reservation.needed_by)
        .bind(&reservation.notes)
        .bind(reservation.status.as_str())
        .bind(reservation.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_reservation", e))?;
        Ok(())
    }

    async fn get_reservation(&mut self, id: ReservationId) -> StoreResult<Option<JobReservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM job_reservations WHERE id = $1");
        let row: Option<ReservationRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_reservation", e))?;
        row.map(JobReservation::try_from).transpose()
    }

    async fn load_reservation_for_update(
        &mut self,
        id: ReservationId,
    ) -> StoreResult<Option<JobReservation>> {
        let sql =
            format!("SELECT {RESERVATION_COLUMNS} FROM job_reservations WHERE id = $1 FOR UPDATE");
        let row: Option<ReservationRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("load_reservation_for_update", e))?;
        row.map(JobReservation::try_from).transpose()
    }

    async fn list_reservations(&mut self) -> StoreResult<Vec<JobReservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM job_reservations ORDER BY created_at DESC, id DESC"
        );
        let rows: Vec<ReservationRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_reservations", e))?;
        rows.into_iter().map(JobReservation::try_from).collect()
    }

    async fn reservation_items(&mut self, id: ReservationId) -> StoreResult<Vec<ReservationItem>> {
        let rows: Vec<ReservationItemRow> = sqlx::query_as(
            r#"
            SELECT reservation_id, item_id, requested_qty, committed_qty, consumed_qty
            FROM job_reservation_items
            WHERE reservation_id = $1
            ORDER BY item_id
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("reservation_items", e))?;
        Ok(rows.into_iter().map(ReservationItem::from).collect())
    }

    async fn add_reservation_item(
        &mut self,
        reservation_id: ReservationId,
        item_id: ItemId,
        requested_qty: i64,
        committed_qty: i64,
    ) -> StoreResult<ReservationItem> {
        let row: ReservationItemRow = sqlx::query_as(
            r#"
            INSERT INTO job_reservation_items
                (reservation_id, item_id, requested_qty, committed_qty, consumed_qty)
            VALUES ($1, $2, $3, $4, 0)
            ON CONFLICT (reservation_id, item_id) DO UPDATE SET
                requested_qty = job_reservation_items.requested_qty + EXCLUDED.requested_qty,
                committed_qty = job_reservation_items.committed_qty + EXCLUDED.committed_qty
            RETURNING reservation_id, item_id, requested_qty, committed_qty, consumed_qty
            "#,
        )
        .bind(reservation_id.as_uuid())
        .bind(item_id.as_uuid())
        .bind(requested_qty)
        .bind(committed_qty)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("add_reservation_item", e))?;
        Ok(row.into())
    }

    async fn update_reservation_item(&mut self, item: &ReservationItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE job_reservation_items SET
                requested_qty = $3, committed_qty = $4, consumed_qty = $5
            WHERE reservation_id = $1 AND item_id = $2
            "#,
        )
        .bind(item.reservation_id.as_uuid())
        .bind(item.item_id.as_uuid())
        .bind(item.requested_qty)
        .bind(item.committed_qty)
        .bind(item.consumed_qty)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_reservation_item", e))?;
        Ok(())
    }

    async fn active_reservation_items(&mut self) -> StoreResult<Vec<ReservationItem>> {
        let rows: Vec<ReservationItemRow> = sqlx::query_as(
            r#"
            SELECT i.reservation_id, i.item_id, i.requested_qty, i.committed_qty, i.consumed_qty
            FROM job_reservation_items i
            JOIN job_reservations r ON r.id = i.reservation_id
            WHERE r.status = ANY($1)
            "#,
        )
        .bind(status_texts(&ReservationStatus::ACTIVE, ReservationStatus::as_str))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("active_reservation_items", e))?;
        Ok(rows.into_iter().map(ReservationItem::from).collect())
    }

    async fn active_reservation_counts(
        &mut self,
        ids: &[ItemId],
    ) -> StoreResult<HashMap<ItemId, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT i.item_id, COUNT(DISTINCT i.reservation_id) AS reservations
            FROM job_reservation_items i
            JOIN job_reservations r ON r.id = i.reservation_id
            WHERE i.item_id = ANY($1) AND r.status = ANY($2)
            GROUP BY i.item_id
            "#,
        )
        .bind(uuids(ids))
        .bind(status_texts(&ReservationStatus::ACTIVE, ReservationStatus::as_str))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("active_reservation_counts", e))?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in &rows {
            counts.insert(
                ItemId::from_uuid(decode("item_id", row.try_get("item_id"))?),
                decode("reservations", row.try_get("reservations"))?,
            );
        }
        Ok(counts)
    }

    async fn count_active_reservations(&mut self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM job_reservations WHERE status = ANY($1)")
            .bind(status_texts(&ReservationStatus::ACTIVE, ReservationStatus::as_str))
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_active_reservations", e))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
    }
}

// SQLx row types

#[derive(Debug)]
struct ItemRow {
    id: Uuid,
    name: String,
    part_number: String,
    finish: Option<String>,
    sku: String,
    location: String,
    stock: i64,
    committed_qty: i64,
    discontinued: bool,
    supplier_id: Option<Uuid>,
    supplier_name: String,
    supplier_contact: Option<String>,
    reorder_point: i64,
    lead_time_days: i32,
    average_daily_use: Option<Decimal>,
    safety_stock: Decimal,
    min_order_qty: Decimal,
    order_multiple: Decimal,
    pack_size: Decimal,
    purchase_uom: String,
    on_order_qty: Decimal,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            part_number: row.try_get("part_number")?,
            finish: row.try_get("finish")?,
            sku: row.try_get("sku")?,
            location: row.try_get("location")?,
            stock: row.try_get("stock")?,
            committed_qty: row.try_get("committed_qty")?,
            discontinued: row.try_get("discontinued")?,
            supplier_id: row.try_get("supplier_id")?,
            supplier_name: row.try_get("supplier_name")?,
            supplier_contact: row.try_get("supplier_contact")?,
            reorder_point: row.try_get("reorder_point")?,
            lead_time_days: row.try_get("lead_time_days")?,
            average_daily_use: row.try_get("average_daily_use")?,
            safety_stock: row.try_get("safety_stock")?,
            min_order_qty: row.try_get("min_order_qty")?,
            order_multiple: row.try_get("order_multiple")?,
            pack_size: row.try_get("pack_size")?,
            purchase_uom: row.try_get("purchase_uom")?,
            on_order_qty: row.try_get("on_order_qty")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<ItemRow> for InventoryItem {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let finish = match row.finish.as_deref() {
            None | Some("") => None,
            Some(code) => Some(decode("finish", code.parse::<Finish>())?),
        };
        Ok(InventoryItem {
            id: ItemId::from_uuid(row.id),
            name: row.name,
            part_number: row.part_number,
            finish,
            sku: row.sku,
            location: row.location,
            stock: row.stock,
            committed_qty: row.committed_qty,
            discontinued: row.discontinued,
            supplier_id: row.supplier_id.map(SupplierId::from_uuid),
            supplier_name: row.supplier_name,
            supplier_contact: row.supplier_contact,
            reorder_point: row.reorder_point,
            lead_time_days: row.lead_time_days,
            average_daily_use: row.average_daily_use,
            safety_stock: row.safety_stock,
            min_order_qty: row.min_order_qty,
            order_multiple: row.order_multiple,
            pack_size: row.pack_size,
            purchase_uom: decode("purchase_uom", row.purchase_uom.parse::<PurchaseUom>())?,
            on_order_qty: row.on_order_qty,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct SupplierRow {
    id: Uuid,
    name: String,
    contact_name: Option<String>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    default_lead_time_days: i32,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for SupplierRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SupplierRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            contact_name: row.try_get("contact_name")?,
            contact_email: row.try_get("contact_email")?,
            contact_phone: row.try_get("contact_phone")?,
            default_lead_time_days: row.try_get("default_lead_time_days")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: SupplierId::from_uuid(row.id),
            name: row.name,
            contact_name: row.contact_name,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            default_lead_time_days: row.default_lead_time_days,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct OrderRow {
    id: Uuid,
    order_number: Option<String>,
    supplier_id: Option<Uuid>,
    status: String,
    order_date: Option<NaiveDate>,
    expected_date: Option<NaiveDate>,
    total_cost: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            supplier_id: row.try_get("supplier_id")?,
            status: row.try_get("status")?,
            order_date: row.try_get("order_date")?,
            expected_date: row.try_get("expected_date")?,
            total_cost: row.try_get("total_cost")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<OrderRow> for PurchaseOrder {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(PurchaseOrder {
            id: PurchaseOrderId::from_uuid(row.id),
            order_number: row.order_number,
            supplier_id: row.supplier_id.map(SupplierId::from_uuid),
            status: decode("order status", row.status.parse::<PurchaseOrderStatus>())?,
            order_date: row.order_date,
            expected_date: row.expected_date,
            total_cost: row.total_cost,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug)]
struct LineRow {
    line: PurchaseOrderLine,
    order_status: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for LineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let item_id: Option<Uuid> = row.try_get("item_id")?;
        Ok(LineRow {
            line: PurchaseOrderLine {
                id: PurchaseOrderLineId::from_uuid(row.try_get("id")?),
                order_id: PurchaseOrderId::from_uuid(row.try_get("order_id")?),
                item_id: item_id.map(ItemId::from_uuid),
                supplier_sku: row.try_get("supplier_sku")?,
                description: row.try_get("description")?,
                quantity_ordered: row.try_get("quantity_ordered")?,
                quantity_received: row.try_get("quantity_received")?,
                unit_cost: row.try_get("unit_cost")?,
                expected_date: row.try_get("expected_date")?,
            },
            order_status: row.try_get("order_status")?,
        })
    }
}

#[derive(Debug)]
struct ReservationRow {
    id: Uuid,
    job_number: String,
    job_name: String,
    requested_by: String,
    needed_by: Option<NaiveDate>,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ReservationRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ReservationRow {
            id: row.try_get("id")?,
            job_number: row.try_get("job_number")?,
            job_name: row.try_get("job_name")?,
            requested_by: row.try_get("requested_by")?,
            needed_by: row.try_get("needed_by")?,
            notes: row.try_get("notes")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<ReservationRow> for JobReservation {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(JobReservation {
            id: ReservationId::from_uuid(row.id),
            job_number: row.job_number,
            job_name: row.job_name,
            requested_by: row.requested_by,
            needed_by: row.needed_by,
            notes: row.notes,
            status: decode("reservation status", row.status.parse::<ReservationStatus>())?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug)]
struct ReservationItemRow {
    reservation_id: Uuid,
    item_id: Uuid,
    requested_qty: i64,
    committed_qty: i64,
    consumed_qty: i64,
}

impl<'r> FromRow<'r, PgRow> for ReservationItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ReservationItemRow {
            reservation_id: row.try_get("reservation_id")?,
            item_id: row.try_get("item_id")?,
            requested_qty: row.try_get("requested_qty")?,
            committed_qty: row.try_get("committed_qty")?,
            consumed_qty: row.try_get("consumed_qty")?,
        })
    }
}

impl From<ReservationItemRow> for ReservationItem {
    fn from(row: ReservationItemRow) -> Self {
        ReservationItem {
            reservation_id: ReservationId::from_uuid(row.reservation_id),
            item_id: ItemId::from_uuid(row.item_id),
            requested_qty: row.requested_qty,
            committed_qty: row.committed_qty,
            consumed_qty: row.consumed_qty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_texts_use_stored_spelling() {
        assert_eq!(
            status_texts(&PurchaseOrderStatus::OPEN, PurchaseOrderStatus::as_str),
            vec!["draft", "sent", "partially_received"]
        );
    }

    #[test]
    fn unknown_stored_status_is_a_decode_error() {
        let row = ReservationRow {
            id: Uuid::now_v7(),
            job_number: "J-1".into(),
            job_name: "Lobby".into(),
            requested_by: "sam".into(),
            needed_by: None,
            notes: None,
            status: "shipped".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(JobReservation::try_from(row), Err(StoreError::Decode(_))));
    }
}
