//! Purchase orders, receiving and suppliers.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use forgedesk_core::{DomainError, ItemId, PurchaseOrderId, SupplierId};
use forgedesk_inventory::{InventoryItem, PostTransaction};
use forgedesk_purchasing::order::{derive_status, reconcile_lines, total_cost};
use forgedesk_purchasing::receipt::plan_receipt;
use forgedesk_purchasing::{
    CreateOrder, NewSupplier, OpenOrderSummary, OrderHeaderUpdate, OrderLineInput, PurchaseOrder,
    PurchaseOrderDetail, PurchaseOrderLine, PurchaseOrderLineView, PurchaseOrderReceipt,
    PurchaseOrderStatus, ReceiptOutcome, ReceiptRequest, Supplier,
};

use super::ledger::post_transaction;
use super::{finish, replenishment};
use crate::error::EngineResult;
use crate::store::{InventoryStore, StoreTx};

/// Edit to an existing order. `None` leaves that part untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOrder {
    pub header: Option<OrderHeaderUpdate>,
    /// The complete new line set; stored lines missing from it are deleted.
    pub lines: Option<Vec<OrderLineInput>>,
}

#[derive(Clone)]
pub struct PurchasingEngine {
    store: Arc<dyn InventoryStore>,
}

impl PurchasingEngine {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    // -- suppliers ----------------------------------------------------------

    pub async fn create_supplier(&self, request: NewSupplier) -> EngineResult<Supplier> {
        let supplier = request.build(Utc::now())?;
        let mut tx = self.store.begin().await?;
        let result = tx.insert_supplier(&supplier).await.map_err(Into::into);
        finish(tx, result).await?;
        info!(supplier_id = %supplier.id, name = %supplier.name, "supplier created");
        Ok(supplier)
    }

    pub async fn list_suppliers(&self) -> EngineResult<Vec<Supplier>> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_suppliers().await.map_err(Into::into);
        finish(tx, result).await
    }

    pub async fn get_supplier(&self, id: SupplierId) -> EngineResult<Supplier> {
        let mut tx = self.store.begin().await?;
        let result = require_supplier(tx.as_mut(), id).await;
        finish(tx, result).await
    }

    // -- orders -------------------------------------------------------------

    /// Insert the header and lines atomically, then refresh on-order for
    /// every referenced item.
    #[instrument(skip(self, request), fields(lines = request.lines.len()), err)]
    pub async fn create_order(&self, request: CreateOrder) -> EngineResult<PurchaseOrderDetail> {
        let (order, lines) = request.build(Utc::now())?;

        let mut tx = self.store.begin().await?;
        let result = create_order_in(tx.as_mut(), &order, &lines).await;
        finish(tx, result).await?;

        info!(
            order_id = %order.id,
            status = %order.status,
            total_cost = %order.total_cost,
            "purchase order created"
        );
        replenishment::refresh_on_order_after_commit(self.store.as_ref(), &item_ids(&lines)).await;

        self.get_order(order.id).await
    }

    /// Apply header edits and reconcile lines as one unit of work.
    ///
    /// Status is only changed when the header update supplies one.
    #[instrument(skip(self, update), err)]
    pub async fn update_order(
        &self,
        id: PurchaseOrderId,
        update: UpdateOrder,
    ) -> EngineResult<PurchaseOrderDetail> {
        let mut tx = self.store.begin().await?;
        let result = update_order_in(tx.as_mut(), id, update).await;
        let affected = finish(tx, result).await?;

        info!(order_id = %id, affected_items = affected.len(), "purchase order updated");
        replenishment::refresh_on_order_after_commit(self.store.as_ref(), &affected).await;

        self.get_order(id).await
    }

    /// Receive quantities against order lines.
    ///
    /// Quantities are clamped to what is outstanding; lines clamped to zero are
    /// skipped. Line updates, the ledger posting, the receipt record and the
    /// recalculated status commit together.
    #[instrument(skip(self, request), fields(lines = request.lines.len()), err)]
    pub async fn record_receipt(
        &self,
        order_id: PurchaseOrderId,
        request: ReceiptRequest,
    ) -> EngineResult<ReceiptOutcome> {
        let mut tx = self.store.begin().await?;
        let result = record_receipt_in(tx.as_mut(), order_id, &request).await;
        let (outcome, affected) = finish(tx, result).await?;

        if outcome.lines.is_empty() {
            info!(%order_id, "receipt accepted nothing; order unchanged");
            return Ok(outcome);
        }

        info!(
            %order_id,
            status = %outcome.status,
            lines = outcome.lines.len(),
            transaction_id = ?outcome.transaction_id,
            "purchase order receipt recorded"
        );
        replenishment::refresh_on_order_after_commit(self.store.as_ref(), &affected).await;
        Ok(outcome)
    }

    /// Header, resolved supplier and lines with item details.
    pub async fn get_order(&self, id: PurchaseOrderId) -> EngineResult<PurchaseOrderDetail> {
        let mut tx = self.store.begin().await?;
        let result = order_detail_in(tx.as_mut(), id).await;
        finish(tx, result).await
    }

    /// Orders in draft, sent or partially received status, newest first.
    pub async fn list_open_orders(&self) -> EngineResult<Vec<OpenOrderSummary>> {
        let mut tx = self.store.begin().await?;
        let result = open_orders_in(tx.as_mut()).await;
        finish(tx, result).await
    }

    /// Receipts for an order, newest first.
    pub async fn receipt_history(
        &self,
        order_id: PurchaseOrderId,
    ) -> EngineResult<Vec<PurchaseOrderReceipt>> {
        let mut tx = self.store.begin().await?;
        let result = receipt_history_in(tx.as_mut(), order_id).await;
        finish(tx, result).await
    }
}

fn item_ids(lines: &[PurchaseOrderLine]) -> Vec<ItemId> {
    lines
        .iter()
        .filter_map(|line| line.item_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

async fn require_supplier(tx: &mut dyn StoreTx, id: SupplierId) -> EngineResult<Supplier> {
    tx.get_supplier(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("supplier {id}")).into())
}

async fn require_order(tx: &mut dyn StoreTx, id: PurchaseOrderId) -> EngineResult<PurchaseOrder> {
    tx.load_order_for_update(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("purchase order {id}")).into())
}

/// Every line item must exist before an order may reference it.
async fn require_items(tx: &mut dyn StoreTx, lines: &[PurchaseOrderLine]) -> EngineResult<()> {
    let wanted = item_ids(lines);
    if wanted.is_empty() {
        return Ok(());
    }
    let found: BTreeSet<ItemId> = tx
        .items_by_id(&wanted)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();
    match wanted.into_iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(DomainError::not_found(format!("inventory item {missing}")).into()),
        None => Ok(()),
    }
}

async fn create_order_in(
    tx: &mut dyn StoreTx,
    order: &PurchaseOrder,
    lines: &[PurchaseOrderLine],
) -> EngineResult<()> {
    if let Some(supplier_id) = order.supplier_id {
        require_supplier(tx, supplier_id).await?;
    }
    require_items(tx, lines).await?;

    tx.insert_order(order).await?;
    for line in lines {
        tx.insert_order_line(line).await?;
    }
    Ok(())
}

/// Returns the items whose on-order cache is now stale.
async fn update_order_in(
    tx: &mut dyn StoreTx,
    id: PurchaseOrderId,
    update: UpdateOrder,
) -> EngineResult<Vec<ItemId>> {
    let mut order = require_order(tx, id).await?;
    let existing = tx.order_lines(id).await?;
    let mut affected: BTreeSet<ItemId> = item_ids(&existing).into_iter().collect();
    let now = Utc::now();

    if let Some(header) = update.header {
        if let Some(supplier_id) = header.supplier_id {
            require_supplier(tx, supplier_id).await?;
        }
        header.apply(&mut order, now);
    } else {
        order.updated_at = now;
    }

    if let Some(incoming) = update.lines {
        let reconciliation = reconcile_lines(id, &existing, incoming)?;
        let resulting = reconciliation.resulting_lines();
        require_items(tx, &resulting).await?;

        for line_id in &reconciliation.deleted {
            tx.delete_order_line(*line_id).await?;
        }
        for line in &reconciliation.updated {
            tx.update_order_line(line).await?;
        }
        for line in &reconciliation.inserted {
            tx.insert_order_line(line).await?;
        }
        order.total_cost = total_cost(&resulting);
        affected.extend(reconciliation.affected_items);
    }

    tx.update_order(&order).await?;
    Ok(affected.into_iter().collect())
}

async fn record_receipt_in(
    tx: &mut dyn StoreTx,
    order_id: PurchaseOrderId,
    request: &ReceiptRequest,
) -> EngineResult<(ReceiptOutcome, Vec<ItemId>)> {
    let mut order = require_order(tx, order_id).await?;
    if order.status == PurchaseOrderStatus::Cancelled {
        return Err(DomainError::validation(format!(
            "purchase order {} is cancelled and cannot be received",
            order.label()
        ))
        .into());
    }

    let mut lines = tx.order_lines(order_id).await?;
    let plan = plan_receipt(&order, &lines, request)?;
    if plan.is_empty() {
        let outcome = ReceiptOutcome {
            receipt_id: None,
            transaction_id: None,
            status: order.status,
            lines: Vec::new(),
        };
        return Ok((outcome, Vec::new()));
    }

    plan.apply_to(&mut lines);
    for accepted in &plan.accepted {
        if let Some(line) = lines.iter().find(|line| line.id == accepted.line_id) {
            tx.update_order_line(line).await?;
        }
    }

    let transaction_id = if plan.ledger_lines.is_empty() {
        None
    } else {
        let posting = PostTransaction::new(plan.reference.clone(), plan.ledger_lines.clone())
            .with_notes(plan.notes.clone());
        Some(post_transaction(tx, &posting).await?.id)
    };

    let now = Utc::now();
    order.status = derive_status(&lines);
    order.updated_at = now;
    tx.update_order(&order).await?;

    let receipt = PurchaseOrderReceipt::from_plan(order_id, &plan, transaction_id, now);
    tx.insert_receipt(&receipt).await?;

    let outcome = ReceiptOutcome {
        receipt_id: Some(receipt.id),
        transaction_id,
        status: order.status,
        lines: plan.accepted,
    };
    Ok((outcome, item_ids(&lines)))
}

async fn order_detail_in(
    tx: &mut dyn StoreTx,
    id: PurchaseOrderId,
) -> EngineResult<PurchaseOrderDetail> {
    let order = tx
        .get_order(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("purchase order {id}")))?;
    let supplier = match order.supplier_id {
        Some(supplier_id) => tx.get_supplier(supplier_id).await?,
        None => None,
    };

    let lines = tx.order_lines(id).await?;
    let items: HashMap<ItemId, InventoryItem> = tx
        .items_by_id(&item_ids(&lines))
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let lines: Vec<PurchaseOrderLineView> = lines
        .into_iter()
        .map(|line| {
            let item = line.item_id.and_then(|item_id| items.get(&item_id));
            PurchaseOrderLineView {
                sku: item.map(|i| i.sku.clone()),
                item_name: item.map(|i| i.name.clone()),
                outstanding: line.outstanding(),
                line,
            }
        })
        .collect();
    let outstanding_total: Decimal = lines.iter().map(|l| l.outstanding).sum();

    Ok(PurchaseOrderDetail {
        order,
        supplier,
        lines,
        outstanding_total,
    })
}

async fn open_orders_in(tx: &mut dyn StoreTx) -> EngineResult<Vec<OpenOrderSummary>> {
    let suppliers: HashMap<SupplierId, String> = tx
        .list_suppliers()
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let orders = tx.list_orders(&PurchaseOrderStatus::OPEN).await?;
    let mut summaries = Vec::with_capacity(orders.len());
    for order in orders {
        let lines = tx.order_lines(order.id).await?;
        summaries.push(OpenOrderSummary {
            supplier_name: order.supplier_id.and_then(|id| suppliers.get(&id).cloned()),
            line_count: lines.len(),
            outstanding_total: lines.iter().map(PurchaseOrderLine::outstanding).sum(),
            order,
        });
    }
    Ok(summaries)
}

async fn receipt_history_in(
    tx: &mut dyn StoreTx,
    order_id: PurchaseOrderId,
) -> EngineResult<Vec<PurchaseOrderReceipt>> {
    if tx.get_order(order_id).await?.is_none() {
        return Err(DomainError::not_found(format!("purchase order {order_id}")).into());
    }
    Ok(tx.list_receipts(order_id).await?)
}
