//! Inventory ledger: the only path that changes on-hand stock.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use forgedesk_core::{DomainError, ItemId, TransactionId};
use forgedesk_inventory::ledger::{consumption_by_item, final_stock, plan_lines};
use forgedesk_inventory::{InventoryTransaction, PostTransaction};

use super::{finish, usage};
use crate::error::EngineResult;
use crate::store::{InventoryStore, StoreTx};

/// Post a ledger transaction inside an open unit of work.
///
/// Items are locked in ascending id order, the whole posting is planned against
/// their current stock, and nothing is written unless every line keeps its item
/// at or above zero. Consumption is added to today's usage for each item.
#[instrument(
    skip(tx, request),
    fields(reference = %request.reference, lines = request.lines.len()),
    err
)]
pub async fn post_transaction(
    tx: &mut dyn StoreTx,
    request: &PostTransaction,
) -> EngineResult<InventoryTransaction> {
    request.validate()?;

    let items = tx.lock_items(&request.item_ids()).await?;
    let stock: HashMap<ItemId, i64> = items.iter().map(|item| (item.id, item.stock)).collect();
    let lines = plan_lines(request, &stock)?;

    let txn = InventoryTransaction {
        id: TransactionId::new(),
        reference: request.reference.trim().to_string(),
        notes: request.notes.clone(),
        created_at: request.occurred_at,
        lines,
    };
    tx.insert_transaction(&txn).await?;

    for (item_id, stock) in final_stock(&txn.lines) {
        tx.set_stock(item_id, stock).await?;
    }

    let consumed = consumption_by_item(&txn.lines);
    usage::record_daily_usage(tx, request.occurred_at.date_naive(), &consumed).await?;

    Ok(txn)
}

#[derive(Clone)]
pub struct LedgerEngine {
    store: Arc<dyn InventoryStore>,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Post a transaction as its own unit of work.
    ///
    /// After commit, averages are recalculated for every item the posting consumed.
    pub async fn post(&self, request: PostTransaction) -> EngineResult<InventoryTransaction> {
        let mut tx = self.store.begin().await?;
        let result = post_transaction(tx.as_mut(), &request).await;
        let txn = finish(tx, result).await?;

        info!(
            transaction_id = %txn.id,
            reference = %txn.reference,
            lines = txn.lines.len(),
            "ledger transaction posted"
        );

        let consumed: Vec<ItemId> = consumption_by_item(&txn.lines).into_keys().collect();
        usage::refresh_after_commit(self.store.as_ref(), &consumed, txn.created_at.date_naive())
            .await;

        Ok(txn)
    }

    /// Transactions touching `item_id`, newest first.
    pub async fn history(&self, item_id: ItemId) -> EngineResult<Vec<InventoryTransaction>> {
        let mut tx = self.store.begin().await?;
        let result = history_in(tx.as_mut(), item_id).await;
        finish(tx, result).await
    }
}

async fn history_in(
    tx: &mut dyn StoreTx,
    item_id: ItemId,
) -> EngineResult<Vec<InventoryTransaction>> {
    if tx.items_by_id(&[item_id]).await?.is_empty() {
        return Err(DomainError::not_found(format!("inventory item {item_id}")).into());
    }
    Ok(tx.list_transactions(Some(item_id)).await?)
}
