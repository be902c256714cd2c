//! Engine layer: the operations callers run against the inventory.
//!
//! Every top-level operation owns exactly one unit of work:
//!
//! ```text
//! begin()
//!   ↓
//! lock item rows (ascending id)
//!   ↓
//! plan with the pure domain crates
//!   ↓
//! write rows, post to the ledger through the same StoreTx
//!   ↓
//! commit on Ok, rollback on Err (error returned unchanged)
//! ```
//!
//! Nested operations (a receipt posting to the ledger, a completion consuming
//! stock) are free functions taking `&mut dyn StoreTx`; they never begin or
//! commit anything themselves.
//!
//! Cache refreshes that follow a commit (average daily use, on-order) run in
//! their own unit of work. A failed refresh is logged and left for
//! `refresh_planning_caches` to repair; it never fails the operation that
//! already committed.

use std::sync::Arc;

use tracing::warn;

use crate::capabilities::Capabilities;
use crate::error::EngineResult;
use crate::store::{InventoryStore, StoreTx};

pub mod catalog;
pub mod ledger;
pub mod purchasing;
pub mod replenishment;
pub mod reservations;
pub mod usage;

pub use catalog::{CatalogEngine, NewItem};
pub use ledger::{LedgerEngine, post_transaction};
pub use purchasing::{PurchasingEngine, UpdateOrder};
pub use replenishment::{RefreshSummary, ReplenishmentEngine};
pub use reservations::{CommitRequest, CommitmentCorrection, ReservationEngine};
pub use usage::{ItemAverage, UsageEngine};

/// All engines over one store.
#[derive(Clone)]
pub struct Engines {
    pub ledger: LedgerEngine,
    pub usage: UsageEngine,
    pub replenishment: ReplenishmentEngine,
    pub purchasing: PurchasingEngine,
    pub reservations: ReservationEngine,
    pub catalog: CatalogEngine,
    capabilities: Capabilities,
}

impl Engines {
    pub fn new(store: Arc<dyn InventoryStore>, capabilities: Capabilities) -> Self {
        Self {
            ledger: LedgerEngine::new(store.clone()),
            usage: UsageEngine::new(store.clone()),
            replenishment: ReplenishmentEngine::new(store.clone()),
            purchasing: PurchasingEngine::new(store.clone()),
            reservations: ReservationEngine::new(store.clone(), capabilities),
            catalog: CatalogEngine::new(store, capabilities),
            capabilities,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// Close a unit of work: commit when `result` is `Ok`, otherwise roll back and
/// hand the original error back.
pub(crate) async fn finish<T>(tx: Box<dyn StoreTx>, result: EngineResult<T>) -> EngineResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, original = %err, "rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use forgedesk_inventory::{ItemDetails, ItemView};

    use super::{Engines, NewItem};
    use crate::capabilities::Capabilities;
    use crate::store::InMemoryStore;

    pub fn engines() -> Engines {
        Engines::new(Arc::new(InMemoryStore::new()), Capabilities::all())
    }

    pub fn engines_without_reservations() -> Engines {
        Engines::new(
            Arc::new(InMemoryStore::without_reservations()),
            Capabilities::without_reservations(),
        )
    }

    pub async fn seed_item(engines: &Engines, part: &str, stock: i64, reorder_point: i64) -> ItemView {
        let mut details = ItemDetails::new(format!("Item {part}"), part);
        details.reorder_point = reorder_point;
        engines
            .catalog
            .create_item(NewItem { details, stock })
            .await
            .unwrap()
    }
}
