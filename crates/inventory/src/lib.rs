//! Inventory domain.
//!
//! Pure, deterministic rules for stock-keeping items: SKU composition, status
//! derivation, ledger posting plans, usage averaging and replenishment math.
//! No IO happens here; storage and transactions live in `forgedesk-infra`.

pub mod estimate;
pub mod import;
pub mod item;
pub mod ledger;
pub mod replenishment;
pub mod sku;
pub mod summary;
pub mod usage;

pub use estimate::{EstimateLine, EstimateReport, EstimateRequirement, EstimateStatus};
pub use import::{ImportOutcome, ImportRow, NormalizedImportRow};
pub use item::{InventoryItem, ItemDetails, ItemStatus, ItemView, PurchaseUom};
pub use ledger::{InventoryTransaction, LedgerLine, PostTransaction, TransactionLine};
pub use replenishment::{
    ReplenishmentReport, ReplenishmentRow, ReplenishmentSnapshot, SupplierRef, derive_status,
};
pub use sku::{Finish, ParsedSku, compose_sku, parse_sku};
pub use summary::InventorySummary;
pub use usage::DailyUsage;
