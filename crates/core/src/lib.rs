//! `forgedesk-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the error taxonomy every engine reports through, and the strongly-typed
//! identifiers shared by the inventory, purchasing and reservation crates.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{
    ItemId, PurchaseOrderId, PurchaseOrderLineId, ReceiptId, ReservationId, SupplierId,
    TransactionId,
};
