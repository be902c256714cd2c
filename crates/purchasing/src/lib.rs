//! Purchasing domain.
//!
//! Purchase orders, their lines, receiving and suppliers. Pure rules only: the
//! engine in `forgedesk-infra` loads rows, asks these functions what to change,
//! and writes the result inside one unit of work.

pub mod order;
pub mod receipt;
pub mod supplier;

pub use order::{
    CreateOrder, LineReconciliation, OpenOrderSummary, OrderHeaderUpdate, OrderLineInput,
    PurchaseOrder, PurchaseOrderDetail, PurchaseOrderLine, PurchaseOrderLineView,
    PurchaseOrderStatus,
};
pub use receipt::{
    AcceptedReceiptLine, PurchaseOrderReceipt, ReceiptLine, ReceiptOutcome, ReceiptPlan,
    ReceiptRequest,
};
pub use supplier::{NewSupplier, Supplier};
