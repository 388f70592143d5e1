//! Inventory records, the append-only ledger, and inventory plans.

mod ledger;
mod plan;
mod record;

pub use ledger::{LedgerEntry, ReasonCode, ReferenceType, TransactionType, UnknownCode, ledger_sum};
pub use plan::{Adjustment, InventoryPlan, PlannedAdjustment};
pub use record::{InventoryRecord, Reconciliation};
