//! Shared identifier types for the order engine.
//!
//! Every entity gets its own UUID newtype so that an order id can never be
//! passed where an inventory id is expected.

mod ids;

pub use ids::{
    InventoryId, LedgerEntryId, NotificationId, OrderId, OrderItemId, ProductId, ShipmentId,
    UserId,
};
