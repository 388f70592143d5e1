//! Domain error types.

use common::InventoryId;
use thiserror::Error;

use crate::money::Money;
use crate::order::{OrderStatus, Rejection};

/// Errors raised by pure domain rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The state machine rejected the requested status change.
    #[error("Invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        reason: Rejection,
    },

    /// Applying the delta would drive the quantity below zero.
    #[error(
        "Insufficient inventory for {inventory_id}: available {available}, requested {requested}"
    )]
    InsufficientInventory {
        inventory_id: InventoryId,
        available: i64,
        requested: i64,
    },

    /// Items and discounts may only change while the order is editable.
    #[error("Order is not editable in {status} status")]
    NotEditable { status: OrderStatus },

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Invalid discount.
    #[error("Invalid discount: {discount} (must not be negative)")]
    InvalidDiscount { discount: Money },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// The resulting quantity does not fit in an `i64`.
    #[error("Adjusting {inventory_id} by {delta} overflows its quantity of {quantity}")]
    QuantityOverflow {
        inventory_id: InventoryId,
        quantity: i64,
        delta: i64,
    },

    /// A line subtotal or order total does not fit in an `i64` of cents.
    #[error("Order amount overflows")]
    AmountOverflow,

    /// An adjustment with a zero delta records nothing and signals a caller bug.
    #[error("Inventory adjustment for {inventory_id} has a zero delta")]
    ZeroDelta { inventory_id: InventoryId },
}
