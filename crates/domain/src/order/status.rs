//! Order status.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Allowed moves, as listed in
/// [`TransitionTable::canonical`](super::TransitionTable::canonical):
/// ```text
/// PendingConfirmation -> Confirmed
/// Confirmed           -> ShipmentRequested     reserve
/// Confirmed           -> Packed                reserve
/// ShipmentRequested   -> Packed
/// Packed              -> Shipped
/// Shipped             -> Delivering
/// Shipped             -> Delivered
/// Delivering          -> Delivered
/// Delivered           -> ReturnRequested
/// ReturnRequested     -> ReturnProcessing
/// ReturnProcessing    -> Returned              release (return)
///
/// PendingConfirmation, Confirmed, ReturnRequested -> Canceled
/// ShipmentRequested, Packed, Shipped, Delivering  -> Canceled   release (cancellation)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Freshly created, waiting for confirmation. Items may change.
    #[default]
    PendingConfirmation,

    /// Confirmed by staff. Items may still change; no stock is held yet.
    Confirmed,

    /// Fulfillment requested from the warehouse; stock is reserved.
    ShipmentRequested,

    /// Packed and waiting for pickup; stock is reserved.
    Packed,

    /// Handed to the carrier.
    Shipped,

    /// Out for delivery.
    Delivering,

    /// Delivered to the customer.
    Delivered,

    /// Customer asked to return the order.
    ReturnRequested,

    /// Return accepted and in transit back.
    ReturnProcessing,

    /// Goods are back in stock (terminal).
    Returned,

    /// Order was canceled (terminal).
    Canceled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 11] = [
        OrderStatus::PendingConfirmation,
        OrderStatus::Confirmed,
        OrderStatus::ShipmentRequested,
        OrderStatus::Packed,
        OrderStatus::Shipped,
        OrderStatus::Delivering,
        OrderStatus::Delivered,
        OrderStatus::ReturnRequested,
        OrderStatus::ReturnProcessing,
        OrderStatus::Returned,
        OrderStatus::Canceled,
    ];

    /// Returns true if items, quantities, and the discount can be modified.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingConfirmation | OrderStatus::Confirmed
        )
    }

    /// Returns true while an outbound reservation is held for the order's items
    /// and has not yet left with the customer.
    ///
    /// Canceling from one of these statuses releases the stock.
    pub fn holds_reserved_stock(&self) -> bool {
        matches!(
            self,
            OrderStatus::ShipmentRequested
                | OrderStatus::Packed
                | OrderStatus::Shipped
                | OrderStatus::Delivering
        )
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Returned | OrderStatus::Canceled)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingConfirmation => "pending_confirmation",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::ShipmentRequested => "shipment_requested",
            OrderStatus::Packed => "packed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Delivered => "delivered",
            OrderStatus::ReturnRequested => "return_requested",
            OrderStatus::ReturnProcessing => "return_processing",
            OrderStatus::Returned => "returned",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
