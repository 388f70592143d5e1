//! Fixed title/message templates keyed by event kind.

use domain::{OrderEvent, OrderEventKind, OrderStatus};

/// Title and body for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub title: String,
    pub message: String,
}

pub fn render(event: &OrderEvent) -> Rendered {
    let order = event.order_id;
    let (title, message) = match event.kind {
        OrderEventKind::Created => (
            "New order".to_string(),
            format!("Order {order} was placed and awaits confirmation."),
        ),
        OrderEventKind::StatusChanged { from, to } => {
            (status_title(to).to_string(), status_message(order, from, to))
        }
    };
    Rendered { title, message }
}

fn status_title(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::PendingConfirmation => "Order pending",
        OrderStatus::Confirmed => "Order confirmed",
        OrderStatus::ShipmentRequested => "Shipment requested",
        OrderStatus::Packed => "Order packed",
        OrderStatus::Shipped => "Order shipped",
        OrderStatus::Delivering => "Out for delivery",
        OrderStatus::Delivered => "Order delivered",
        OrderStatus::ReturnRequested => "Return requested",
        OrderStatus::ReturnProcessing => "Return in progress",
        OrderStatus::Returned => "Order returned",
        OrderStatus::Canceled => "Order canceled",
    }
}

fn status_message(order: common::OrderId, from: OrderStatus, to: OrderStatus) -> String {
    match to {
        OrderStatus::Canceled => {
            format!("Order {order} was canceled (previously {from}).")
        }
        OrderStatus::Returned => {
            format!("Order {order} was returned and its stock restored.")
        }
        OrderStatus::Shipped => format!("Order {order} has left the warehouse."),
        _ => format!("Order {order} moved from {from} to {to}."),
    }
}
