//! Operation inputs and read models.

use common::{InventoryId, UserId};
use domain::{Money, Order, OrderItem, Shipment, ShippingContact};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// One requested order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub inventory_id: InventoryId,
    pub quantity: u32,
}

/// Input to [`create_order`](crate::OrderCoordinator::create_order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub shipping: ShippingContact,
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub discount: Money,
}

impl CreateOrderRequest {
    pub fn new(items: impl IntoIterator<Item = (InventoryId, u32)>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|(inventory_id, quantity)| LineRequest {
                    inventory_id,
                    quantity,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn created_by(mut self, user: UserId) -> Self {
        self.created_by = Some(user);
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_shipping(mut self, shipping: ShippingContact) -> Self {
        self.shipping = shipping;
        self
    }
}

/// An order with its items and shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub shipment: Option<Shipment>,
}

/// Who is calling, and how the call may be cut short.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    pub actor: Option<UserId>,
    pub cancel: CancellationToken,
}

impl OperationContext {
    pub fn new(actor: Option<UserId>) -> Self {
        Self {
            actor,
            cancel: CancellationToken::new(),
        }
    }

    /// Context for internal callers with no user.
    pub fn system() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
