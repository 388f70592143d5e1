//! Order and order item records.

use chrono::{DateTime, Utc};
use common::{InventoryId, OrderId, OrderItemId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

use super::OrderStatus;

/// Shipping and contact details carried on the order.
///
/// Opaque to the lifecycle engine; stored and returned as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingContact {
    pub recipient_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
}

/// Monetary totals of an order.
///
/// Always built through [`Totals::new`] or [`Totals::from_items`], which keep
/// `final_total_amount = max(0, total_amount - discount_amount)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_amount: Money,
    pub discount_amount: Money,
    pub final_total_amount: Money,
}

impl Totals {
    pub fn new(total_amount: Money, discount_amount: Money) -> Self {
        Self {
            total_amount,
            discount_amount,
            final_total_amount: (total_amount - discount_amount).floor_zero(),
        }
    }

    /// Recomputes totals from persisted items, failing with `AmountOverflow`
    /// if any subtotal or the sum leaves the `i64` range.
    pub fn from_items<'a>(
        items: impl IntoIterator<Item = &'a OrderItem>,
        discount_amount: Money,
    ) -> Result<Self, DomainError> {
        let total = items.into_iter().try_fold(Money::zero(), |total, item| {
            item.subtotal()
                .and_then(|subtotal| total.checked_add(subtotal))
                .ok_or(DomainError::AmountOverflow)
        })?;
        Ok(Self::new(total, discount_amount))
    }

    /// Returns true if the stored final total agrees with the other two fields.
    pub fn is_consistent(&self) -> bool {
        self.final_total_amount == (self.total_amount - self.discount_amount).floor_zero()
    }
}

/// An order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub totals: Totals,
    pub created_by: Option<UserId>,
    pub shipping: ShippingContact,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates an order shell: pending confirmation, zero totals.
    pub fn new_pending(created_by: Option<UserId>, shipping: ShippingContact) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            status: OrderStatus::PendingConfirmation,
            totals: Totals::default(),
            created_by,
            shipping,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fails with `NotEditable` unless items and discount may change.
    pub fn ensure_editable(&self) -> Result<(), DomainError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(DomainError::NotEditable {
                status: self.status,
            })
        }
    }
}

/// A single line on an order.
///
/// `price_at_order` is the catalog price captured when the line was added and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub inventory_id: InventoryId,
    pub quantity: u32,
    pub price_at_order: Money,
}

impl OrderItem {
    /// Creates a new item, rejecting a zero quantity.
    pub fn new(
        order_id: OrderId,
        inventory_id: InventoryId,
        quantity: u32,
        price_at_order: Money,
    ) -> Result<Self, DomainError> {
        ensure_quantity(quantity)?;
        Ok(Self {
            id: OrderItemId::new(),
            order_id,
            inventory_id,
            quantity,
            price_at_order,
        })
    }

    /// Returns `price_at_order * quantity`, or `None` on overflow.
    pub fn subtotal(&self) -> Option<Money> {
        self.price_at_order.checked_multiply(self.quantity)
    }

    /// Returns a copy with a new quantity; the price snapshot is kept.
    pub fn with_quantity(&self, quantity: u32) -> Result<Self, DomainError> {
        ensure_quantity(quantity)?;
        Ok(Self {
            quantity,
            ..self.clone()
        })
    }
}

fn ensure_quantity(quantity: u32) -> Result<(), DomainError> {
    if quantity == 0 {
        Err(DomainError::InvalidQuantity { quantity })
    } else {
        Ok(())
    }
}
