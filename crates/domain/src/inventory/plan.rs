//! Declarative inventory plans.
//!
//! A plan turns a transition's [`InventoryEffect`] plus the order's items into
//! the exact list of adjustments to apply, once, before anything touches
//! storage.

use common::{InventoryId, OrderId, OrderItemId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::order::{InventoryEffect, OrderItem, ReleaseCause};

use super::{ReasonCode, ReferenceType, TransactionType};

/// Arguments of a single inventory adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub inventory_id: InventoryId,
    pub delta: i64,
    pub transaction_type: TransactionType,
    pub reason: ReasonCode,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<ReferenceType>,
}

impl Adjustment {
    /// A manual stock correction; restocks are recorded as inbound.
    pub fn manual(inventory_id: InventoryId, delta: i64, reason: ReasonCode) -> Self {
        let transaction_type = match reason {
            ReasonCode::Restock => TransactionType::Inbound,
            _ => TransactionType::Adjustment,
        };
        Self {
            inventory_id,
            delta,
            transaction_type,
            reason,
            reference_id: None,
            reference_type: Some(ReferenceType::Manual),
        }
    }

    /// Rejects zero deltas.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.delta == 0 {
            return Err(DomainError::ZeroDelta {
                inventory_id: self.inventory_id,
            });
        }
        Ok(())
    }
}

/// One plan line: the item it came from and the adjustment it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAdjustment {
    pub item_id: OrderItemId,
    pub adjustment: Adjustment,
}

/// Ordered list of adjustments for one transition.
///
/// Lines are sorted by inventory id so that row locks are always taken in the
/// same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPlan {
    lines: Vec<PlannedAdjustment>,
}

impl InventoryPlan {
    /// An empty plan.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds the plan for `effect` over `items`: one line per item.
    pub fn for_transition(
        order_id: OrderId,
        effect: Option<InventoryEffect>,
        items: &[OrderItem],
    ) -> Self {
        let Some(effect) = effect else {
            return Self::none();
        };

        let (sign, transaction_type, reason) = match effect {
            InventoryEffect::Reserve => (-1, TransactionType::Outbound, ReasonCode::Sale),
            InventoryEffect::Release(ReleaseCause::Return) => {
                (1, TransactionType::Inbound, ReasonCode::Return)
            }
            InventoryEffect::Release(ReleaseCause::Cancellation) => {
                (1, TransactionType::Inbound, ReasonCode::OrderCancellation)
            }
        };

        let mut lines: Vec<_> = items
            .iter()
            .map(|item| PlannedAdjustment {
                item_id: item.id,
                adjustment: Adjustment {
                    inventory_id: item.inventory_id,
                    delta: sign * i64::from(item.quantity),
                    transaction_type,
                    reason,
                    reference_id: Some(order_id.as_uuid()),
                    reference_type: Some(ReferenceType::Order),
                },
            })
            .collect();
        lines.sort_by_key(|line| (line.adjustment.inventory_id, line.item_id));

        Self { lines }
    }

    pub fn lines(&self) -> &[PlannedAdjustment] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Net delta the plan applies to `inventory_id`.
    pub fn net_delta(&self, inventory_id: InventoryId) -> i64 {
        self.lines
            .iter()
            .filter(|line| line.adjustment.inventory_id == inventory_id)
            .map(|line| line.adjustment.delta)
            .sum()
    }
}
