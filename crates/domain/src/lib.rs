//! Domain layer for the order lifecycle engine.
//!
//! This crate is pure: no I/O, no async. It provides
//! - the canonical order status graph as a standalone transition table
//! - the state machine deciding transitions and their inventory effects
//! - inventory records, ledger entries, and the declarative inventory plan
//! - order, item, shipment, transition event, and notification records

pub mod error;
pub mod events;
pub mod inventory;
pub mod money;
pub mod notification;
pub mod order;
pub mod shipment;

pub use error::DomainError;
pub use events::{OrderEvent, OrderEventKind};
pub use inventory::{
    Adjustment, InventoryPlan, InventoryRecord, LedgerEntry, PlannedAdjustment, ReasonCode,
    Reconciliation, ReferenceType, TransactionType,
};
pub use money::Money;
pub use notification::{Channel, DeliveryStatus, Notification, NotificationDelivery};
pub use order::{
    Decision, Edge, InventoryEffect, Order, OrderItem, OrderStateMachine, OrderStatus,
    Rejection, ReleaseCause, ShippingContact, Totals, Transition, TransitionTable,
};
pub use shipment::Shipment;
