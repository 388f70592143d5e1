//! Orders: records, statuses, the transition table, and the state machine.

mod model;
mod state_machine;
mod status;
mod transitions;

pub use model::{Order, OrderItem, ShippingContact, Totals};
pub use state_machine::{Decision, OrderStateMachine, Rejection, Transition};
pub use status::{OrderStatus, UnknownStatus};
pub use transitions::{Edge, InventoryEffect, ReleaseCause, Row, TableError, TransitionTable};
