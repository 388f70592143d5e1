//! Order state machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::{InventoryEffect, OrderStatus, TransitionTable};

/// Reason a transition was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Requested status equals the current one.
    SameStatus,
    /// The current status is terminal.
    Terminal,
    /// The table has no edge between the two statuses.
    NotAllowed,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Rejection::SameStatus => "no-op transition",
            Rejection::Terminal => "current status is terminal",
            Rejection::NotAllowed => "transition not allowed",
        };
        f.write_str(text)
    }
}

/// An approved status change and the inventory effect it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub effect: Option<InventoryEffect>,
}

/// Outcome of asking the state machine about a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(Transition),
    Deny {
        from: OrderStatus,
        to: OrderStatus,
        reason: Rejection,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// The inventory effect of an allowed transition; `None` when denied or effect-free.
    pub fn effect(&self) -> Option<InventoryEffect> {
        match self {
            Decision::Allow(transition) => transition.effect,
            Decision::Deny { .. } => None,
        }
    }

    /// Converts the decision into the approved transition or an `InvalidTransition` error.
    pub fn into_result(self) -> Result<Transition, DomainError> {
        match self {
            Decision::Allow(transition) => Ok(transition),
            Decision::Deny { from, to, reason } => {
                Err(DomainError::InvalidTransition { from, to, reason })
            }
        }
    }
}

/// Pure decision component over a [`TransitionTable`].
///
/// Deterministic in `(current, requested)`; performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderStateMachine {
    table: TransitionTable,
}

impl OrderStateMachine {
    /// Creates a state machine over the canonical graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state machine over a custom table.
    pub fn with_table(table: TransitionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Decides whether `current -> requested` is legal.
    pub fn can_transition(&self, current: OrderStatus, requested: OrderStatus) -> Decision {
        let deny = |reason| Decision::Deny {
            from: current,
            to: requested,
            reason,
        };

        if current == requested {
            return deny(Rejection::SameStatus);
        }
        if current.is_terminal() {
            return deny(Rejection::Terminal);
        }

        match self.table.lookup(current, requested) {
            Some(edge) => Decision::Allow(Transition {
                from: current,
                to: requested,
                effect: edge.effect,
            }),
            None => deny(Rejection::NotAllowed),
        }
    }

    /// Shorthand for `can_transition(..).into_result()`.
    pub fn decide(
        &self,
        current: OrderStatus,
        requested: OrderStatus,
    ) -> Result<Transition, DomainError> {
        self.can_transition(current, requested).into_result()
    }
}
