//! The order transition table.
//!
//! Legality of every status change lives here and nowhere else. Each source
//! status owns one row listing its outgoing edges, and each edge carries the
//! inventory effect the move implies.

use serde::{Deserialize, Serialize};

use super::OrderStatus;
use OrderStatus::*;

/// Why stock is being returned to inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseCause {
    /// The customer's return arrived back.
    Return,
    /// The order was canceled while stock was reserved.
    Cancellation,
}

/// Inventory side effect of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "effect", content = "cause")]
pub enum InventoryEffect {
    /// Decrement stock by each item's quantity (outbound ledger entry).
    Reserve,
    /// Increment stock by each item's quantity (inbound ledger entry).
    Release(ReleaseCause),
}

/// One allowed move out of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub to: OrderStatus,
    pub effect: Option<InventoryEffect>,
}

impl Edge {
    const fn plain(to: OrderStatus) -> Self {
        Self { to, effect: None }
    }

    const fn reserve(to: OrderStatus) -> Self {
        Self {
            to,
            effect: Some(InventoryEffect::Reserve),
        }
    }

    const fn release(to: OrderStatus, cause: ReleaseCause) -> Self {
        Self {
            to,
            effect: Some(InventoryEffect::Release(cause)),
        }
    }
}

/// Outgoing edges of a single source status.
#[derive(Debug, Clone, Copy)]
pub struct Row {
    pub from: OrderStatus,
    pub edges: &'static [Edge],
}

/// Structural problems detected by [`TransitionTable::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("status {0} has no row")]
    MissingRow(OrderStatus),
    #[error("status {0} has more than one row")]
    DuplicateRow(OrderStatus),
    #[error("terminal status {0} has outgoing edges")]
    TerminalHasEdges(OrderStatus),
    #[error("status {0} has an edge to itself")]
    SelfLoop(OrderStatus),
    #[error("edge {from} -> {to} is listed twice")]
    DuplicateEdge { from: OrderStatus, to: OrderStatus },
}

/// Static transition table: one row per status.
#[derive(Debug, Clone, Copy)]
pub struct TransitionTable {
    rows: &'static [Row],
}

const CANONICAL_ROWS: &[Row] = &[
    Row {
        from: PendingConfirmation,
        edges: &[Edge::plain(Confirmed), Edge::plain(Canceled)],
    },
    Row {
        from: Confirmed,
        edges: &[
            Edge::reserve(ShipmentRequested),
            Edge::reserve(Packed),
            Edge::plain(Canceled),
        ],
    },
    Row {
        from: ShipmentRequested,
        edges: &[
            Edge::plain(Packed),
            Edge::release(Canceled, ReleaseCause::Cancellation),
        ],
    },
    Row {
        from: Packed,
        edges: &[
            Edge::plain(Shipped),
            Edge::release(Canceled, ReleaseCause::Cancellation),
        ],
    },
    Row {
        from: Shipped,
        edges: &[
            Edge::plain(Delivering),
            Edge::plain(Delivered),
            Edge::release(Canceled, ReleaseCause::Cancellation),
        ],
    },
    Row {
        from: Delivering,
        edges: &[
            Edge::plain(Delivered),
            Edge::release(Canceled, ReleaseCause::Cancellation),
        ],
    },
    Row {
        from: Delivered,
        edges: &[Edge::plain(ReturnRequested)],
    },
    // The goods are with the customer, so withdrawing the request releases nothing.
    Row {
        from: ReturnRequested,
        edges: &[Edge::plain(ReturnProcessing), Edge::plain(Canceled)],
    },
    Row {
        from: ReturnProcessing,
        edges: &[Edge::release(Returned, ReleaseCause::Return)],
    },
    Row {
        from: Returned,
        edges: &[],
    },
    Row {
        from: Canceled,
        edges: &[],
    },
];

impl TransitionTable {
    /// The canonical order graph.
    pub const fn canonical() -> Self {
        Self {
            rows: CANONICAL_ROWS,
        }
    }

    /// Builds a table from custom rows. Call [`validate`](Self::validate) before use.
    pub const fn from_rows(rows: &'static [Row]) -> Self {
        Self { rows }
    }

    /// Returns the outgoing edges of `from`.
    pub fn edges(&self, from: OrderStatus) -> &'static [Edge] {
        self.rows
            .iter()
            .find(|row| row.from == from)
            .map(|row| row.edges)
            .unwrap_or(&[])
    }

    /// Returns the edge `from -> to` if the table allows it.
    pub fn lookup(&self, from: OrderStatus, to: OrderStatus) -> Option<Edge> {
        self.edges(from).iter().copied().find(|edge| edge.to == to)
    }

    /// Returns every status reachable in one step from `from`.
    pub fn targets(&self, from: OrderStatus) -> impl Iterator<Item = OrderStatus> {
        self.edges(from).iter().map(|edge| edge.to)
    }

    /// Checks the table's structure: one row per status, no self loops,
    /// no duplicate edges, terminal statuses have no exits.
    pub fn validate(&self) -> Result<(), TableError> {
        for status in OrderStatus::ALL {
            match self.rows.iter().filter(|row| row.from == status).count() {
                0 => return Err(TableError::MissingRow(status)),
                1 => {}
                _ => return Err(TableError::DuplicateRow(status)),
            }
        }

        for row in self.rows {
            if row.from.is_terminal() && !row.edges.is_empty() {
                return Err(TableError::TerminalHasEdges(row.from));
            }
            for (i, edge) in row.edges.iter().enumerate() {
                if edge.to == row.from {
                    return Err(TableError::SelfLoop(row.from));
                }
                if row.edges[..i].iter().any(|prev| prev.to == edge.to) {
                    return Err(TableError::DuplicateEdge {
                        from: row.from,
                        to: edge.to,
                    });
                }
            }
        }

        Ok(())
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_table_is_well_formed() {
        assert_eq!(TransitionTable::canonical().validate(), Ok(()));
    }

    #[test]
    fn cancel_is_reachable_from_all_but_excluded_statuses() {
        let table = TransitionTable::canonical();
        for status in OrderStatus::ALL {
            let can_cancel = table.lookup(status, Canceled).is_some();
            let expected = !status.is_terminal()
                && !matches!(status, Delivered | ReturnProcessing);
            assert_eq!(can_cancel, expected, "cancel from {status}");
        }
    }

    #[test]
    fn cancel_releases_only_when_stock_is_reserved() {
        let table = TransitionTable::canonical();
        for status in OrderStatus::ALL {
            if let Some(edge) = table.lookup(status, Canceled) {
                let releases =
                    edge.effect == Some(InventoryEffect::Release(ReleaseCause::Cancellation));
                assert_eq!(releases, status.holds_reserved_stock(), "cancel from {status}");
            }
        }
    }

    #[test]
    fn fulfillment_start_reserves_exactly_once() {
        let table = TransitionTable::canonical();
        assert_eq!(
            table.lookup(Confirmed, Packed).unwrap().effect,
            Some(InventoryEffect::Reserve)
        );
        assert_eq!(
            table.lookup(Confirmed, ShipmentRequested).unwrap().effect,
            Some(InventoryEffect::Reserve)
        );
        // Already reserved when the shipment was requested.
        assert_eq!(table.lookup(ShipmentRequested, Packed).unwrap().effect, None);
    }

    #[test]
    fn returned_releases_with_return_cause() {
        let edge = TransitionTable::canonical()
            .lookup(ReturnProcessing, Returned)
            .unwrap();
        assert_eq!(
            edge.effect,
            Some(InventoryEffect::Release(ReleaseCause::Return))
        );
    }

    #[test]
    fn canonical_edges_match_status_docs() {
        use InventoryEffect::{Release, Reserve};
        use ReleaseCause::{Cancellation, Return};

        let expected = [
            (PendingConfirmation, Confirmed, None),
            (PendingConfirmation, Canceled, None),
            (Confirmed, ShipmentRequested, Some(Reserve)),
            (Confirmed, Packed, Some(Reserve)),
            (Confirmed, Canceled, None),
            (ShipmentRequested, Packed, None),
            (ShipmentRequested, Canceled, Some(Release(Cancellation))),
            (Packed, Shipped, None),
            (Packed, Canceled, Some(Release(Cancellation))),
            (Shipped, Delivering, None),
            (Shipped, Delivered, None),
            (Shipped, Canceled, Some(Release(Cancellation))),
            (Delivering, Delivered, None),
            (Delivering, Canceled, Some(Release(Cancellation))),
            (Delivered, ReturnRequested, None),
            (ReturnRequested, ReturnProcessing, None),
            (ReturnRequested, Canceled, None),
            (ReturnProcessing, Returned, Some(Release(Return))),
        ];

        let table = TransitionTable::canonical();
        let actual: Vec<_> = OrderStatus::ALL
            .into_iter()
            .flat_map(|from| table.edges(from).iter().map(move |e| (from, e.to, e.effect)))
            .collect();
        assert_eq!(actual.len(), expected.len());
        for edge in expected {
            assert!(actual.contains(&edge), "missing {edge:?}");
        }
    }

    #[test]
    fn backward_moves_are_absent() {
        let table = TransitionTable::canonical();
        assert!(table.lookup(Delivered, Packed).is_none());
        assert!(table.lookup(Packed, Confirmed).is_none());
        assert!(table.lookup(Returned, ReturnProcessing).is_none());
    }

    #[test]
    fn validate_rejects_broken_tables() {
        const MISSING: &[Row] = &[Row {
            from: PendingConfirmation,
            edges: &[],
        }];
        assert_eq!(
            TransitionTable::from_rows(MISSING).validate(),
            Err(TableError::MissingRow(Confirmed))
        );

        const TERMINAL_EXIT: &[Row] = &[
            Row { from: PendingConfirmation, edges: &[] },
            Row { from: Confirmed, edges: &[] },
            Row { from: ShipmentRequested, edges: &[] },
            Row { from: Packed, edges: &[] },
            Row { from: Shipped, edges: &[] },
            Row { from: Delivering, edges: &[] },
            Row { from: Delivered, edges: &[] },
            Row { from: ReturnRequested, edges: &[] },
            Row { from: ReturnProcessing, edges: &[] },
            Row { from: Returned, edges: &[] },
            Row { from: Canceled, edges: &[Edge::plain(Confirmed)] },
        ];
        assert_eq!(
            TransitionTable::from_rows(TERMINAL_EXIT).validate(),
            Err(TableError::TerminalHasEdges(Canceled))
        );
    }

    #[test]
    fn inventory_effect_serializes_tagged() {
        let json =
            serde_json::to_value(InventoryEffect::Release(ReleaseCause::Cancellation)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"effect": "release", "cause": "cancellation"})
        );
    }
}
