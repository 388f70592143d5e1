//! Append-only inventory ledger entries.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{InventoryId, LedgerEntryId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Adjustment;

macro_rules! string_enum {
    ($name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownCode;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownCode {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Error returned when a stored code does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub value: String,
}

/// Direction/category of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Inbound,
    Outbound,
    Reservation,
    Release,
    Adjustment,
}

string_enum!(TransactionType, "transaction type" {
    Inbound => "inbound",
    Outbound => "outbound",
    Reservation => "reservation",
    Release => "release",
    Adjustment => "adjustment",
});

/// Business reason recorded with a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Sale,
    Return,
    OrderCancellation,
    Restock,
    Correction,
    Damage,
}

string_enum!(ReasonCode, "reason code" {
    Sale => "sale",
    Return => "return",
    OrderCancellation => "order_cancellation",
    Restock => "restock",
    Correction => "correction",
    Damage => "damage",
});

/// What the ledger entry's `reference_id` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Order,
    Manual,
}

string_enum!(ReferenceType, "reference type" {
    Order => "order",
    Manual => "manual",
});

/// One immutable quantity change against an inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub inventory_id: InventoryId,
    pub delta: i64,
    pub transaction_type: TransactionType,
    pub reason: ReasonCode,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<ReferenceType>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Records an applied adjustment.
    pub fn record(adjustment: &Adjustment) -> Self {
        Self {
            id: LedgerEntryId::new(),
            inventory_id: adjustment.inventory_id,
            delta: adjustment.delta,
            transaction_type: adjustment.transaction_type,
            reason: adjustment.reason,
            reference_id: adjustment.reference_id,
            reference_type: adjustment.reference_type,
            created_at: Utc::now(),
        }
    }
}

/// Sum of the deltas of `entries`.
pub fn ledger_sum<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> i64 {
    entries.into_iter().map(|entry| entry.delta).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip_through_strings() {
        for reason in [
            ReasonCode::Sale,
            ReasonCode::Return,
            ReasonCode::OrderCancellation,
            ReasonCode::Restock,
            ReasonCode::Correction,
            ReasonCode::Damage,
        ] {
            assert_eq!(reason.as_str().parse::<ReasonCode>(), Ok(reason));
        }
        assert_eq!("outbound".parse::<TransactionType>(), Ok(TransactionType::Outbound));
        assert_eq!("order".parse::<ReferenceType>(), Ok(ReferenceType::Order));
    }

    #[test]
    fn unknown_code_names_the_kind() {
        let err = "gift".parse::<ReasonCode>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown reason code: gift");
    }

    #[test]
    fn serde_matches_stored_strings() {
        let json = serde_json::to_string(&ReasonCode::OrderCancellation).unwrap();
        assert_eq!(json, format!("\"{}\"", ReasonCode::OrderCancellation.as_str()));
    }

    #[test]
    fn record_copies_adjustment_fields() {
        let adjustment = Adjustment::manual(InventoryId::new(), 7, ReasonCode::Restock);
        let entry = LedgerEntry::record(&adjustment);
        assert_eq!(entry.inventory_id, adjustment.inventory_id);
        assert_eq!(entry.delta, 7);
        assert_eq!(entry.transaction_type, TransactionType::Inbound);
        assert_eq!(entry.reference_type, Some(ReferenceType::Manual));
    }

    #[test]
    fn ledger_sum_adds_signed_deltas() {
        let inventory_id = InventoryId::new();
        let entries = [
            LedgerEntry::record(&Adjustment::manual(inventory_id, 10, ReasonCode::Restock)),
            LedgerEntry::record(&Adjustment::manual(inventory_id, -4, ReasonCode::Damage)),
        ];
        assert_eq!(ledger_sum(&entries), 6);
    }
}
