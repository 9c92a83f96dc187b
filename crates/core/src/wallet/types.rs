//! Wallet mutation types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a wallet mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Increases the balance.
    Credit,
    /// Decreases the balance.
    Debit,
}

impl EntryKind {
    /// Applies the kind's sign to a positive magnitude.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }

    /// Returns the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a wallet mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A gateway payment (wallet top-up).
    Payment,
    /// A gateway refund.
    Refund,
    /// A payout to the mentor's bank.
    Payout,
    /// Escrow released to the payee.
    EscrowRelease,
    /// Escrow returned to the payer.
    EscrowRefund,
    /// Funds reclaimed after a lost dispute.
    DisputeClawback,
    /// Manual correction.
    Adjustment,
}

/// Link from a wallet mutation to the record that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletReference {
    /// Id of the referenced record.
    pub id: Uuid,
    /// Kind of the referenced record.
    pub kind: ReferenceKind,
}

impl WalletReference {
    /// Creates a reference.
    #[must_use]
    pub const fn new(id: Uuid, kind: ReferenceKind) -> Self {
        Self { id, kind }
    }
}
