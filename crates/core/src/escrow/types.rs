//! Escrow domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fee::FeeBreakdown;

/// Lifecycle state of an escrow hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    /// Funds are held for the session.
    Held,
    /// Funds went to the payee.
    Released,
    /// Funds went back to the payer.
    Refunded,
    /// Frozen until an administrative decision.
    Disputed,
}

impl EscrowStatus {
    /// Returns the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Released => "released",
            Self::Refunded => "refunded",
            Self::Disputed => "disputed",
        }
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to the unreleased part of a partial release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderDisposition {
    /// Remainder stays in escrow; the escrow remains `held`.
    KeepHeld,
    /// Remainder is credited to the payer; the escrow becomes `released`.
    RefundPayer,
}

/// How much of the escrow to release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Release the entire held amount.
    Full,
    /// Release part of the held amount.
    Partial {
        /// Amount released to the payee, before fees.
        amount: Decimal,
        /// Fate of the rest.
        remainder: RemainderDisposition,
    },
}

/// Administrative decision on a disputed escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeDecision {
    /// Pay the payee as a full release.
    Release,
    /// Return everything to the payer.
    Refund,
}

/// Money movements a release must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleasePlan {
    /// Fee split of the released amount; `net` is credited to the payee.
    pub fee: FeeBreakdown,
    /// Amount credited back to the payer.
    pub payer_refund: Decimal,
    /// Amount still held afterwards.
    pub remaining_held: Decimal,
    /// Escrow status afterwards.
    pub new_status: EscrowStatus,
}

/// Money movements a refund must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundPlan {
    /// Amount credited back to the payer.
    pub amount: Decimal,
    /// Escrow status afterwards.
    pub new_status: EscrowStatus,
}

/// Outcome of an administrative dispute decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeResolution {
    /// Release to the payee.
    Release(ReleasePlan),
    /// Refund to the payer.
    Refund(RefundPlan),
}
