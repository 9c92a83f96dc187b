//! Ledger record taxonomy.

use serde::{Deserialize, Serialize};

/// What a ledger record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Gateway payment from a user.
    Payment,
    /// Money returned to a payer through the gateway.
    Refund,
    /// Money sent to a mentor's payout method.
    Payout,
    /// Funds placed in escrow for a session.
    EscrowHold,
    /// Escrowed funds credited to the payee.
    EscrowRelease,
    /// Escrowed funds credited back to the payer.
    EscrowRefund,
    /// Escrow frozen pending a dispute decision.
    EscrowDispute,
    /// Direct wallet credit.
    WalletCredit,
    /// Direct wallet debit.
    WalletDebit,
    /// Platform fee collected.
    PlatformFee,
    /// Chargeback status change.
    Dispute,
    /// Funds reclaimed from a wallet after a lost chargeback.
    DisputeClawback,
}

/// Direction of a record from the owning user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Money arriving to the user.
    Inflow,
    /// Money leaving the user.
    Outflow,
    /// Status-only record.
    Neutral,
}

impl TransactionType {
    /// Returns the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Refund => "refund",
            Self::Payout => "payout",
            Self::EscrowHold => "escrow_hold",
            Self::EscrowRelease => "escrow_release",
            Self::EscrowRefund => "escrow_refund",
            Self::EscrowDispute => "escrow_dispute",
            Self::WalletCredit => "wallet_credit",
            Self::WalletDebit => "wallet_debit",
            Self::PlatformFee => "platform_fee",
            Self::Dispute => "dispute",
            Self::DisputeClawback => "dispute_clawback",
        }
    }

    /// Classifies the record for statements.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Refund | Self::EscrowRelease | Self::EscrowRefund | Self::WalletCredit => {
                Direction::Inflow
            }
            Self::Payment
            | Self::Payout
            | Self::EscrowHold
            | Self::WalletDebit
            | Self::PlatformFee
            | Self::DisputeClawback => Direction::Outflow,
            Self::EscrowDispute | Self::Dispute => Direction::Neutral,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status carried by a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Initiated, awaiting the gateway.
    Pending,
    /// Gateway is processing.
    Processing,
    /// Settled.
    Completed,
    /// Gateway or business rule rejected it.
    Failed,
    /// Withdrawn before settlement.
    Cancelled,
}

impl TransactionStatus {
    /// Returns the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_of_money_movements() {
        assert_eq!(TransactionType::EscrowRelease.direction(), Direction::Inflow);
        assert_eq!(TransactionType::EscrowHold.direction(), Direction::Outflow);
        assert_eq!(TransactionType::DisputeClawback.direction(), Direction::Outflow);
        assert_eq!(TransactionType::Dispute.direction(), Direction::Neutral);
    }

    #[test]
    fn test_serde_matches_database_names() {
        let json = serde_json::to_string(&TransactionType::EscrowRelease).unwrap();
        assert_eq!(json, format!("\"{}\"", TransactionType::EscrowRelease.as_str()));
        let status: TransactionStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, TransactionStatus::Cancelled);
    }
}
