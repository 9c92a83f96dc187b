//! `SeaORM` active enums mirroring the PostgreSQL enum types.
//!
//! Each enum converts to and from its `mentorledger-core` counterpart so
//! repositories can hand database values straight to the domain services.

use mentorledger_core::dispute::DisputeStatus as CoreDisputeStatus;
use mentorledger_core::escrow::EscrowStatus as CoreEscrowStatus;
use mentorledger_core::ledger::{
    TransactionStatus as CoreTransactionStatus, TransactionType as CoreTransactionType,
};
use mentorledger_core::payment::{
    Gateway as CoreGateway, PaymentStatus as CorePaymentStatus, PayoutStatus as CorePayoutStatus,
    RefundStatus as CoreRefundStatus,
};
use mentorledger_core::wallet::{EntryKind as CoreEntryKind, ReferenceKind as CoreReferenceKind};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

macro_rules! mirror_enum {
    ($db:ident <=> $core:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$core> for $db {
            fn from(value: $core) -> Self {
                match value {
                    $($core::$variant => Self::$variant),+
                }
            }
        }

        impl From<$db> for $core {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant),+
                }
            }
        }
    };
}

/// Wallet ledger row direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "wallet_entry_kind")]
pub enum WalletEntryKind {
    /// Increases the balance.
    #[sea_orm(string_value = "credit")]
    Credit,
    /// Decreases the balance.
    #[sea_orm(string_value = "debit")]
    Debit,
}

mirror_enum!(WalletEntryKind <=> CoreEntryKind { Credit, Debit });

/// What caused a wallet mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "wallet_reference_type")]
pub enum WalletReferenceType {
    /// Gateway payment.
    #[sea_orm(string_value = "payment")]
    Payment,
    /// Gateway refund.
    #[sea_orm(string_value = "refund")]
    Refund,
    /// Payout.
    #[sea_orm(string_value = "payout")]
    Payout,
    /// Escrow released to the payee.
    #[sea_orm(string_value = "escrow_release")]
    EscrowRelease,
    /// Escrow returned to the payer.
    #[sea_orm(string_value = "escrow_refund")]
    EscrowRefund,
    /// Lost dispute.
    #[sea_orm(string_value = "dispute_clawback")]
    DisputeClawback,
    /// Manual correction.
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

mirror_enum!(WalletReferenceType <=> CoreReferenceKind {
    Payment,
    Refund,
    Payout,
    EscrowRelease,
    EscrowRefund,
    DisputeClawback,
    Adjustment,
});

/// Payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_gateway")]
pub enum PaymentGateway {
    /// Stripe
    #[sea_orm(string_value = "stripe")]
    Stripe,
    /// PayPal
    #[sea_orm(string_value = "paypal")]
    Paypal,
    /// Razorpay
    #[sea_orm(string_value = "razorpay")]
    Razorpay,
    /// UPI
    #[sea_orm(string_value = "upi")]
    Upi,
}

mirror_enum!(PaymentGateway <=> CoreGateway { Stripe, Paypal, Razorpay, Upi });

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
pub enum PaymentStatus {
    /// Awaiting confirmation.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Gateway processing.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Captured.
    #[sea_orm(string_value = "succeeded")]
    Succeeded,
    /// Rejected.
    #[sea_orm(string_value = "failed")]
    Failed,
}

mirror_enum!(PaymentStatus <=> CorePaymentStatus { Pending, Processing, Succeeded, Failed });

/// Refund status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "refund_status")]
pub enum RefundStatus {
    /// Awaiting the gateway.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Returned to the payer.
    #[sea_orm(string_value = "succeeded")]
    Succeeded,
    /// Rejected.
    #[sea_orm(string_value = "failed")]
    Failed,
}

mirror_enum!(RefundStatus <=> CoreRefundStatus { Pending, Succeeded, Failed });

/// Payout status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payout_status")]
pub enum PayoutStatus {
    /// Requested; funds reserved.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Submitted to the gateway.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Delivered.
    #[sea_orm(string_value = "succeeded")]
    Succeeded,
    /// Rejected.
    #[sea_orm(string_value = "failed")]
    Failed,
}

mirror_enum!(PayoutStatus <=> CorePayoutStatus { Pending, Processing, Succeeded, Failed });

/// Escrow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "escrow_status")]
pub enum EscrowStatus {
    /// Funds held.
    #[sea_orm(string_value = "held")]
    Held,
    /// Paid to the payee.
    #[sea_orm(string_value = "released")]
    Released,
    /// Returned to the payer.
    #[sea_orm(string_value = "refunded")]
    Refunded,
    /// Frozen pending a decision.
    #[sea_orm(string_value = "disputed")]
    Disputed,
}

mirror_enum!(EscrowStatus <=> CoreEscrowStatus { Held, Released, Refunded, Disputed });

/// Dispute status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "dispute_status")]
pub enum DisputeStatus {
    /// Awaiting evidence.
    #[sea_orm(string_value = "needs_response")]
    NeedsResponse,
    /// Under review.
    #[sea_orm(string_value = "under_review")]
    UnderReview,
    /// Platform kept the funds.
    #[sea_orm(string_value = "won")]
    Won,
    /// Funds returned to the cardholder.
    #[sea_orm(string_value = "lost")]
    Lost,
}

mirror_enum!(DisputeStatus <=> CoreDisputeStatus { NeedsResponse, UnderReview, Won, Lost });

/// What a platform fee was collected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "fee_reference_kind")]
pub enum FeeReferenceKind {
    /// Subscription payment.
    #[sea_orm(string_value = "payment")]
    Payment,
    /// Mentor payout.
    #[sea_orm(string_value = "payout")]
    Payout,
    /// Escrow release.
    #[sea_orm(string_value = "escrow_release")]
    EscrowRelease,
}

/// Ledger record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ledger_transaction_type")]
pub enum TransactionType {
    /// Gateway payment.
    #[sea_orm(string_value = "payment")]
    Payment,
    /// Gateway refund.
    #[sea_orm(string_value = "refund")]
    Refund,
    /// Payout.
    #[sea_orm(string_value = "payout")]
    Payout,
    /// Escrow hold.
    #[sea_orm(string_value = "escrow_hold")]
    EscrowHold,
    /// Escrow release.
    #[sea_orm(string_value = "escrow_release")]
    EscrowRelease,
    /// Escrow refund.
    #[sea_orm(string_value = "escrow_refund")]
    EscrowRefund,
    /// Escrow dispute.
    #[sea_orm(string_value = "escrow_dispute")]
    EscrowDispute,
    /// Direct wallet credit.
    #[sea_orm(string_value = "wallet_credit")]
    WalletCredit,
    /// Direct wallet debit.
    #[sea_orm(string_value = "wallet_debit")]
    WalletDebit,
    /// Platform fee.
    #[sea_orm(string_value = "platform_fee")]
    PlatformFee,
    /// Dispute status change.
    #[sea_orm(string_value = "dispute")]
    Dispute,
    /// Dispute clawback.
    #[sea_orm(string_value = "dispute_clawback")]
    DisputeClawback,
}

mirror_enum!(TransactionType <=> CoreTransactionType {
    Payment,
    Refund,
    Payout,
    EscrowHold,
    EscrowRelease,
    EscrowRefund,
    EscrowDispute,
    WalletCredit,
    WalletDebit,
    PlatformFee,
    Dispute,
    DisputeClawback,
});

/// Ledger record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ledger_transaction_status")]
pub enum TransactionStatus {
    /// Initiated.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// In flight.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Settled.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Rejected.
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Withdrawn.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

mirror_enum!(TransactionStatus <=> CoreTransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
});

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ActiveEnum, Iterable};

    #[test]
    fn test_core_round_trip() {
        for status in [
            CoreEscrowStatus::Held,
            CoreEscrowStatus::Released,
            CoreEscrowStatus::Refunded,
            CoreEscrowStatus::Disputed,
        ] {
            let db: EscrowStatus = status.into();
            assert_eq!(CoreEscrowStatus::from(db), status);
        }
    }

    #[test]
    fn test_string_values_match_core_names() {
        for status in TransactionType::iter() {
            let core: CoreTransactionType = status.into();
            assert_eq!(status.to_value(), core.as_str());
        }
        for status in DisputeStatus::iter() {
            let core: CoreDisputeStatus = status.into();
            assert_eq!(status.to_value(), core.as_str());
        }
    }
}
