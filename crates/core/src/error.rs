//! Ledger error taxonomy.
//!
//! Every failure a ledger operation can surface is a variant of
//! [`LedgerError`]. Storage layers wrap these rather than inventing their own
//! business errors, so callers can match on a single enum.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Balance Errors ==========
    /// A debit would drive the wallet balance below zero.
    #[error("Insufficient balance in wallet {wallet_id}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        /// The wallet that was debited.
        wallet_id: Uuid,
        /// Balance at the time of the attempt.
        balance: Decimal,
        /// Amount the caller tried to debit.
        requested: Decimal,
    },

    /// Wallet does not exist.
    #[error("Wallet not found: {0}")]
    WalletNotFound(Uuid),

    /// Wallet is frozen and cannot be mutated.
    #[error("Wallet {0} is inactive")]
    WalletInactive(Uuid),

    // ========== Validation Errors ==========
    /// Amount is zero, negative, over-precise, or exceeds a cap.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code is not supported.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Gateway payload is missing a required field or is malformed.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // ========== Escrow Errors ==========
    /// A held escrow already exists for the session.
    #[error("Session {0} already has a held escrow")]
    DuplicateEscrow(Uuid),

    /// Escrow is not in the held state.
    #[error("Escrow {escrow_id} is not held (status: {status})")]
    NotHeld {
        /// The escrow that was addressed.
        escrow_id: Uuid,
        /// Its current status.
        status: String,
    },

    /// Escrow does not exist.
    #[error("Escrow not found: {0}")]
    EscrowNotFound(Uuid),

    // ========== Lifecycle Errors ==========
    /// Payment does not exist.
    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    /// Payment has not settled, so it cannot be refunded or disputed.
    #[error("Payment {0} has not succeeded")]
    PaymentNotSettled(Uuid),

    /// A payment with the same gateway reference already exists.
    #[error("Payment already recorded for gateway reference {0}")]
    DuplicatePayment(String),

    /// Refund does not exist.
    #[error("Refund not found: {0}")]
    RefundNotFound(Uuid),

    /// Payout does not exist.
    #[error("Payout not found: {0}")]
    PayoutNotFound(Uuid),

    /// Dispute does not exist.
    #[error("Dispute not found: {0}")]
    DisputeNotFound(Uuid),

    /// Gateway referenced an object this ledger has no record of.
    #[error("Unknown gateway reference: {0}")]
    UnknownGatewayReference(String),

    /// Status change is not permitted from the current state.
    #[error("Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        /// Kind of record, e.g. `payment` or `dispute`.
        entity: &'static str,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    // ========== Event Errors ==========
    /// Inbound event was already processed.
    #[error("Duplicate event {external_event_id} from {gateway}")]
    DuplicateEvent {
        /// Gateway that sent the event.
        gateway: String,
        /// Gateway-assigned event id.
        external_event_id: String,
    },

    /// Gateway reported a state that contradicts local records.
    #[error("External inconsistency: {0}")]
    ExternalInconsistency(String),

    // ========== Storage Errors ==========
    /// Lock timeout or serialization failure; safe to retry.
    #[error("Persistence conflict, please retry: {0}")]
    PersistenceConflict(String),

    /// Unexpected storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns a stable error code for logs and callers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::WalletNotFound(_) => "WALLET_NOT_FOUND",
            Self::WalletInactive(_) => "WALLET_INACTIVE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::DuplicateEscrow(_) => "DUPLICATE_ESCROW",
            Self::NotHeld { .. } => "NOT_HELD",
            Self::EscrowNotFound(_) => "ESCROW_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::PaymentNotSettled(_) => "PAYMENT_NOT_SETTLED",
            Self::DuplicatePayment(_) => "DUPLICATE_PAYMENT",
            Self::RefundNotFound(_) => "REFUND_NOT_FOUND",
            Self::PayoutNotFound(_) => "PAYOUT_NOT_FOUND",
            Self::DisputeNotFound(_) => "DISPUTE_NOT_FOUND",
            Self::UnknownGatewayReference(_) => "UNKNOWN_GATEWAY_REFERENCE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::DuplicateEvent { .. } => "DUPLICATE_EVENT",
            Self::ExternalInconsistency(_) => "EXTERNAL_INCONSISTENCY",
            Self::PersistenceConflict(_) => "PERSISTENCE_CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns true if the operation may succeed when retried unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceConflict(_))
    }

    /// Returns true if the error needs operator attention.
    #[must_use]
    pub fn requires_alert(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::ExternalInconsistency(_))
    }

    /// Builds an [`LedgerError::InvalidTransition`] from displayable statuses.
    pub fn invalid_transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        let wallet_id = Uuid::new_v4();
        assert_eq!(
            LedgerError::InsufficientBalance {
                wallet_id,
                balance: dec!(20.00),
                requested: dec!(25.00),
            }
            .error_code(),
            "INSUFFICIENT_BALANCE"
        );
        assert_eq!(LedgerError::DuplicateEscrow(Uuid::nil()).error_code(), "DUPLICATE_ESCROW");
        assert_eq!(
            LedgerError::PersistenceConflict("lock timeout".into()).error_code(),
            "PERSISTENCE_CONFLICT"
        );
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(LedgerError::PersistenceConflict("serialization".into()).is_retryable());
        assert!(!LedgerError::InvalidAmount("zero".into()).is_retryable());
        assert!(!LedgerError::WalletNotFound(Uuid::nil()).is_retryable());
        assert!(!LedgerError::Storage("down".into()).is_retryable());
    }

    #[test]
    fn test_alerting_errors() {
        assert!(LedgerError::ExternalInconsistency("refund after failure".into()).requires_alert());
        assert!(LedgerError::Storage("disk full".into()).requires_alert());
        assert!(!LedgerError::WalletInactive(Uuid::nil()).requires_alert());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = LedgerError::invalid_transition("payment", "failed", "succeeded");
        assert_eq!(err.to_string(), "Invalid payment transition from failed to succeeded");
    }

    #[test]
    fn test_insufficient_balance_message() {
        let wallet_id = Uuid::nil();
        let err = LedgerError::InsufficientBalance {
            wallet_id,
            balance: dec!(20.00),
            requested: dec!(25.00),
        };
        assert_eq!(
            err.to_string(),
            format!("Insufficient balance in wallet {wallet_id}: balance 20.00, requested 25.00")
        );
    }
}
