//! Payment, refund and payout state transitions.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::fee::FeeCalculator;
use crate::ledger::types::TransactionStatus;
use crate::ledger::validation::validate_amount;
use crate::payment::types::{
    PaymentPurpose, PaymentStatus, PayoutStatus, RefundStatus, Transition,
};

/// Stateless service for payment lifecycles.
///
/// Terminal states (`succeeded`, `failed`) never move again. Re-applying the
/// current status is reported as [`Transition::Unchanged`] so replayed gateway
/// notifications are harmless.
pub struct PaymentService;

impl PaymentService {
    /// Validates a payment status change.
    ///
    /// Allowed: pending → processing | succeeded | failed,
    /// processing → succeeded | failed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for any other change.
    pub fn payment_transition(
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Transition, LedgerError> {
        use PaymentStatus::{Failed, Pending, Processing, Succeeded};

        match (from, to) {
            _ if from == to => Ok(Transition::Unchanged),
            (Pending, Processing | Succeeded | Failed) | (Processing, Succeeded | Failed) => {
                Ok(Transition::Changed)
            }
            _ => Err(LedgerError::invalid_transition("payment", from, to)),
        }
    }

    /// Validates a refund status change: pending → succeeded | failed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for any other change.
    pub fn refund_transition(
        from: RefundStatus,
        to: RefundStatus,
    ) -> Result<Transition, LedgerError> {
        match (from, to) {
            _ if from == to => Ok(Transition::Unchanged),
            (RefundStatus::Pending, RefundStatus::Succeeded | RefundStatus::Failed) => {
                Ok(Transition::Changed)
            }
            _ => Err(LedgerError::invalid_transition("refund", from, to)),
        }
    }

    /// Validates a payout status change.
    ///
    /// Allowed: pending → processing | succeeded | failed,
    /// processing → succeeded | failed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for any other change.
    pub fn payout_transition(
        from: PayoutStatus,
        to: PayoutStatus,
    ) -> Result<Transition, LedgerError> {
        use PayoutStatus::{Failed, Pending, Processing, Succeeded};

        match (from, to) {
            _ if from == to => Ok(Transition::Unchanged),
            (Pending, Processing | Succeeded | Failed) | (Processing, Succeeded | Failed) => {
                Ok(Transition::Changed)
            }
            _ => Err(LedgerError::invalid_transition("payout", from, to)),
        }
    }

    /// Computes the service fee charged when a payment settles.
    ///
    /// Session payments pay their fee at escrow release and top-ups are
    /// free, so only subscriptions carry a fee here.
    ///
    /// # Errors
    ///
    /// Propagates fee validation errors.
    pub fn service_fee(
        purpose: PaymentPurpose,
        amount: Decimal,
        fee_percentage: Decimal,
    ) -> Result<Decimal, LedgerError> {
        match purpose {
            PaymentPurpose::Subscription { .. } => FeeCalculator::fee(amount, fee_percentage),
            PaymentPurpose::Session { .. } | PaymentPurpose::TopUp => {
                validate_amount(amount)?;
                Ok(Decimal::ZERO)
            }
        }
    }

    /// Validates a refund request against the payment.
    ///
    /// # Arguments
    /// * `payment_id` - The payment being refunded
    /// * `payment_status` - Its current status
    /// * `payment_amount` - Its captured amount
    /// * `already_refunded` - Sum of pending and succeeded refunds
    /// * `requested` - Amount of the new refund
    ///
    /// # Errors
    ///
    /// - `PaymentNotSettled` unless the payment succeeded
    /// - `InvalidAmount` if the refund total would exceed the payment
    pub fn validate_refund(
        payment_id: Uuid,
        payment_status: PaymentStatus,
        payment_amount: Decimal,
        already_refunded: Decimal,
        requested: Decimal,
    ) -> Result<(), LedgerError> {
        validate_amount(requested)?;
        if payment_status != PaymentStatus::Succeeded {
            return Err(LedgerError::PaymentNotSettled(payment_id));
        }
        let total = already_refunded + requested;
        if total > payment_amount {
            return Err(LedgerError::InvalidAmount(format!(
                "refunds totalling {total} exceed payment amount {payment_amount}"
            )));
        }
        Ok(())
    }

    /// Ledger status recorded for a payment status.
    #[must_use]
    pub const fn payment_ledger_status(status: PaymentStatus) -> TransactionStatus {
        match status {
            PaymentStatus::Pending => TransactionStatus::Pending,
            PaymentStatus::Processing => TransactionStatus::Processing,
            PaymentStatus::Succeeded => TransactionStatus::Completed,
            PaymentStatus::Failed => TransactionStatus::Failed,
        }
    }

    /// Ledger status recorded for a refund status.
    #[must_use]
    pub const fn refund_ledger_status(status: RefundStatus) -> TransactionStatus {
        match status {
            RefundStatus::Pending => TransactionStatus::Pending,
            RefundStatus::Succeeded => TransactionStatus::Completed,
            RefundStatus::Failed => TransactionStatus::Failed,
        }
    }

    /// Ledger status recorded for a payout status.
    #[must_use]
    pub const fn payout_ledger_status(status: PayoutStatus) -> TransactionStatus {
        match status {
            PayoutStatus::Pending => TransactionStatus::Pending,
            PayoutStatus::Processing => TransactionStatus::Processing,
            PayoutStatus::Succeeded => TransactionStatus::Completed,
            PayoutStatus::Failed => TransactionStatus::Failed,
        }
    }
}
