//! Dispute state machine.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dispute::types::{DisputeOutcome, DisputeStatus};
use crate::error::LedgerError;
use crate::ledger::validation::validate_amount;
use crate::payment::types::{PaymentStatus, Transition};

/// What resolving a dispute requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Status the dispute moves to.
    pub new_status: DisputeStatus,
    /// Amount to debit from the payee's wallet; zero when the dispute was won.
    pub clawback: Decimal,
}

/// Stateless service for dispute transitions.
pub struct DisputeService;

impl DisputeService {
    /// Validates opening a dispute against a payment.
    ///
    /// # Errors
    ///
    /// - `PaymentNotSettled` unless the payment succeeded
    /// - `InvalidAmount` if the amount is invalid or exceeds the payment
    pub fn validate_open(
        payment_id: Uuid,
        payment_status: PaymentStatus,
        payment_amount: Decimal,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        validate_amount(amount)?;
        if payment_status != PaymentStatus::Succeeded {
            return Err(LedgerError::PaymentNotSettled(payment_id));
        }
        if amount > payment_amount {
            return Err(LedgerError::InvalidAmount(format!(
                "dispute amount {amount} exceeds payment amount {payment_amount}"
            )));
        }
        Ok(())
    }

    /// Moves a dispute into review.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the dispute is already decided.
    pub fn mark_under_review(from: DisputeStatus) -> Result<Transition, LedgerError> {
        match from {
            DisputeStatus::NeedsResponse => Ok(Transition::Changed),
            DisputeStatus::UnderReview => Ok(Transition::Unchanged),
            DisputeStatus::Won | DisputeStatus::Lost => Err(LedgerError::invalid_transition(
                "dispute",
                from,
                DisputeStatus::UnderReview,
            )),
        }
    }

    /// Plans the final decision on an open dispute.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the dispute is already decided.
    pub fn resolve(
        from: DisputeStatus,
        outcome: DisputeOutcome,
        disputed_amount: Decimal,
    ) -> Result<Resolution, LedgerError> {
        if !from.is_open() {
            return Err(LedgerError::invalid_transition(
                "dispute",
                from,
                outcome.status(),
            ));
        }
        let clawback = match outcome {
            DisputeOutcome::Won => Decimal::ZERO,
            DisputeOutcome::Lost => disputed_amount,
        };
        Ok(Resolution {
            new_status: outcome.status(),
            clawback,
        })
    }
}
