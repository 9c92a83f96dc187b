//! Escrow state machine.
//!
//! Every method validates the current status and returns the plan the
//! storage layer must carry out inside one transaction. Nothing here
//! touches storage, so a rejected plan never leaves partial state behind.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::escrow::types::{
    DisputeDecision, DisputeResolution, EscrowStatus, RefundPlan, ReleaseMode, ReleasePlan,
    RemainderDisposition,
};
use crate::fee::FeeCalculator;
use crate::ledger::validation::validate_amount;

/// Stateless service for escrow transitions.
pub struct EscrowService;

impl EscrowService {
    /// Validates the inputs for opening a hold.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a non-positive amount or when payer and
    /// payee are the same user.
    pub fn validate_open(payer_id: Uuid, payee_id: Uuid, amount: Decimal) -> Result<(), LedgerError> {
        validate_amount(amount)?;
        if payer_id == payee_id {
            return Err(LedgerError::InvalidAmount(
                "payer and payee must be different users".to_string(),
            ));
        }
        Ok(())
    }

    /// Plans a release of a held escrow.
    ///
    /// # Arguments
    /// * `escrow_id` - The escrow being released
    /// * `status` - Its current status
    /// * `held` - Amount currently held
    /// * `mode` - Full or partial release
    /// * `fee_percentage` - Platform fee applied to the released amount
    ///
    /// # Errors
    ///
    /// - `NotHeld` unless the escrow is held
    /// - `InvalidAmount` if a partial amount is invalid or exceeds the hold
    pub fn plan_release(
        escrow_id: Uuid,
        status: EscrowStatus,
        held: Decimal,
        mode: ReleaseMode,
        fee_percentage: Decimal,
    ) -> Result<ReleasePlan, LedgerError> {
        Self::ensure_held(escrow_id, status)?;
        Self::release_plan(held, mode, fee_percentage)
    }

    /// Plans returning the whole hold to the payer, without fee.
    ///
    /// # Errors
    ///
    /// Returns `NotHeld` unless the escrow is held.
    pub fn plan_refund(
        escrow_id: Uuid,
        status: EscrowStatus,
        held: Decimal,
    ) -> Result<RefundPlan, LedgerError> {
        Self::ensure_held(escrow_id, status)?;
        Ok(Self::refund_plan(held))
    }

    /// Freezes a held escrow.
    ///
    /// # Errors
    ///
    /// Returns `NotHeld` unless the escrow is held.
    pub fn dispute(escrow_id: Uuid, status: EscrowStatus) -> Result<EscrowStatus, LedgerError> {
        Self::ensure_held(escrow_id, status)?;
        Ok(EscrowStatus::Disputed)
    }

    /// Plans the administrative exit from `disputed`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the escrow is disputed.
    pub fn plan_resolution(
        status: EscrowStatus,
        held: Decimal,
        decision: DisputeDecision,
        fee_percentage: Decimal,
    ) -> Result<DisputeResolution, LedgerError> {
        match (status, decision) {
            (EscrowStatus::Disputed, DisputeDecision::Release) => Ok(DisputeResolution::Release(
                Self::release_plan(held, ReleaseMode::Full, fee_percentage)?,
            )),
            (EscrowStatus::Disputed, DisputeDecision::Refund) => {
                Ok(DisputeResolution::Refund(Self::refund_plan(held)))
            }
            (_, DisputeDecision::Release) => Err(LedgerError::invalid_transition(
                "escrow",
                status,
                EscrowStatus::Released,
            )),
            (_, DisputeDecision::Refund) => Err(LedgerError::invalid_transition(
                "escrow",
                status,
                EscrowStatus::Refunded,
            )),
        }
    }

    fn ensure_held(escrow_id: Uuid, status: EscrowStatus) -> Result<(), LedgerError> {
        if status == EscrowStatus::Held {
            Ok(())
        } else {
            Err(LedgerError::NotHeld {
                escrow_id,
                status: status.to_string(),
            })
        }
    }

    fn release_plan(
        held: Decimal,
        mode: ReleaseMode,
        fee_percentage: Decimal,
    ) -> Result<ReleasePlan, LedgerError> {
        let (amount, remainder_disposition) = match mode {
            ReleaseMode::Full => (held, RemainderDisposition::RefundPayer),
            ReleaseMode::Partial { amount, remainder } => {
                validate_amount(amount)?;
                if amount > held {
                    return Err(LedgerError::InvalidAmount(format!(
                        "release amount {amount} exceeds held amount {held}"
                    )));
                }
                (amount, remainder)
            }
        };

        let fee = FeeCalculator::split(amount, fee_percentage)?;
        let remainder = held - amount;

        let plan = match remainder_disposition {
            _ if remainder.is_zero() => ReleasePlan {
                fee,
                payer_refund: Decimal::ZERO,
                remaining_held: Decimal::ZERO,
                new_status: EscrowStatus::Released,
            },
            RemainderDisposition::KeepHeld => ReleasePlan {
                fee,
                payer_refund: Decimal::ZERO,
                remaining_held: remainder,
                new_status: EscrowStatus::Held,
            },
            RemainderDisposition::RefundPayer => ReleasePlan {
                fee,
                payer_refund: remainder,
                remaining_held: Decimal::ZERO,
                new_status: EscrowStatus::Released,
            },
        };
        Ok(plan)
    }

    fn refund_plan(held: Decimal) -> RefundPlan {
        RefundPlan {
            amount: held,
            new_status: EscrowStatus::Refunded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_full_release_takes_fee() {
        let plan = EscrowService::plan_release(
            Uuid::nil(),
            EscrowStatus::Held,
            dec!(500.00),
            ReleaseMode::Full,
            dec!(10),
        )
        .unwrap();

        assert_eq!(plan.fee.net, dec!(450.00));
        assert_eq!(plan.fee.fee, dec!(50.00));
        assert_eq!(plan.payer_refund, Decimal::ZERO);
        assert_eq!(plan.remaining_held, Decimal::ZERO);
        assert_eq!(plan.new_status, EscrowStatus::Released);
    }

    #[test]
    fn test_partial_release_keep_held() {
        let plan = EscrowService::plan_release(
            Uuid::nil(),
            EscrowStatus::Held,
            dec!(500.00),
            ReleaseMode::Partial {
                amount: dec!(200.00),
                remainder: RemainderDisposition::KeepHeld,
            },
            dec!(10),
        )
        .unwrap();

        assert_eq!(plan.fee.gross, dec!(200.00));
        assert_eq!(plan.fee.net, dec!(180.00));
        assert_eq!(plan.remaining_held, dec!(300.00));
        assert_eq!(plan.payer_refund, Decimal::ZERO);
        assert_eq!(plan.new_status, EscrowStatus::Held);
    }

    #[test]
    fn test_partial_release_refund_payer() {
        let plan = EscrowService::plan_release(
            Uuid::nil(),
            EscrowStatus::Held,
            dec!(500.00),
            ReleaseMode::Partial {
                amount: dec!(200.00),
                remainder: RemainderDisposition::RefundPayer,
            },
            dec!(10),
        )
        .unwrap();

        assert_eq!(plan.payer_refund, dec!(300.00));
        assert_eq!(plan.remaining_held, Decimal::ZERO);
        assert_eq!(plan.new_status, EscrowStatus::Released);
    }

    #[test]
    fn test_partial_release_of_everything_closes_escrow() {
        let plan = EscrowService::plan_release(
            Uuid::nil(),
            EscrowStatus::Held,
            dec!(500.00),
            ReleaseMode::Partial {
                amount: dec!(500.00),
                remainder: RemainderDisposition::KeepHeld,
            },
            dec!(10),
        )
        .unwrap();
        assert_eq!(plan.new_status, EscrowStatus::Released);
        assert_eq!(plan.remaining_held, Decimal::ZERO);
    }

    #[test]
    fn test_partial_release_over_hold_rejected() {
        let result = EscrowService::plan_release(
            Uuid::nil(),
            EscrowStatus::Held,
            dec!(500.00),
            ReleaseMode::Partial {
                amount: dec!(500.01),
                remainder: RemainderDisposition::KeepHeld,
            },
            dec!(10),
        );
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
    }

    #[test]
    fn test_release_requires_held() {
        let escrow_id = Uuid::new_v4();
        for status in [EscrowStatus::Released, EscrowStatus::Refunded, EscrowStatus::Disputed] {
            let err = EscrowService::plan_release(
                escrow_id,
                status,
                dec!(100.00),
                ReleaseMode::Full,
                dec!(10),
            )
            .unwrap_err();
            assert_eq!(
                err,
                LedgerError::NotHeld {
                    escrow_id,
                    status: status.to_string()
                }
            );
        }
    }

    #[test]
    fn test_refund_has_no_fee() {
        let plan =
            EscrowService::plan_refund(Uuid::nil(), EscrowStatus::Held, dec!(500.00)).unwrap();
        assert_eq!(plan.amount, dec!(500.00));
        assert_eq!(plan.new_status, EscrowStatus::Refunded);

        assert!(matches!(
            EscrowService::plan_refund(Uuid::nil(), EscrowStatus::Released, dec!(500.00)),
            Err(LedgerError::NotHeld { .. })
        ));
    }

    #[test]
    fn test_dispute_and_resolution() {
        assert_eq!(
            EscrowService::dispute(Uuid::nil(), EscrowStatus::Held).unwrap(),
            EscrowStatus::Disputed
        );
        assert!(EscrowService::dispute(Uuid::nil(), EscrowStatus::Refunded).is_err());

        let release = EscrowService::plan_resolution(
            EscrowStatus::Disputed,
            dec!(500.00),
            DisputeDecision::Release,
            dec!(10),
        )
        .unwrap();
        assert!(matches!(release, DisputeResolution::Release(plan) if plan.fee.net == dec!(450.00)));

        let refund = EscrowService::plan_resolution(
            EscrowStatus::Disputed,
            dec!(500.00),
            DisputeDecision::Refund,
            dec!(10),
        )
        .unwrap();
        assert!(matches!(refund, DisputeResolution::Refund(plan) if plan.amount == dec!(500.00)));
    }

    #[test]
    fn test_resolution_requires_disputed() {
        let result = EscrowService::plan_resolution(
            EscrowStatus::Held,
            dec!(500.00),
            DisputeDecision::Release,
            dec!(10),
        );
        assert!(matches!(result, Err(LedgerError::InvalidTransition { .. })));
    }

    #[test]
    fn test_validate_open() {
        let payer = Uuid::new_v4();
        let payee = Uuid::new_v4();
        assert!(EscrowService::validate_open(payer, payee, dec!(500.00)).is_ok());
        assert!(EscrowService::validate_open(payer, payer, dec!(500.00)).is_err());
        assert!(EscrowService::validate_open(payer, payee, Decimal::ZERO).is_err());
    }
}
