//! Balance arithmetic for wallet mutations.
//!
//! The storage layer reads the locked balance, asks [`BalanceChange::compute`]
//! for the outcome, and writes both the ledger row and the new balance.

use rust_decimal::Decimal;
use uuid::Uuid;

use super::types::EntryKind;
use crate::error::LedgerError;
use crate::ledger::validation::validate_amount;

/// Outcome of applying one mutation to a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    /// Balance before the mutation.
    pub previous_balance: Decimal,
    /// Signed amount stored on the ledger row.
    pub signed_amount: Decimal,
    /// Balance after the mutation.
    pub new_balance: Decimal,
}

impl BalanceChange {
    /// Computes the effect of crediting or debiting `amount`.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount` is not positive with at most two decimals
    /// - `InsufficientBalance` if a debit would make the balance negative
    pub fn compute(
        wallet_id: Uuid,
        current_balance: Decimal,
        kind: EntryKind,
        amount: Decimal,
    ) -> Result<Self, LedgerError> {
        validate_amount(amount)?;

        let signed_amount = kind.signed(amount);
        let new_balance = current_balance + signed_amount;
        if new_balance < Decimal::ZERO {
            return Err(LedgerError::InsufficientBalance {
                wallet_id,
                balance: current_balance,
                requested: amount,
            });
        }

        Ok(Self {
            previous_balance: current_balance,
            signed_amount,
            new_balance,
        })
    }
}

/// Rebuilds a balance from the signed amounts of its ledger rows.
pub fn replay<I>(signed_amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    signed_amounts.into_iter().sum()
}

/// Returns true if the stored balance equals the replayed ledger.
pub fn is_conserved<I>(stored_balance: Decimal, signed_amounts: I) -> bool
where
    I: IntoIterator<Item = Decimal>,
{
    replay(signed_amounts) == stored_balance
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_credit() {
        let change =
            BalanceChange::compute(Uuid::nil(), dec!(0.00), EntryKind::Credit, dec!(100.00))
                .unwrap();
        assert_eq!(change.previous_balance, dec!(0.00));
        assert_eq!(change.signed_amount, dec!(100.00));
        assert_eq!(change.new_balance, dec!(100.00));
    }

    #[test]
    fn test_debit_to_zero_is_allowed() {
        let change =
            BalanceChange::compute(Uuid::nil(), dec!(40.00), EntryKind::Debit, dec!(40.00))
                .unwrap();
        assert_eq!(change.signed_amount, dec!(-40.00));
        assert_eq!(change.new_balance, Decimal::ZERO);
    }

    #[test]
    fn test_overdraw_is_rejected() {
        let wallet_id = Uuid::new_v4();
        let err = BalanceChange::compute(wallet_id, dec!(20.00), EntryKind::Debit, dec!(25.00))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                wallet_id,
                balance: dec!(20.00),
                requested: dec!(25.00),
            }
        );
    }

    #[test]
    fn test_zero_and_fractional_cents_rejected() {
        assert!(matches!(
            BalanceChange::compute(Uuid::nil(), dec!(10), EntryKind::Credit, Decimal::ZERO),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            BalanceChange::compute(Uuid::nil(), dec!(10), EntryKind::Credit, dec!(0.005)),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_replay_and_conservation() {
        let rows = [dec!(100.00), dec!(-60.00), dec!(0.50)];
        assert_eq!(replay(rows), dec!(40.50));
        assert!(is_conserved(dec!(40.50), rows));
        assert!(!is_conserved(dec!(40.00), rows));
    }
}
