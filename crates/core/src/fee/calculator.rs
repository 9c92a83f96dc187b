//! Platform fee calculation.

use mentorledger_shared::types::round_to_minor;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::LedgerError;
use crate::ledger::validation::validate_amount;

/// A gross amount split into the platform's fee and the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    /// Amount the fee was taken from.
    pub gross: Decimal,
    /// Fee percentage applied.
    pub percentage: Decimal,
    /// Fee, rounded to minor units.
    pub fee: Decimal,
    /// `gross - fee`.
    pub net: Decimal,
}

/// Stateless fee calculator.
pub struct FeeCalculator;

impl FeeCalculator {
    /// Computes `amount * percentage / 100`, rounded half-up to two decimals.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAmount` if the amount is not a positive
    /// two-decimal value within range, or the percentage lies outside
    /// `[0, 100]`.
    pub fn fee(amount: Decimal, percentage: Decimal) -> Result<Decimal, LedgerError> {
        validate_amount(amount)?;
        Self::validate_percentage(percentage)?;
        let fee = amount
            .checked_mul(percentage)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| {
                LedgerError::InvalidAmount(format!(
                    "fee on {amount} at {percentage}% overflows"
                ))
            })?;
        Ok(round_to_minor(fee))
    }

    /// Splits `amount` into fee and net.
    ///
    /// # Errors
    ///
    /// Same as [`FeeCalculator::fee`].
    pub fn split(amount: Decimal, percentage: Decimal) -> Result<FeeBreakdown, LedgerError> {
        let fee = Self::fee(amount, percentage)?;
        Ok(FeeBreakdown {
            gross: amount,
            percentage,
            fee,
            net: amount - fee,
        })
    }

    /// Checks that a fee percentage lies within `[0, 100]`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAmount` when out of range.
    pub fn validate_percentage(percentage: Decimal) -> Result<(), LedgerError> {
        if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
            return Err(LedgerError::InvalidAmount(format!(
                "fee percentage must be between 0 and 100, got {percentage}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentorledger_shared::types::MAX_AMOUNT;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(100.00), dec!(10), dec!(10.00))]
    #[case(dec!(33.33), dec!(7.5), dec!(2.50))]
    #[case(dec!(500.00), dec!(10), dec!(50.00))]
    #[case(dec!(0.05), dec!(10), dec!(0.01))]
    #[case(dec!(0.04), dec!(10), dec!(0.00))]
    #[case(dec!(250.00), dec!(0), dec!(0.00))]
    #[case(dec!(250.00), dec!(100), dec!(250.00))]
    fn test_fee(#[case] amount: Decimal, #[case] percentage: Decimal, #[case] expected: Decimal) {
        assert_eq!(FeeCalculator::fee(amount, percentage).unwrap(), expected);
    }

    #[test]
    fn test_split_escrow_release() {
        let breakdown = FeeCalculator::split(dec!(500.00), dec!(10)).unwrap();
        assert_eq!(breakdown.fee, dec!(50.00));
        assert_eq!(breakdown.net, dec!(450.00));
        assert_eq!(breakdown.gross, dec!(500.00));
    }

    #[rstest]
    #[case(dec!(-0.01))]
    #[case(dec!(100.01))]
    fn test_percentage_out_of_range(#[case] percentage: Decimal) {
        assert!(matches!(
            FeeCalculator::fee(dec!(100.00), percentage),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[rstest]
    #[case(Decimal::MAX, dec!(100))]
    #[case(Decimal::MAX, dec!(10))]
    #[case(dec!(100000000000000000.00), dec!(10))]
    fn test_oversized_amount_is_rejected(#[case] amount: Decimal, #[case] percentage: Decimal) {
        assert!(matches!(
            FeeCalculator::fee(amount, percentage),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(FeeCalculator::split(amount, percentage).is_err());
    }

    #[test]
    fn test_fee_on_max_amount() {
        let breakdown = FeeCalculator::split(MAX_AMOUNT, dec!(100)).unwrap();
        assert_eq!(breakdown.fee, MAX_AMOUNT);
        assert_eq!(breakdown.net, Decimal::ZERO);
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        assert!(FeeCalculator::fee(Decimal::ZERO, dec!(10)).is_err());
        assert!(FeeCalculator::fee(dec!(-5.00), dec!(10)).is_err());
    }
}
