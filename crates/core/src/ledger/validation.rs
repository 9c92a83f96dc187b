//! Amount and currency validation shared by every ledger operation.

use std::str::FromStr;

use mentorledger_shared::types::{Currency, MAX_AMOUNT, MONEY_SCALE, has_valid_scale};
use rust_decimal::Decimal;

use crate::error::LedgerError;

/// Validates a money movement amount: strictly positive, no larger than
/// [`MAX_AMOUNT`], with at most two fractional digits.
///
/// # Errors
///
/// Returns `LedgerError::InvalidAmount` otherwise.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    ensure_bounded(amount)?;
    ensure_scale(amount)
}

/// Validates an amount that may be zero, such as a fee or a recorded net.
///
/// # Errors
///
/// Returns `LedgerError::InvalidAmount` for negative or over-precise amounts.
pub fn validate_non_negative(amount: Decimal) -> Result<(), LedgerError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::InvalidAmount(format!(
            "amount cannot be negative, got {amount}"
        )));
    }
    ensure_bounded(amount)?;
    ensure_scale(amount)
}

fn ensure_bounded(amount: Decimal) -> Result<(), LedgerError> {
    if amount > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount(format!(
            "amount {amount} exceeds the maximum of {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

fn ensure_scale(amount: Decimal) -> Result<(), LedgerError> {
    if has_valid_scale(amount) {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(format!(
            "amount {amount} has more than {MONEY_SCALE} fractional digits"
        )))
    }
}

/// Parses a currency code into a supported [`Currency`].
///
/// # Errors
///
/// Returns `LedgerError::UnsupportedCurrency` for unknown codes.
pub fn parse_currency(code: &str) -> Result<Currency, LedgerError> {
    Currency::from_str(code).map_err(|_| LedgerError::UnsupportedCurrency(code.to_string()))
}
