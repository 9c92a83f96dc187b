//! Property-based tests for FeeCalculator.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::fee::calculator::FeeCalculator;

/// Strategy for positive two-decimal amounts up to 10 million.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for amounts anywhere in the storable range, in cents.
fn arb_large_amount() -> impl Strategy<Value = Decimal> {
    (1u64..=9_999_999_999_999_999_999u64)
        .prop_map(|cents| Decimal::from_i128_with_scale(i128::from(cents), 2))
}

/// Strategy for percentages between 0.00 and 100.00.
fn arb_percentage() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000i64).prop_map(|basis| Decimal::new(basis, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Same inputs always give the same fee.
    #[test]
    fn prop_fee_is_deterministic(amount in arb_amount(), pct in arb_percentage()) {
        let first = FeeCalculator::fee(amount, pct).unwrap();
        let second = FeeCalculator::fee(amount, pct).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Fee never exceeds the amount and never goes negative.
    #[test]
    fn prop_fee_is_bounded(amount in arb_amount(), pct in arb_percentage()) {
        let fee = FeeCalculator::fee(amount, pct).unwrap();
        prop_assert!(fee >= Decimal::ZERO);
        prop_assert!(fee <= amount);
    }

    /// Fee is always expressed in minor units.
    #[test]
    fn prop_fee_has_two_decimals(amount in arb_amount(), pct in arb_percentage()) {
        let fee = FeeCalculator::fee(amount, pct).unwrap();
        prop_assert!(fee.normalize().scale() <= 2);
    }

    /// Fee and net always add back to the gross amount.
    #[test]
    fn prop_split_conserves_gross(amount in arb_amount(), pct in arb_percentage()) {
        let breakdown = FeeCalculator::split(amount, pct).unwrap();
        prop_assert_eq!(breakdown.fee + breakdown.net, amount);
    }

    /// Rounding error is at most half a minor unit.
    #[test]
    fn prop_fee_rounding_error_is_bounded(amount in arb_amount(), pct in arb_percentage()) {
        let fee = FeeCalculator::fee(amount, pct).unwrap();
        let exact = amount * pct / Decimal::ONE_HUNDRED;
        prop_assert!((fee - exact).abs() <= Decimal::new(5, 3));
    }

    /// Every storable amount yields a fee without overflow.
    #[test]
    fn prop_fee_never_overflows_in_range(amount in arb_large_amount(), pct in arb_percentage()) {
        let breakdown = FeeCalculator::split(amount, pct).unwrap();
        prop_assert!(breakdown.fee <= amount);
        prop_assert_eq!(breakdown.fee + breakdown.net, amount);
    }
}
