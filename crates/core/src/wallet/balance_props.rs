//! Property-based tests for wallet balance arithmetic.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::wallet::balance::{BalanceChange, is_conserved};
use crate::wallet::types::EntryKind;

/// Strategy for positive two-decimal amounts.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for credit or debit.
fn arb_kind() -> impl Strategy<Value = EntryKind> {
    prop_oneof![Just(EntryKind::Credit), Just(EntryKind::Debit)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Applying any sequence of mutations never yields a negative balance,
    /// and the final balance equals the sum of accepted rows.
    #[test]
    fn prop_sequence_conserves_and_never_goes_negative(
        ops in prop::collection::vec((arb_kind(), arb_amount()), 1..50)
    ) {
        let wallet_id = Uuid::new_v4();
        let mut balance = Decimal::ZERO;
        let mut rows = Vec::new();

        for (kind, amount) in ops {
            match BalanceChange::compute(wallet_id, balance, kind, amount) {
                Ok(change) => {
                    prop_assert_eq!(change.previous_balance, balance);
                    balance = change.new_balance;
                    rows.push(change.signed_amount);
                }
                Err(LedgerError::InsufficientBalance { balance: seen, requested, .. }) => {
                    prop_assert_eq!(kind, EntryKind::Debit);
                    prop_assert_eq!(seen, balance);
                    prop_assert!(requested > balance);
                }
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
            prop_assert!(balance >= Decimal::ZERO);
        }

        prop_assert!(is_conserved(balance, rows));
    }

    /// A rejected debit leaves nothing to apply.
    #[test]
    fn prop_overdraw_is_always_rejected(balance in arb_amount(), extra in arb_amount()) {
        let result = BalanceChange::compute(Uuid::nil(), balance, EntryKind::Debit, balance + extra);
        let is_insufficient = matches!(result, Err(LedgerError::InsufficientBalance { .. }));
        prop_assert!(is_insufficient);
    }
}
