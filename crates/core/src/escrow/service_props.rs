//! Property-based tests for EscrowService.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::escrow::service::EscrowService;
use crate::escrow::types::{EscrowStatus, ReleaseMode, RemainderDisposition};

fn arb_held() -> impl Strategy<Value = Decimal> {
    (100i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_percentage() -> impl Strategy<Value = Decimal> {
    (0i64..=5_000i64).prop_map(|basis| Decimal::new(basis, 2))
}

fn arb_disposition() -> impl Strategy<Value = RemainderDisposition> {
    prop_oneof![
        Just(RemainderDisposition::KeepHeld),
        Just(RemainderDisposition::RefundPayer),
    ]
}

fn arb_status() -> impl Strategy<Value = EscrowStatus> {
    prop_oneof![
        Just(EscrowStatus::Held),
        Just(EscrowStatus::Released),
        Just(EscrowStatus::Refunded),
        Just(EscrowStatus::Disputed),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Payee net, platform fee, payer refund and what stays held add up to
    /// exactly the amount that was held.
    #[test]
    fn prop_release_conserves_held_amount(
        held in arb_held(),
        share in 1u32..=100u32,
        disposition in arb_disposition(),
        pct in arb_percentage(),
    ) {
        let amount = (held * Decimal::from(share) / Decimal::ONE_HUNDRED)
            .round_dp(2)
            .max(Decimal::new(1, 2));
        let plan = EscrowService::plan_release(
            Uuid::nil(),
            EscrowStatus::Held,
            held,
            ReleaseMode::Partial { amount, remainder: disposition },
            pct,
        )
        .unwrap();

        prop_assert_eq!(
            plan.fee.net + plan.fee.fee + plan.payer_refund + plan.remaining_held,
            held
        );
        prop_assert!(plan.fee.net >= Decimal::ZERO);
        prop_assert_eq!(plan.new_status == EscrowStatus::Held, !plan.remaining_held.is_zero());
    }

    /// Only held escrows can be released or refunded.
    #[test]
    fn prop_only_held_escrows_move_money(status in arb_status(), held in arb_held()) {
        let release = EscrowService::plan_release(
            Uuid::nil(), status, held, ReleaseMode::Full, Decimal::TEN,
        );
        let refund = EscrowService::plan_refund(Uuid::nil(), status, held);
        prop_assert_eq!(release.is_ok(), status == EscrowStatus::Held);
        prop_assert_eq!(refund.is_ok(), status == EscrowStatus::Held);
    }
}
