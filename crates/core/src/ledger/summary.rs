//! Statement totals over a set of ledger records.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::types::{Direction, TransactionStatus, TransactionType};

/// Totals for one user over a period.
///
/// Only `completed` records contribute to the totals; the other statuses are
/// counted so a statement can show what is still in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    /// Sum of completed inflows.
    pub total_in: Decimal,
    /// Sum of completed outflows.
    pub total_out: Decimal,
    /// Completed totals per transaction type.
    pub by_type: BTreeMap<&'static str, Decimal>,
    /// Records that are not completed yet.
    pub pending_count: usize,
}

impl LedgerSummary {
    /// Folds records into a summary.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (TransactionType, TransactionStatus, Decimal)>,
    {
        let mut summary = Self::default();
        for (transaction_type, status, amount) in records {
            match status {
                TransactionStatus::Completed => {}
                TransactionStatus::Pending | TransactionStatus::Processing => {
                    summary.pending_count += 1;
                    continue;
                }
                TransactionStatus::Failed | TransactionStatus::Cancelled => continue,
            }

            match transaction_type.direction() {
                Direction::Inflow => summary.total_in += amount,
                Direction::Outflow => summary.total_out += amount,
                Direction::Neutral => {}
            }
            *summary
                .by_type
                .entry(transaction_type.as_str())
                .or_insert(Decimal::ZERO) += amount;
        }
        summary
    }

    /// Net movement (`total_in - total_out`).
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.total_in - self.total_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_counts_completed_only() {
        let summary = LedgerSummary::from_records([
            (TransactionType::EscrowRelease, TransactionStatus::Completed, dec!(450.00)),
            (TransactionType::EscrowRelease, TransactionStatus::Completed, dec!(90.00)),
            (TransactionType::Payout, TransactionStatus::Completed, dec!(300.00)),
            (TransactionType::Payout, TransactionStatus::Pending, dec!(100.00)),
            (TransactionType::Payout, TransactionStatus::Failed, dec!(75.00)),
            (TransactionType::Dispute, TransactionStatus::Completed, dec!(20.00)),
        ]);

        assert_eq!(summary.total_in, dec!(540.00));
        assert_eq!(summary.total_out, dec!(300.00));
        assert_eq!(summary.net(), dec!(240.00));
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.by_type["escrow_release"], dec!(540.00));
        assert_eq!(summary.by_type["dispute"], dec!(20.00));
    }

    #[test]
    fn test_empty_summary() {
        let summary = LedgerSummary::from_records(Vec::<(TransactionType, TransactionStatus, Decimal)>::new());
        assert_eq!(summary.net(), Decimal::ZERO);
        assert!(summary.by_type.is_empty());
    }
}
