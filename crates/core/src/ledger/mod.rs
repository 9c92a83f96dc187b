//! Append-only ledger taxonomy and validation.
//!
//! - `types` - Record types and statuses
//! - `validation` - Amount and currency rules
//! - `summary` - Statement totals

pub mod summary;
pub mod types;
pub mod validation;

pub use summary::LedgerSummary;
pub use types::{Direction, TransactionStatus, TransactionType};
pub use validation::{parse_currency, validate_amount, validate_non_negative};
