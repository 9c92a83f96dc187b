//! Common types used across the ledger.

pub mod money;
pub mod pagination;

pub use money::{Currency, MAX_AMOUNT, MONEY_SCALE, Money, has_valid_scale, round_to_minor};
pub use pagination::{PageMeta, PageRequest, PageResponse};
