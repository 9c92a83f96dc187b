//! Wallet balance rules.
//!
//! - `types` - Entry kinds and mutation references
//! - `balance` - Balance computation and conservation checks

pub mod balance;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use balance::{BalanceChange, is_conserved, replay};
pub use types::{EntryKind, ReferenceKind, WalletReference};
