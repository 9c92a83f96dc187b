//! Core ledger rules for MentorLedger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and money calculations live here; the
//! storage layer executes the plans these services return.
//!
//! # Modules
//!
//! - `ledger` - Ledger record taxonomy, amount validation, statements
//! - `wallet` - Balance arithmetic and conservation
//! - `fee` - Platform fee calculation
//! - `escrow` - Escrow state machine and release planning
//! - `payment` - Payment, refund and payout lifecycles
//! - `dispute` - Chargeback lifecycle
//! - `webhook` - Gateway event parsing and retry policy

pub mod dispute;
pub mod error;
pub mod escrow;
pub mod fee;
pub mod ledger;
pub mod payment;
pub mod wallet;
pub mod webhook;

pub use error::LedgerError;
