//! Shared types and configuration for MentorLedger.
//!
//! This crate provides common types used across all other crates:
//! - Money and currency types with decimal precision
//! - Pagination types for ledger queries
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LedgerConfig, SweeperConfig, WebhookConfig};
pub use types::{Currency, Money, PageRequest, PageResponse};
