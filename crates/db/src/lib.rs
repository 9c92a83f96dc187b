//! Database layer with `SeaORM` entities and ledger repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - The ledger schema migration
//! - Repositories that execute the plans produced by `mentorledger-core`
//! - The webhook dispatcher that maps gateway events onto repositories

pub mod dispatch;
pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;

pub use dispatch::PaymentEventHandler;
pub use error::StoreError;
pub use repositories::{
    DisputeRepository, EscrowRepository, LedgerRepository, PaymentRepository,
    PlatformFeeRepository, WalletRepository, WebhookGate,
};

use std::time::Duration;

use mentorledger_shared::config::{DatabaseConfig, LedgerConfig};
use rust_decimal::Decimal;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    TransactionTrait,
};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the configured pool bounds.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Per-transaction wait limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Longest wait for a row lock, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Longest single statement, in milliseconds.
    pub statement_timeout_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2_000,
            statement_timeout_ms: 5_000,
        }
    }
}

impl From<&DatabaseConfig> for Timeouts {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            lock_timeout_ms: config.lock_timeout_ms,
            statement_timeout_ms: config.statement_timeout_ms,
        }
    }
}

/// Starts a transaction whose lock waits and statements are bounded.
///
/// `SET LOCAL` scopes both limits to this transaction only.
///
/// # Errors
///
/// Returns an error if the transaction cannot be started.
pub async fn begin_bounded(
    db: &DatabaseConnection,
    timeouts: Timeouts,
) -> Result<DatabaseTransaction, DbErr> {
    let txn = db.begin().await?;
    txn.execute_unprepared(&format!(
        "SET LOCAL lock_timeout = '{}ms'; SET LOCAL statement_timeout = '{}ms'",
        timeouts.lock_timeout_ms, timeouts.statement_timeout_ms
    ))
    .await?;
    Ok(txn)
}

/// Money policy applied by the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Platform fee in percent.
    pub platform_fee_percentage: Decimal,
    /// Days a session payment stays in escrow.
    pub escrow_hold_days: i64,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for LedgerPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            platform_fee_percentage: config.platform_fee_percentage,
            escrow_hold_days: config.escrow_hold_days,
        }
    }
}
