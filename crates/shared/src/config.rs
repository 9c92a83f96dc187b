//! Application configuration management.
//!
//! Values are layered: `config/default`, then `config/{RUN_MODE}`, then
//! environment variables prefixed with `MENTORLEDGER` and split on `__`
//! (for example `MENTORLEDGER__DATABASE__URL`).

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger policy configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Webhook processing configuration.
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Escrow sweeper configuration.
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Upper bound on waiting for a row lock, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Upper bound on a single statement, in milliseconds.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_lock_timeout_ms() -> u64 {
    2_000
}

fn default_statement_timeout_ms() -> u64 {
    5_000
}

/// Ledger policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Platform fee taken on escrow release and subscription payments, in percent.
    #[serde(default = "default_platform_fee_percentage")]
    pub platform_fee_percentage: Decimal,
    /// Days a session payment stays in escrow before it becomes eligible for the sweep.
    #[serde(default = "default_escrow_hold_days")]
    pub escrow_hold_days: i64,
    /// Currencies wallets may be opened in.
    #[serde(default = "default_supported_currencies")]
    pub supported_currencies: Vec<Currency>,
}

fn default_platform_fee_percentage() -> Decimal {
    Decimal::TEN
}

fn default_escrow_hold_days() -> i64 {
    7
}

fn default_supported_currencies() -> Vec<Currency> {
    Currency::ALL.to_vec()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            platform_fee_percentage: default_platform_fee_percentage(),
            escrow_hold_days: default_escrow_hold_days(),
            supported_currencies: default_supported_currencies(),
        }
    }
}

/// Webhook processing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Failed deliveries after which an event is left for manual handling.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First retry delay in seconds; doubles per failure.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Longest retry delay in seconds.
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
    /// Events claimed per retry pass.
    #[serde(default = "default_retry_batch_size")]
    pub retry_batch_size: u64,
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_base_secs() -> u64 {
    2
}

fn default_backoff_cap_secs() -> u64 {
    300 // 5 minutes
}

fn default_retry_batch_size() -> u64 {
    100
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
            retry_batch_size: default_retry_batch_size(),
        }
    }
}

/// Escrow sweeper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between sweep passes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Escrows fetched per sweep batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_batch_size() -> u64 {
    100
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("MENTORLEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
