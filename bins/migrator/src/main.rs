//! Ledger schema migration runner for MentorLedger.
//!
//! Usage:
//!   migrator up      - Apply the ledger schema
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-apply
//!
//! Reads `DATABASE_URL` from the environment or `.env`.

use mentorledger_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The migrator CLI installs its own tracing subscriber.
    cli::run_cli(Migrator).await;
}
