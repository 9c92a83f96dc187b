//! MentorLedger background worker.
//!
//! Each pass pages through held escrows past their hold date and retries
//! webhook events whose backoff has elapsed. Overdue escrows are only
//! reported unless `--dispose` says otherwise.
//!
//! Usage: sweeper [--once] [--dispose report|release|refund] [--batch-size N]

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mentorledger_core::LedgerError;
use mentorledger_core::escrow::ReleaseMode;
use mentorledger_core::webhook::{DeliveryOutcome, RetryPolicy};
use mentorledger_db::{
    EscrowRepository, LedgerPolicy, PaymentEventHandler, PaymentRepository, StoreError, Timeouts,
    WebhookGate, connect_with,
};
use mentorledger_shared::AppConfig;

const SWEEP_REASON: &str = "Hold period expired";

/// What to do with an escrow whose hold period has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Disposition {
    /// Log it and leave it held.
    Report,
    /// Pay the mentor.
    Release,
    /// Return the money to the payer.
    Refund,
}

#[derive(Debug, Parser)]
#[command(name = "sweeper")]
#[command(about = "Escrow expiry and webhook retry worker")]
struct Cli {
    /// Run one pass and exit.
    #[arg(long)]
    once: bool,

    /// Action taken on overdue escrows.
    #[arg(long, value_enum, default_value_t = Disposition::Report)]
    dispose: Disposition,

    /// Escrows fetched per sweep batch; overrides the configured value.
    #[arg(long)]
    batch_size: Option<u64>,
}

#[derive(Debug, Default)]
struct PassReport {
    overdue: usize,
    settled: usize,
    escrow_failures: usize,
    webhooks_processed: usize,
    webhooks_failed: usize,
    webhooks_exhausted: usize,
}

impl PassReport {
    fn log(&self) {
        info!(
            overdue = self.overdue,
            settled = self.settled,
            escrow_failures = self.escrow_failures,
            webhooks_processed = self.webhooks_processed,
            webhooks_failed = self.webhooks_failed,
            webhooks_exhausted = self.webhooks_exhausted,
            "Sweep pass complete"
        );
    }
}

struct Sweeper {
    escrows: EscrowRepository,
    gate: WebhookGate,
    handler: PaymentEventHandler,
    dispose: Disposition,
    batch_size: u64,
    retry_batch_size: u64,
}

impl Sweeper {
    async fn run_pass(&self) -> Result<PassReport, StoreError> {
        let now = Utc::now();
        let mut report = PassReport::default();
        self.sweep_escrows(now, &mut report).await?;
        self.retry_webhooks(now, &mut report).await?;
        Ok(report)
    }

    async fn sweep_escrows(
        &self,
        now: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Result<(), StoreError> {
        let mut sweep = self.escrows.expire_sweep(now, self.batch_size);
        while let Some(batch) = sweep.next_batch().await? {
            for escrow in batch {
                report.overdue += 1;
                let result = match self.dispose {
                    Disposition::Report => {
                        info!(
                            escrow_id = %escrow.id,
                            session_id = %escrow.session_id,
                            amount = %escrow.amount,
                            hold_until = %escrow.hold_until,
                            "Escrow past hold date"
                        );
                        continue;
                    }
                    Disposition::Release => self
                        .escrows
                        .release(escrow.id, ReleaseMode::Full, Some(SWEEP_REASON.to_string()))
                        .await
                        .map(|_| ()),
                    Disposition::Refund => self
                        .escrows
                        .refund(escrow.id, Some(SWEEP_REASON.to_string()))
                        .await
                        .map(|_| ()),
                };

                match result {
                    Ok(()) => report.settled += 1,
                    // Settled by someone else since the batch was read.
                    Err(StoreError::Ledger(LedgerError::NotHeld { .. })) => {
                        debug!(escrow_id = %escrow.id, "Escrow no longer held, skipping");
                    }
                    Err(e) => {
                        report.escrow_failures += 1;
                        warn!(
                            escrow_id = %escrow.id,
                            code = e.error_code(),
                            error = %e,
                            "Failed to settle overdue escrow"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    async fn retry_webhooks(
        &self,
        now: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Result<(), StoreError> {
        let outcomes = self
            .gate
            .retry_due(&self.handler, now, self.retry_batch_size)
            .await?;
        for (_, outcome) in outcomes {
            match outcome {
                DeliveryOutcome::Processed => report.webhooks_processed += 1,
                DeliveryOutcome::Failed { .. } => report.webhooks_failed += 1,
                DeliveryOutcome::Exhausted { .. } => report.webhooks_exhausted += 1,
                DeliveryOutcome::Duplicate | DeliveryOutcome::Deferred { .. } => {}
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mentorledger=debug,sweeper=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let timeouts = Timeouts::from(&config.database);
    let policy = LedgerPolicy::from(&config.ledger);
    let payments = PaymentRepository::new(db.clone())
        .with_policy(policy)
        .with_timeouts(timeouts);

    let sweeper = Sweeper {
        escrows: EscrowRepository::new(db.clone())
            .with_policy(policy)
            .with_timeouts(timeouts),
        gate: WebhookGate::new(db)
            .with_policy(RetryPolicy::from_config(&config.webhook))
            .with_timeouts(timeouts),
        handler: PaymentEventHandler::new(payments),
        dispose: cli.dispose,
        batch_size: cli.batch_size.unwrap_or(config.sweeper.batch_size),
        retry_batch_size: config.webhook.retry_batch_size,
    };

    info!(
        dispose = ?sweeper.dispose,
        batch_size = sweeper.batch_size,
        interval_secs = config.sweeper.interval_secs,
        "Sweeper started"
    );

    if cli.once {
        sweeper.run_pass().await?.log();
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(config.sweeper.interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Sweeper received ctrl-c, exiting");
                break;
            }
            _ = ticker.tick() => {
                match sweeper.run_pass().await {
                    Ok(report) => report.log(),
                    Err(e) => error!(code = e.error_code(), error = %e, "Sweep pass failed"),
                }
            }
        }
    }

    Ok(())
}
