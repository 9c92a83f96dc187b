//! Ledger schema migration.
//!
//! Creates the wallet, escrow, payment, fee, webhook and dispute tables,
//! their enums, and the triggers that keep the ledgers append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: WALLETS
        // ============================================================
        db.execute_unprepared(WALLETS_SQL).await?;
        db.execute_unprepared(WALLET_TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 3: PAYMENTS, REFUNDS & PAYOUTS
        // ============================================================
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(REFUNDS_SQL).await?;
        db.execute_unprepared(PAYOUTS_SQL).await?;

        // ============================================================
        // PART 4: ESCROW & FEES
        // ============================================================
        db.execute_unprepared(ESCROW_ACCOUNTS_SQL).await?;
        db.execute_unprepared(PLATFORM_FEES_SQL).await?;

        // ============================================================
        // PART 5: LEDGER
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 6: WEBHOOKS & DISPUTES
        // ============================================================
        db.execute_unprepared(WEBHOOK_EVENTS_SQL).await?;
        db.execute_unprepared(DISPUTES_SQL).await?;

        // ============================================================
        // PART 7: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE wallet_entry_kind AS ENUM ('credit', 'debit');

CREATE TYPE wallet_reference_type AS ENUM (
    'payment', 'refund', 'payout', 'escrow_release',
    'escrow_refund', 'dispute_clawback', 'adjustment'
);

CREATE TYPE payment_gateway AS ENUM ('stripe', 'paypal', 'razorpay', 'upi');

CREATE TYPE payment_status AS ENUM ('pending', 'processing', 'succeeded', 'failed');

CREATE TYPE refund_status AS ENUM ('pending', 'succeeded', 'failed');

CREATE TYPE payout_status AS ENUM ('pending', 'processing', 'succeeded', 'failed');

CREATE TYPE escrow_status AS ENUM ('held', 'released', 'refunded', 'disputed');

CREATE TYPE dispute_status AS ENUM ('needs_response', 'under_review', 'won', 'lost');

CREATE TYPE fee_reference_kind AS ENUM ('payment', 'payout', 'escrow_release');

CREATE TYPE ledger_transaction_type AS ENUM (
    'payment', 'refund', 'payout',
    'escrow_hold', 'escrow_release', 'escrow_refund', 'escrow_dispute',
    'wallet_credit', 'wallet_debit', 'platform_fee',
    'dispute', 'dispute_clawback'
);

CREATE TYPE ledger_transaction_status AS ENUM (
    'pending', 'processing', 'completed', 'failed', 'cancelled'
);
";

const WALLETS_SQL: &str = r"
CREATE TABLE wallets (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    currency VARCHAR(3) NOT NULL,
    balance NUMERIC(19, 2) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_wallet_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT uq_wallet_user_currency UNIQUE (user_id, currency)
);
";

const WALLET_TRANSACTIONS_SQL: &str = r"
CREATE TABLE wallet_transactions (
    id UUID PRIMARY KEY,
    wallet_id UUID NOT NULL REFERENCES wallets(id),
    amount NUMERIC(19, 2) NOT NULL,
    kind wallet_entry_kind NOT NULL,
    description TEXT NOT NULL,
    reference_id UUID,
    reference_type wallet_reference_type,
    balance_after NUMERIC(19, 2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_wallet_tx_amount_nonzero CHECK (amount <> 0),
    CONSTRAINT chk_wallet_tx_sign CHECK (
        (kind = 'credit' AND amount > 0) OR (kind = 'debit' AND amount < 0)
    ),
    CONSTRAINT chk_wallet_tx_balance_after CHECK (balance_after >= 0)
);

CREATE INDEX idx_wallet_transactions_wallet ON wallet_transactions(wallet_id, created_at DESC);
CREATE INDEX idx_wallet_transactions_reference ON wallet_transactions(reference_id)
    WHERE reference_id IS NOT NULL;
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id UUID PRIMARY KEY,
    payer_id UUID NOT NULL,
    payee_id UUID,
    amount NUMERIC(19, 2) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    status payment_status NOT NULL DEFAULT 'pending',
    gateway payment_gateway NOT NULL,
    gateway_payment_id VARCHAR(255) NOT NULL,
    session_id UUID,
    subscription_id UUID,
    fee_percentage NUMERIC(5, 2) NOT NULL DEFAULT 0,
    service_fee NUMERIC(19, 2) NOT NULL DEFAULT 0,
    completed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_payment_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_payment_fee CHECK (service_fee >= 0 AND service_fee <= amount),
    CONSTRAINT uq_payment_gateway_ref UNIQUE (gateway, gateway_payment_id)
);

CREATE INDEX idx_payments_payer ON payments(payer_id, created_at DESC);
CREATE INDEX idx_payments_payee ON payments(payee_id) WHERE payee_id IS NOT NULL;
CREATE INDEX idx_payments_session ON payments(session_id) WHERE session_id IS NOT NULL;
";

const REFUNDS_SQL: &str = r"
CREATE TABLE refunds (
    id UUID PRIMARY KEY,
    payment_id UUID NOT NULL REFERENCES payments(id),
    amount NUMERIC(19, 2) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    status refund_status NOT NULL DEFAULT 'pending',
    reason TEXT,
    gateway_refund_id VARCHAR(255),
    processed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_refund_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_refunds_payment ON refunds(payment_id);
CREATE UNIQUE INDEX uq_refunds_gateway_ref ON refunds(gateway_refund_id)
    WHERE gateway_refund_id IS NOT NULL;
";

const PAYOUTS_SQL: &str = r"
CREATE TABLE payouts (
    id UUID PRIMARY KEY,
    mentor_id UUID NOT NULL,
    wallet_id UUID NOT NULL REFERENCES wallets(id),
    amount NUMERIC(19, 2) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    fee_percentage NUMERIC(5, 2) NOT NULL DEFAULT 0,
    status payout_status NOT NULL DEFAULT 'pending',
    payment_method_id VARCHAR(255),
    gateway payment_gateway,
    gateway_payout_id VARCHAR(255),
    failure_reason TEXT,
    scheduled_at TIMESTAMPTZ,
    processed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_payout_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_payouts_mentor ON payouts(mentor_id, created_at DESC);
CREATE UNIQUE INDEX uq_payouts_gateway_ref ON payouts(gateway, gateway_payout_id)
    WHERE gateway_payout_id IS NOT NULL;
";

const ESCROW_ACCOUNTS_SQL: &str = r"
CREATE TABLE escrow_accounts (
    id UUID PRIMARY KEY,
    session_id UUID NOT NULL,
    payment_id UUID REFERENCES payments(id),
    payer_id UUID NOT NULL,
    payee_id UUID NOT NULL,
    amount NUMERIC(19, 2) NOT NULL,
    original_amount NUMERIC(19, 2) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    status escrow_status NOT NULL DEFAULT 'held',
    hold_until TIMESTAMPTZ NOT NULL,
    released_at TIMESTAMPTZ,
    release_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_escrow_amount CHECK (amount >= 0 AND amount <= original_amount),
    CONSTRAINT chk_escrow_original_positive CHECK (original_amount > 0),
    CONSTRAINT chk_escrow_parties CHECK (payer_id <> payee_id)
);

-- At most one live hold per session
CREATE UNIQUE INDEX uq_escrow_held_session ON escrow_accounts(session_id)
    WHERE status = 'held';

CREATE INDEX idx_escrow_expiry ON escrow_accounts(hold_until, id)
    WHERE status = 'held';
CREATE INDEX idx_escrow_parties ON escrow_accounts(payer_id, payee_id);
";

const PLATFORM_FEES_SQL: &str = r"
CREATE TABLE platform_fees (
    id UUID PRIMARY KEY,
    reference_id UUID NOT NULL,
    reference_kind fee_reference_kind NOT NULL,
    base_amount NUMERIC(19, 2) NOT NULL,
    fee_percentage NUMERIC(5, 2) NOT NULL,
    fee_amount NUMERIC(19, 2) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    collected_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_fee_percentage CHECK (fee_percentage >= 0 AND fee_percentage <= 100),
    CONSTRAINT chk_fee_amount CHECK (fee_amount >= 0 AND fee_amount <= base_amount)
);

CREATE INDEX idx_platform_fees_reference ON platform_fees(reference_id);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    amount NUMERIC(19, 2) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    transaction_type ledger_transaction_type NOT NULL,
    status ledger_transaction_status NOT NULL,
    description TEXT NOT NULL,
    reference_id UUID,
    reference_type VARCHAR(50),
    gateway payment_gateway,
    gateway_transaction_id VARCHAR(255),
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_transaction_amount CHECK (amount >= 0)
);

CREATE INDEX idx_transactions_user ON transactions(user_id, created_at DESC);
CREATE INDEX idx_transactions_reference ON transactions(reference_id)
    WHERE reference_id IS NOT NULL;
";

const WEBHOOK_EVENTS_SQL: &str = r"
CREATE TABLE webhook_events (
    id UUID PRIMARY KEY,
    gateway payment_gateway NOT NULL,
    event_type VARCHAR(100) NOT NULL,
    external_event_id VARCHAR(255) NOT NULL,
    payload JSONB NOT NULL,
    signature TEXT,
    processed BOOLEAN NOT NULL DEFAULT FALSE,
    processed_at TIMESTAMPTZ,
    error_message TEXT,
    retry_count INTEGER NOT NULL DEFAULT 0,
    next_attempt_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_webhook_event UNIQUE (gateway, external_event_id),
    CONSTRAINT chk_webhook_retry_count CHECK (retry_count >= 0)
);

CREATE INDEX idx_webhook_events_due ON webhook_events(next_attempt_at)
    WHERE processed = FALSE;
";

const DISPUTES_SQL: &str = r"
CREATE TABLE disputes (
    id UUID PRIMARY KEY,
    payment_id UUID NOT NULL REFERENCES payments(id),
    amount NUMERIC(19, 2) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    reason TEXT,
    status dispute_status NOT NULL DEFAULT 'needs_response',
    evidence_due_by TIMESTAMPTZ,
    gateway_dispute_id VARCHAR(255),
    last_error TEXT,
    resolved_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_dispute_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_disputes_payment ON disputes(payment_id);
CREATE UNIQUE INDEX uq_disputes_gateway_ref ON disputes(gateway_dispute_id)
    WHERE gateway_dispute_id IS NOT NULL;
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_ledger_mutation
-- Ledger rows are append-only; corrections are new rows
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_ledger_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Ledger table % is append-only', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_wallet_transactions_append_only
BEFORE UPDATE OR DELETE ON wallet_transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_ledger_mutation();

CREATE TRIGGER trg_transactions_append_only
BEFORE UPDATE OR DELETE ON transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_ledger_mutation();

CREATE TRIGGER trg_platform_fees_append_only
BEFORE UPDATE OR DELETE ON platform_fees
FOR EACH ROW
EXECUTE FUNCTION prevent_ledger_mutation();
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

-- Drop triggers
DROP TRIGGER IF EXISTS trg_platform_fees_append_only ON platform_fees;
DROP TRIGGER IF EXISTS trg_transactions_append_only ON transactions;
DROP TRIGGER IF EXISTS trg_wallet_transactions_append_only ON wallet_transactions;

-- Drop functions
DROP FUNCTION IF EXISTS prevent_ledger_mutation();

-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS disputes CASCADE;
DROP TABLE IF EXISTS webhook_events CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS platform_fees CASCADE;
DROP TABLE IF EXISTS escrow_accounts CASCADE;
DROP TABLE IF EXISTS payouts CASCADE;
DROP TABLE IF EXISTS refunds CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS wallet_transactions CASCADE;
DROP TABLE IF EXISTS wallets CASCADE;

-- Drop enums
DROP TYPE IF EXISTS ledger_transaction_status CASCADE;
DROP TYPE IF EXISTS ledger_transaction_type CASCADE;
DROP TYPE IF EXISTS fee_reference_kind CASCADE;
DROP TYPE IF EXISTS dispute_status CASCADE;
DROP TYPE IF EXISTS escrow_status CASCADE;
DROP TYPE IF EXISTS payout_status CASCADE;
DROP TYPE IF EXISTS refund_status CASCADE;
DROP TYPE IF EXISTS payment_status CASCADE;
DROP TYPE IF EXISTS payment_gateway CASCADE;
DROP TYPE IF EXISTS wallet_reference_type CASCADE;
DROP TYPE IF EXISTS wallet_entry_kind CASCADE;
";
