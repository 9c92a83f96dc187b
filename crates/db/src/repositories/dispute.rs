//! Dispute (chargeback) repository.

use chrono::{DateTime, Utc};
use mentorledger_core::LedgerError;
use mentorledger_core::dispute::{DisputeOutcome, DisputeService, DisputeStatus as CoreDisputeStatus};
use mentorledger_core::ledger::{
    TransactionStatus as CoreTransactionStatus, TransactionType as CoreTransactionType,
    parse_currency,
};
use mentorledger_core::payment::Transition;
use mentorledger_core::wallet::{ReferenceKind, WalletReference};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde_json::json;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::ledger::{LedgerRepository, RecordInput};
use super::wallet::{WalletMutation, WalletRepository};
use crate::entities::{disputes, payments, sea_orm_active_enums::DisputeStatus};
use crate::error::StoreError;
use crate::{Timeouts, begin_bounded};

/// Input for recording a chargeback reported by a gateway.
#[derive(Debug, Clone)]
pub struct OpenDisputeInput {
    /// Disputed payment.
    pub payment_id: Uuid,
    /// Disputed amount.
    pub amount: Decimal,
    /// Gateway-reported reason.
    pub reason: Option<String>,
    /// Deadline for submitting evidence.
    pub evidence_due_by: Option<DateTime<Utc>>,
    /// Gateway-assigned dispute id.
    pub gateway_dispute_id: Option<String>,
}

/// Result of resolving a dispute.
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    /// The dispute reached its final status.
    Resolved(disputes::Model),
    /// A lost dispute could not be clawed back; it was parked in
    /// `under_review` with `last_error` set.
    ClawbackFailed {
        /// The dispute after parking.
        dispute: disputes::Model,
        /// Why the clawback was rejected.
        error: LedgerError,
    },
}

/// Dispute repository.
#[derive(Debug, Clone)]
pub struct DisputeRepository {
    db: DatabaseConnection,
    timeouts: Timeouts,
}

impl DisputeRepository {
    /// Creates a new dispute repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            timeouts: Timeouts::default(),
        }
    }

    /// Overrides the lock and statement timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Records a new dispute against a settled payment.
    ///
    /// Opening a dispute whose gateway id is already recorded returns the
    /// existing dispute.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` / `PaymentNotSettled`
    /// - `InvalidAmount` if the amount exceeds the payment
    pub async fn open(&self, input: OpenDisputeInput) -> Result<disputes::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let dispute = Self::open_in(&txn, &input).await?;
        txn.commit().await?;

        info!(
            dispute_id = %dispute.id,
            payment_id = %dispute.payment_id,
            amount = %dispute.amount,
            "Dispute opened"
        );
        Ok(dispute)
    }

    /// [`DisputeRepository::open`] inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// See [`DisputeRepository::open`].
    pub async fn open_in(
        txn: &DatabaseTransaction,
        input: &OpenDisputeInput,
    ) -> Result<disputes::Model, StoreError> {
        if let Some(gateway_dispute_id) = &input.gateway_dispute_id {
            let existing = disputes::Entity::find()
                .filter(disputes::Column::GatewayDisputeId.eq(gateway_dispute_id.as_str()))
                .one(txn)
                .await?;
            if let Some(existing) = existing {
                debug!(dispute_id = %existing.id, "Dispute already recorded");
                return Ok(existing);
            }
        }

        let payment = payments::Entity::find_by_id(input.payment_id)
            .one(txn)
            .await?
            .ok_or(LedgerError::PaymentNotFound(input.payment_id))?;

        DisputeService::validate_open(
            payment.id,
            payment.status.into(),
            payment.amount,
            input.amount,
        )?;

        let now = Utc::now().into();
        let dispute = disputes::ActiveModel {
            id: Set(Uuid::new_v4()),
            payment_id: Set(payment.id),
            amount: Set(input.amount),
            currency: Set(payment.currency.clone()),
            reason: Set(input.reason.clone()),
            status: Set(DisputeStatus::NeedsResponse),
            evidence_due_by: Set(input.evidence_due_by.map(Into::into)),
            gateway_dispute_id: Set(input.gateway_dispute_id.clone()),
            last_error: Set(None),
            resolved_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        LedgerRepository::record_in(
            txn,
            Self::status_record(&payment, &dispute, CoreTransactionStatus::Pending),
        )
        .await?;

        Ok(dispute)
    }

    /// Marks a dispute as under review once evidence is submitted.
    ///
    /// # Errors
    ///
    /// - `DisputeNotFound`
    /// - `InvalidTransition` if the dispute is already decided
    pub async fn mark_under_review(&self, dispute_id: Uuid) -> Result<disputes::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let dispute = Self::mark_under_review_in(&txn, dispute_id).await?;
        txn.commit().await?;
        Ok(dispute)
    }

    /// [`DisputeRepository::mark_under_review`] inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// See [`DisputeRepository::mark_under_review`].
    pub async fn mark_under_review_in(
        txn: &DatabaseTransaction,
        dispute_id: Uuid,
    ) -> Result<disputes::Model, StoreError> {
        let dispute = Self::lock(txn, dispute_id).await?;
        if DisputeService::mark_under_review(dispute.status.into())? == Transition::Unchanged {
            return Ok(dispute);
        }

        let payment = Self::payment_of(txn, &dispute).await?;
        let mut active: disputes::ActiveModel = dispute.into();
        active.status = Set(DisputeStatus::UnderReview);
        active.updated_at = Set(Utc::now().into());
        let dispute = active.update(txn).await?;

        LedgerRepository::record_in(
            txn,
            Self::status_record(&payment, &dispute, CoreTransactionStatus::Processing),
        )
        .await?;

        info!(dispute_id = %dispute.id, "Dispute under review");
        Ok(dispute)
    }

    /// Resolves a dispute.
    ///
    /// A lost dispute debits the disputed amount from the payee's wallet.
    /// If the wallet cannot cover it, the dispute is kept in `under_review`
    /// with `last_error` set, that state is committed, and
    /// `InsufficientBalance` is returned.
    ///
    /// # Errors
    ///
    /// - `DisputeNotFound`
    /// - `InvalidTransition` if the dispute is already decided
    /// - `InsufficientBalance` if the clawback could not be taken
    pub async fn resolve(
        &self,
        dispute_id: Uuid,
        outcome: DisputeOutcome,
    ) -> Result<disputes::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let resolved = Self::resolve_in(&txn, dispute_id, outcome).await?;
        txn.commit().await?;

        match resolved {
            ResolveOutcome::Resolved(dispute) => {
                info!(dispute_id = %dispute.id, status = ?dispute.status, "Dispute resolved");
                Ok(dispute)
            }
            ResolveOutcome::ClawbackFailed { error, .. } => Err(error.into()),
        }
    }

    /// [`DisputeRepository::resolve`] inside the caller's transaction.
    ///
    /// The clawback runs in a savepoint so a rejected debit leaves the
    /// outer transaction usable for parking the dispute.
    ///
    /// # Errors
    ///
    /// See [`DisputeRepository::resolve`]. A rejected clawback is reported
    /// as [`ResolveOutcome::ClawbackFailed`], not as an error.
    pub async fn resolve_in(
        txn: &DatabaseTransaction,
        dispute_id: Uuid,
        outcome: DisputeOutcome,
    ) -> Result<ResolveOutcome, StoreError> {
        let dispute = Self::lock(txn, dispute_id).await?;
        let resolution = DisputeService::resolve(dispute.status.into(), outcome, dispute.amount)?;
        let payment = Self::payment_of(txn, &dispute).await?;

        if resolution.clawback > Decimal::ZERO {
            let target = payment.payee_id.unwrap_or(payment.payer_id);
            let savepoint = txn.begin().await?;
            match Self::clawback(&savepoint, &dispute, target, resolution.clawback).await {
                Ok(()) => savepoint.commit().await?,
                Err(StoreError::Ledger(e @ LedgerError::InsufficientBalance { .. })) => {
                    savepoint.rollback().await?;
                    let dispute = Self::park(txn, &payment, dispute, &e).await?;
                    error!(
                        dispute_id = %dispute.id,
                        user_id = %target,
                        amount = %resolution.clawback,
                        error = %e,
                        "Dispute clawback failed; needs manual intervention"
                    );
                    return Ok(ResolveOutcome::ClawbackFailed { dispute, error: e });
                }
                Err(e) => return Err(e),
            }
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: disputes::ActiveModel = dispute.into();
        active.status = Set(resolution.new_status.into());
        active.last_error = Set(None);
        active.resolved_at = Set(Some(now));
        active.updated_at = Set(now);
        let dispute = active.update(txn).await?;

        LedgerRepository::record_in(
            txn,
            Self::status_record(&payment, &dispute, CoreTransactionStatus::Completed),
        )
        .await?;

        Ok(ResolveOutcome::Resolved(dispute))
    }

    /// Undecided disputes on payments from `payer_id` to `payee_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn open_between(
        &self,
        payer_id: Uuid,
        payee_id: Uuid,
    ) -> Result<Vec<disputes::Model>, StoreError> {
        let open = disputes::Entity::find()
            .join(JoinType::InnerJoin, disputes::Relation::Payments.def())
            .filter(payments::Column::PayerId.eq(payer_id))
            .filter(payments::Column::PayeeId.eq(payee_id))
            .filter(
                disputes::Column::Status
                    .is_in([DisputeStatus::NeedsResponse, DisputeStatus::UnderReview]),
            )
            .order_by_asc(disputes::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(open)
    }

    /// Finds a dispute by id.
    ///
    /// # Errors
    ///
    /// Returns `DisputeNotFound` if it does not exist.
    pub async fn get(&self, dispute_id: Uuid) -> Result<disputes::Model, StoreError> {
        disputes::Entity::find_by_id(dispute_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::DisputeNotFound(dispute_id).into())
    }

    /// Finds a dispute by its gateway id on the caller's connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_gateway_id_in(
        txn: &DatabaseTransaction,
        gateway_dispute_id: &str,
    ) -> Result<Option<disputes::Model>, StoreError> {
        let dispute = disputes::Entity::find()
            .filter(disputes::Column::GatewayDisputeId.eq(gateway_dispute_id))
            .one(txn)
            .await?;
        Ok(dispute)
    }

    async fn lock(txn: &DatabaseTransaction, dispute_id: Uuid) -> Result<disputes::Model, StoreError> {
        disputes::Entity::find_by_id(dispute_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| LedgerError::DisputeNotFound(dispute_id).into())
    }

    async fn payment_of(
        txn: &DatabaseTransaction,
        dispute: &disputes::Model,
    ) -> Result<payments::Model, StoreError> {
        payments::Entity::find_by_id(dispute.payment_id)
            .one(txn)
            .await?
            .ok_or_else(|| LedgerError::PaymentNotFound(dispute.payment_id).into())
    }

    async fn clawback(
        txn: &DatabaseTransaction,
        dispute: &disputes::Model,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        let currency = parse_currency(&dispute.currency)?;
        let wallet = WalletRepository::ensure_in(txn, user_id, currency).await?;
        WalletRepository::apply_in_txn(
            txn,
            &WalletMutation::debit(wallet.id, amount, "Dispute lost")
                .with_reference(WalletReference::new(dispute.id, ReferenceKind::DisputeClawback)),
        )
        .await?;

        LedgerRepository::record_in(
            txn,
            RecordInput::new(
                user_id,
                CoreTransactionType::DisputeClawback,
                CoreTransactionStatus::Completed,
                amount,
                dispute.currency.clone(),
                format!("Clawback for dispute {}", dispute.id),
            )
            .reference(dispute.id, "dispute")
            .metadata(json!({ "payment_id": dispute.payment_id })),
        )
        .await?;
        Ok(())
    }

    async fn park(
        txn: &DatabaseTransaction,
        payment: &payments::Model,
        dispute: disputes::Model,
        cause: &LedgerError,
    ) -> Result<disputes::Model, StoreError> {
        let mut active: disputes::ActiveModel = dispute.into();
        active.status = Set(CoreDisputeStatus::UnderReview.into());
        active.last_error = Set(Some(cause.to_string()));
        active.updated_at = Set(Utc::now().into());
        let dispute = active.update(txn).await?;

        LedgerRepository::record_in(
            txn,
            Self::status_record(payment, &dispute, CoreTransactionStatus::Failed),
        )
        .await?;
        Ok(dispute)
    }

    fn status_record(
        payment: &payments::Model,
        dispute: &disputes::Model,
        status: CoreTransactionStatus,
    ) -> RecordInput {
        let dispute_status = CoreDisputeStatus::from(dispute.status);
        RecordInput::new(
            payment.payer_id,
            CoreTransactionType::Dispute,
            status,
            dispute.amount,
            dispute.currency.clone(),
            format!("Dispute {dispute_status}"),
        )
        .reference(dispute.id, "dispute")
        .gateway(payment.gateway.into(), dispute.gateway_dispute_id.clone())
        .metadata(json!({
            "payment_id": payment.id,
            "dispute_status": dispute_status.as_str(),
            "reason": dispute.reason,
            "last_error": dispute.last_error,
        }))
    }
}
