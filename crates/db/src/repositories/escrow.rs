//! Escrow repository.
//!
//! Each operation locks the escrow row, asks [`EscrowService`] for a plan and
//! carries the plan out inside the same transaction: wallet credits, the
//! platform fee row, one ledger record and the escrow update. A failure at
//! any step rolls everything back and the escrow stays as it was.

use chrono::{DateTime, TimeDelta, Utc};
use mentorledger_core::LedgerError;
use mentorledger_core::escrow::{
    DisputeDecision, DisputeResolution, EscrowService, EscrowStatus as CoreEscrowStatus,
    RefundPlan, ReleaseMode, ReleasePlan,
};
use mentorledger_core::ledger::{
    TransactionStatus as CoreTransactionStatus, TransactionType as CoreTransactionType,
    parse_currency,
};
use mentorledger_core::wallet::{ReferenceKind, WalletReference};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::ledger::{LedgerRepository, RecordInput};
use super::platform_fee::PlatformFeeRepository;
use super::wallet::{WalletMutation, WalletRepository};
use crate::entities::{
    escrow_accounts,
    sea_orm_active_enums::{EscrowStatus, FeeReferenceKind},
};
use crate::error::{StoreError, is_unique_violation};
use crate::{LedgerPolicy, Timeouts, begin_bounded};

const LEDGER_REFERENCE: &str = "escrow";

/// Input for opening an escrow hold.
#[derive(Debug, Clone)]
pub struct OpenEscrowInput {
    /// The booked session.
    pub session_id: Uuid,
    /// Mentee paying for the session.
    pub payer_id: Uuid,
    /// Mentor receiving the funds.
    pub payee_id: Uuid,
    /// Amount to hold.
    pub amount: Decimal,
    /// ISO 4217 code.
    pub currency: String,
    /// Date after which the hold is eligible for the expiry sweep.
    pub hold_until: DateTime<Utc>,
    /// Payment that funded the hold.
    pub payment_id: Option<Uuid>,
}

/// A completed release.
#[derive(Debug, Clone)]
pub struct EscrowRelease {
    /// The escrow after the release.
    pub escrow: escrow_accounts::Model,
    /// Money movements that were carried out.
    pub plan: ReleasePlan,
}

/// Escrow repository.
#[derive(Debug, Clone)]
pub struct EscrowRepository {
    db: DatabaseConnection,
    timeouts: Timeouts,
    policy: LedgerPolicy,
}

impl EscrowRepository {
    /// Creates a new escrow repository with the default policy.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            timeouts: Timeouts::default(),
            policy: LedgerPolicy::default(),
        }
    }

    /// Overrides the fee and hold policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides the lock and statement timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Default hold end for an escrow opened now.
    #[must_use]
    pub fn default_hold_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        hold_until(now, self.policy.escrow_hold_days)
    }

    /// Opens a hold for a session.
    ///
    /// # Errors
    ///
    /// - `DuplicateEscrow` if the session already has a held escrow
    /// - `InvalidAmount` / `UnsupportedCurrency` for bad input
    pub async fn open(&self, input: OpenEscrowInput) -> Result<escrow_accounts::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let escrow = Self::open_in_txn(&txn, &input).await?;
        txn.commit().await?;

        info!(
            escrow_id = %escrow.id,
            session_id = %escrow.session_id,
            amount = %escrow.amount,
            currency = %escrow.currency,
            "Escrow opened"
        );
        Ok(escrow)
    }

    /// Opens a hold inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// See [`EscrowRepository::open`].
    pub async fn open_in_txn(
        txn: &DatabaseTransaction,
        input: &OpenEscrowInput,
    ) -> Result<escrow_accounts::Model, StoreError> {
        EscrowService::validate_open(input.payer_id, input.payee_id, input.amount)?;
        let currency = parse_currency(&input.currency)?;
        let now = Utc::now().into();

        let escrow = escrow_accounts::ActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(input.session_id),
            payment_id: Set(input.payment_id),
            payer_id: Set(input.payer_id),
            payee_id: Set(input.payee_id),
            amount: Set(input.amount),
            original_amount: Set(input.amount),
            currency: Set(currency.code().to_string()),
            status: Set(EscrowStatus::Held),
            hold_until: Set(input.hold_until.into()),
            released_at: Set(None),
            release_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let escrow = match escrow.insert(txn).await {
            Ok(escrow) => escrow,
            Err(e) if is_unique_violation(&e) => {
                return Err(LedgerError::DuplicateEscrow(input.session_id).into());
            }
            Err(e) => return Err(e.into()),
        };

        LedgerRepository::record_in(
            txn,
            RecordInput::new(
                escrow.payer_id,
                CoreTransactionType::EscrowHold,
                CoreTransactionStatus::Completed,
                escrow.amount,
                escrow.currency.clone(),
                format!("Escrow hold for session {}", escrow.session_id),
            )
            .reference(escrow.id, LEDGER_REFERENCE)
            .metadata(json!({
                "session_id": escrow.session_id,
                "payee_id": escrow.payee_id,
                "payment_id": escrow.payment_id,
            })),
        )
        .await?;

        Ok(escrow)
    }

    /// Releases a held escrow to the payee, minus the platform fee.
    ///
    /// # Errors
    ///
    /// - `EscrowNotFound`
    /// - `NotHeld` unless the escrow is held
    /// - `InvalidAmount` if a partial amount exceeds the hold
    /// - `WalletInactive` if the payee wallet is frozen
    pub async fn release(
        &self,
        escrow_id: Uuid,
        mode: ReleaseMode,
        reason: Option<String>,
    ) -> Result<EscrowRelease, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let escrow = Self::lock(&txn, escrow_id).await?;

        let plan = EscrowService::plan_release(
            escrow.id,
            escrow.status.into(),
            escrow.amount,
            mode,
            self.policy.platform_fee_percentage,
        )
        .inspect_err(|e| warn!(escrow_id = %escrow_id, error = %e, "Escrow release rejected"))?;

        let escrow = Self::settle_release(&txn, escrow, &plan, reason).await?;
        txn.commit().await?;

        info!(
            escrow_id = %escrow.id,
            released = %plan.fee.gross,
            fee = %plan.fee.fee,
            net = %plan.fee.net,
            payer_refund = %plan.payer_refund,
            status = %plan.new_status,
            "Escrow released"
        );
        Ok(EscrowRelease { escrow, plan })
    }

    /// Returns the whole hold to the payer, without fee.
    ///
    /// # Errors
    ///
    /// - `EscrowNotFound`
    /// - `NotHeld` unless the escrow is held
    pub async fn refund(
        &self,
        escrow_id: Uuid,
        reason: Option<String>,
    ) -> Result<escrow_accounts::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let escrow = Self::lock(&txn, escrow_id).await?;

        let plan = EscrowService::plan_refund(escrow.id, escrow.status.into(), escrow.amount)
            .inspect_err(|e| warn!(escrow_id = %escrow_id, error = %e, "Escrow refund rejected"))?;

        let escrow = Self::settle_refund(&txn, escrow, &plan, reason).await?;
        txn.commit().await?;

        info!(escrow_id = %escrow.id, amount = %plan.amount, "Escrow refunded");
        Ok(escrow)
    }

    /// Freezes a held escrow until an administrative decision.
    ///
    /// # Errors
    ///
    /// - `EscrowNotFound`
    /// - `NotHeld` unless the escrow is held
    pub async fn dispute(
        &self,
        escrow_id: Uuid,
        reason: Option<String>,
    ) -> Result<escrow_accounts::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let escrow = Self::lock(&txn, escrow_id).await?;
        let new_status = EscrowService::dispute(escrow.id, escrow.status.into())?;

        LedgerRepository::record_in(
            &txn,
            RecordInput::new(
                escrow.payer_id,
                CoreTransactionType::EscrowDispute,
                CoreTransactionStatus::Pending,
                escrow.amount,
                escrow.currency.clone(),
                format!("Escrow disputed for session {}", escrow.session_id),
            )
            .reference(escrow.id, LEDGER_REFERENCE)
            .metadata(json!({ "reason": reason })),
        )
        .await?;

        let mut active: escrow_accounts::ActiveModel = escrow.into();
        active.status = Set(new_status.into());
        active.updated_at = Set(Utc::now().into());
        let escrow = active.update(&txn).await?;
        txn.commit().await?;

        info!(escrow_id = %escrow.id, "Escrow disputed");
        Ok(escrow)
    }

    /// Applies the administrative decision on a disputed escrow.
    ///
    /// `Release` behaves like a full release, fee included; `Refund` returns
    /// everything to the payer.
    ///
    /// # Errors
    ///
    /// - `EscrowNotFound`
    /// - `InvalidTransition` unless the escrow is disputed
    pub async fn resolve_dispute(
        &self,
        escrow_id: Uuid,
        decision: DisputeDecision,
        reason: Option<String>,
    ) -> Result<escrow_accounts::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let escrow = Self::lock(&txn, escrow_id).await?;

        let resolution = EscrowService::plan_resolution(
            escrow.status.into(),
            escrow.amount,
            decision,
            self.policy.platform_fee_percentage,
        )?;

        let escrow = match resolution {
            DisputeResolution::Release(plan) => {
                Self::settle_release(&txn, escrow, &plan, reason).await?
            }
            DisputeResolution::Refund(plan) => {
                Self::settle_refund(&txn, escrow, &plan, reason).await?
            }
        };
        txn.commit().await?;

        info!(escrow_id = %escrow.id, ?decision, status = ?escrow.status, "Escrow dispute resolved");
        Ok(escrow)
    }

    /// Finds an escrow by id.
    ///
    /// # Errors
    ///
    /// Returns `EscrowNotFound` if it does not exist.
    pub async fn get(&self, escrow_id: Uuid) -> Result<escrow_accounts::Model, StoreError> {
        escrow_accounts::Entity::find_by_id(escrow_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::EscrowNotFound(escrow_id).into())
    }

    /// The held escrow for a session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_held_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<escrow_accounts::Model>, StoreError> {
        let escrow = escrow_accounts::Entity::find()
            .filter(escrow_accounts::Column::SessionId.eq(session_id))
            .filter(escrow_accounts::Column::Status.eq(EscrowStatus::Held))
            .one(&self.db)
            .await?;
        Ok(escrow)
    }

    /// Held escrows past their hold date, oldest first, in keyset-paged batches.
    ///
    /// Nothing is released or refunded here; the caller decides what to do
    /// with each batch.
    #[must_use]
    pub fn expire_sweep(&self, now: DateTime<Utc>, batch_size: u64) -> ExpiredEscrows {
        ExpiredEscrows {
            db: self.db.clone(),
            now,
            batch_size: batch_size.max(1),
            cursor: None,
            exhausted: false,
        }
    }

    async fn lock(
        txn: &DatabaseTransaction,
        escrow_id: Uuid,
    ) -> Result<escrow_accounts::Model, StoreError> {
        escrow_accounts::Entity::find_by_id(escrow_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| LedgerError::EscrowNotFound(escrow_id).into())
    }

    async fn settle_release(
        txn: &DatabaseTransaction,
        escrow: escrow_accounts::Model,
        plan: &ReleasePlan,
        reason: Option<String>,
    ) -> Result<escrow_accounts::Model, StoreError> {
        let currency = parse_currency(&escrow.currency)?;
        let payee_wallet = WalletRepository::ensure_in(txn, escrow.payee_id, currency).await?;
        let payer_wallet = if plan.payer_refund > Decimal::ZERO {
            let payer_wallet = WalletRepository::ensure_in(txn, escrow.payer_id, currency).await?;
            WalletRepository::lock_in_order(txn, &[payee_wallet.id, payer_wallet.id]).await?;
            Some(payer_wallet)
        } else {
            None
        };

        if plan.fee.net > Decimal::ZERO {
            WalletRepository::apply_in_txn(
                txn,
                &WalletMutation::credit(
                    payee_wallet.id,
                    plan.fee.net,
                    format!("Escrow release for session {}", escrow.session_id),
                )
                .with_reference(WalletReference::new(escrow.id, ReferenceKind::EscrowRelease)),
            )
            .await?;
        }

        if plan.fee.fee > Decimal::ZERO {
            PlatformFeeRepository::record_in(
                txn,
                escrow.id,
                FeeReferenceKind::EscrowRelease,
                &plan.fee,
                &escrow.currency,
            )
            .await?;
        }

        if let Some(payer_wallet) = payer_wallet {
            WalletRepository::apply_in_txn(
                txn,
                &WalletMutation::credit(
                    payer_wallet.id,
                    plan.payer_refund,
                    format!("Unreleased escrow remainder for session {}", escrow.session_id),
                )
                .with_reference(WalletReference::new(escrow.id, ReferenceKind::EscrowRefund)),
            )
            .await?;
        }

        LedgerRepository::record_in(
            txn,
            RecordInput::new(
                escrow.payee_id,
                CoreTransactionType::EscrowRelease,
                CoreTransactionStatus::Completed,
                plan.fee.net,
                escrow.currency.clone(),
                format!("Escrow release for session {}", escrow.session_id),
            )
            .reference(escrow.id, LEDGER_REFERENCE)
            .metadata(json!({
                "gross": plan.fee.gross,
                "fee": plan.fee.fee,
                "fee_percentage": plan.fee.percentage,
                "payer_refund": plan.payer_refund,
                "remaining_held": plan.remaining_held,
                "reason": reason,
            })),
        )
        .await?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: escrow_accounts::ActiveModel = escrow.into();
        active.status = Set(plan.new_status.into());
        active.amount = Set(plan.remaining_held);
        if plan.new_status != CoreEscrowStatus::Held {
            active.released_at = Set(Some(now));
        }
        active.release_reason = Set(reason);
        active.updated_at = Set(now);
        Ok(active.update(txn).await?)
    }

    async fn settle_refund(
        txn: &DatabaseTransaction,
        escrow: escrow_accounts::Model,
        plan: &RefundPlan,
        reason: Option<String>,
    ) -> Result<escrow_accounts::Model, StoreError> {
        let currency = parse_currency(&escrow.currency)?;
        let payer_wallet = WalletRepository::ensure_in(txn, escrow.payer_id, currency).await?;

        if plan.amount > Decimal::ZERO {
            WalletRepository::apply_in_txn(
                txn,
                &WalletMutation::credit(
                    payer_wallet.id,
                    plan.amount,
                    format!("Escrow refund for session {}", escrow.session_id),
                )
                .with_reference(WalletReference::new(escrow.id, ReferenceKind::EscrowRefund)),
            )
            .await?;
        }

        LedgerRepository::record_in(
            txn,
            RecordInput::new(
                escrow.payer_id,
                CoreTransactionType::EscrowRefund,
                CoreTransactionStatus::Completed,
                plan.amount,
                escrow.currency.clone(),
                format!("Escrow refund for session {}", escrow.session_id),
            )
            .reference(escrow.id, LEDGER_REFERENCE)
            .metadata(json!({ "reason": reason })),
        )
        .await?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: escrow_accounts::ActiveModel = escrow.into();
        active.status = Set(plan.new_status.into());
        active.amount = Set(Decimal::ZERO);
        active.released_at = Set(Some(now));
        active.release_reason = Set(reason);
        active.updated_at = Set(now);
        Ok(active.update(txn).await?)
    }
}

/// Keyset pager over expired holds, ordered by `(hold_until, id)`.
#[derive(Debug)]
pub struct ExpiredEscrows {
    db: DatabaseConnection,
    now: DateTime<Utc>,
    batch_size: u64,
    cursor: Option<(DateTimeWithTimeZone, Uuid)>,
    exhausted: bool,
}

impl ExpiredEscrows {
    /// Fetches the next batch, or `None` when there are no more.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<escrow_accounts::Model>>, StoreError> {
        if self.exhausted {
            return Ok(None);
        }

        let mut query = escrow_accounts::Entity::find()
            .filter(escrow_accounts::Column::Status.eq(EscrowStatus::Held))
            .filter(escrow_accounts::Column::HoldUntil.lt(self.now));

        if let Some((hold_until, id)) = self.cursor {
            query = query.filter(
                Condition::any()
                    .add(escrow_accounts::Column::HoldUntil.gt(hold_until))
                    .add(
                        Condition::all()
                            .add(escrow_accounts::Column::HoldUntil.eq(hold_until))
                            .add(escrow_accounts::Column::Id.gt(id)),
                    ),
            );
        }

        let batch = query
            .order_by_asc(escrow_accounts::Column::HoldUntil)
            .order_by_asc(escrow_accounts::Column::Id)
            .limit(self.batch_size)
            .all(&self.db)
            .await?;

        if u64::try_from(batch.len()).unwrap_or(u64::MAX) < self.batch_size {
            self.exhausted = true;
        }
        match batch.last() {
            Some(last) => {
                self.cursor = Some((last.hold_until, last.id));
                Ok(Some(batch))
            }
            None => Ok(None),
        }
    }
}

/// `now + days`, saturating at the latest representable time.
pub(crate) fn hold_until(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_until_adds_days() {
        let now = Utc::now();
        assert_eq!(hold_until(now, 7), now + TimeDelta::days(7));
    }

    #[test]
    fn test_hold_until_saturates() {
        assert_eq!(hold_until(Utc::now(), i64::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
