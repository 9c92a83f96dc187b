//! Payment, refund and payout repository.
//!
//! Status changes are validated by [`PaymentService`] against the locked row
//! and write exactly one ledger record each. The money effects of a settled
//! payment depend on its purpose: session payments open an escrow,
//! subscriptions book a platform fee, top-ups credit the payer's wallet.

use chrono::{DateTime, Utc};
use mentorledger_core::LedgerError;
use mentorledger_core::fee::FeeCalculator;
use mentorledger_core::ledger::{
    TransactionStatus as CoreTransactionStatus, TransactionType as CoreTransactionType,
    parse_currency, validate_amount,
};
use mentorledger_core::payment::{
    Gateway, PaymentPurpose, PaymentService, PaymentStatus as CorePaymentStatus,
    PayoutStatus as CorePayoutStatus, RefundStatus as CoreRefundStatus, Transition,
};
use mentorledger_core::wallet::{ReferenceKind, WalletReference};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::escrow::{EscrowRepository, OpenEscrowInput, hold_until};
use super::ledger::{LedgerRepository, RecordInput};
use super::platform_fee::PlatformFeeRepository;
use super::wallet::{WalletMutation, WalletRepository};
use crate::entities::{
    payments, payouts, refunds,
    sea_orm_active_enums::{FeeReferenceKind, PaymentGateway, PaymentStatus, PayoutStatus, RefundStatus},
};
use crate::error::{StoreError, is_unique_violation};
use crate::{LedgerPolicy, Timeouts, begin_bounded};

/// Input for recording a payment initiated at a gateway.
#[derive(Debug, Clone)]
pub struct CreatePaymentInput {
    /// Paying user.
    pub payer_id: Uuid,
    /// Mentor, for session payments.
    pub payee_id: Option<Uuid>,
    /// Captured amount.
    pub amount: Decimal,
    /// ISO 4217 code.
    pub currency: String,
    /// Gateway handling the payment.
    pub gateway: Gateway,
    /// Gateway-assigned payment id.
    pub gateway_payment_id: String,
    /// Booked session, if any.
    pub session_id: Option<Uuid>,
    /// Subscription being paid, if any.
    pub subscription_id: Option<Uuid>,
    /// Fee rate override; defaults to the platform rate.
    pub fee_percentage: Option<Decimal>,
}

/// Input for requesting a mentor payout.
#[derive(Debug, Clone)]
pub struct CreatePayoutInput {
    /// Mentor being paid.
    pub mentor_id: Uuid,
    /// Amount taken from the mentor's wallet.
    pub amount: Decimal,
    /// ISO 4217 code.
    pub currency: String,
    /// Destination account at the gateway.
    pub payment_method_id: Option<String>,
    /// Gateway that will execute the payout.
    pub gateway: Option<Gateway>,
    /// Fee rate override; defaults to the platform rate.
    pub fee_percentage: Option<Decimal>,
    /// Requested execution time.
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Payment repository.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
    timeouts: Timeouts,
    policy: LedgerPolicy,
}

impl PaymentRepository {
    /// Creates a new payment repository with the default policy.
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

    // ========================================================================
    // Payments
    // ========================================================================

    /// Records a new pending payment.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` / `UnsupportedCurrency` for bad input
    /// - `DuplicatePayment` if the gateway id is already recorded
    pub async fn create_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<payments::Model, StoreError> {
        validate_amount(input.amount)?;
        let currency = parse_currency(&input.currency)?;
        let purpose = PaymentPurpose::classify(input.session_id, input.payee_id, input.subscription_id);
        let fee_percentage = input
            .fee_percentage
            .unwrap_or(self.policy.platform_fee_percentage);
        FeeCalculator::validate_percentage(fee_percentage)?;
        let service_fee = PaymentService::service_fee(purpose, input.amount, fee_percentage)?;

        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let now = Utc::now().into();

        let payment = payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            payer_id: Set(input.payer_id),
            payee_id: Set(input.payee_id),
            amount: Set(input.amount),
            currency: Set(currency.code().to_string()),
            status: Set(PaymentStatus::Pending),
            gateway: Set(input.gateway.into()),
            gateway_payment_id: Set(input.gateway_payment_id.clone()),
            session_id: Set(input.session_id),
            subscription_id: Set(input.subscription_id),
            fee_percentage: Set(fee_percentage),
            service_fee: Set(service_fee),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let payment = match payment.insert(&txn).await {
            Ok(payment) => payment,
            Err(e) if is_unique_violation(&e) => {
                return Err(LedgerError::DuplicatePayment(input.gateway_payment_id).into());
            }
            Err(e) => return Err(e.into()),
        };

        LedgerRepository::record_in(&txn, Self::payment_record(&payment, CorePaymentStatus::Pending))
            .await?;
        txn.commit().await?;

        info!(
            payment_id = %payment.id,
            gateway = %input.gateway,
            amount = %payment.amount,
            currency = %payment.currency,
            "Payment created"
        );
        Ok(payment)
    }

    /// Moves a payment to a new status and applies its money effects.
    ///
    /// Re-applying the current status is a no-op.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound`
    /// - `InvalidTransition` for a backwards or terminal change
    /// - `DuplicateEscrow` if the session already has a held escrow
    pub async fn transition_payment(
        &self,
        payment_id: Uuid,
        to: CorePaymentStatus,
    ) -> Result<payments::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let (payment, transition) = self.transition_payment_in(&txn, payment_id, to).await?;
        txn.commit().await?;

        if transition == Transition::Changed {
            info!(payment_id = %payment.id, status = %to, "Payment status changed");
        }
        Ok(payment)
    }

    /// [`PaymentRepository::transition_payment`] inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// See [`PaymentRepository::transition_payment`].
    pub async fn transition_payment_in(
        &self,
        txn: &DatabaseTransaction,
        payment_id: Uuid,
        to: CorePaymentStatus,
    ) -> Result<(payments::Model, Transition), StoreError> {
        let payment = payments::Entity::find_by_id(payment_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(LedgerError::PaymentNotFound(payment_id))?;

        let transition = PaymentService::payment_transition(payment.status.into(), to)?;
        if transition == Transition::Unchanged {
            debug!(payment_id = %payment_id, status = %to, "Payment already in requested status");
            return Ok((payment, transition));
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: payments::ActiveModel = payment.into();
        active.status = Set(to.into());
        active.updated_at = Set(now);
        if to == CorePaymentStatus::Succeeded {
            active.completed_at = Set(Some(now));
        }
        let payment = active.update(txn).await?;

        LedgerRepository::record_in(txn, Self::payment_record(&payment, to)).await?;

        if to == CorePaymentStatus::Succeeded {
            self.settle_payment(txn, &payment).await?;
        }

        Ok((payment, transition))
    }

    /// Finds a payment by id.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound` if it does not exist.
    pub async fn get_payment(&self, payment_id: Uuid) -> Result<payments::Model, StoreError> {
        payments::Entity::find_by_id(payment_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::PaymentNotFound(payment_id).into())
    }

    /// Finds a payment by its gateway id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_payment_by_gateway_id(
        &self,
        gateway: Gateway,
        gateway_payment_id: &str,
    ) -> Result<Option<payments::Model>, StoreError> {
        let payment = payments::Entity::find()
            .filter(payments::Column::Gateway.eq(PaymentGateway::from(gateway)))
            .filter(payments::Column::GatewayPaymentId.eq(gateway_payment_id))
            .one(&self.db)
            .await?;
        Ok(payment)
    }

    async fn settle_payment(
        &self,
        txn: &DatabaseTransaction,
        payment: &payments::Model,
    ) -> Result<(), StoreError> {
        let currency = parse_currency(&payment.currency)?;
        match PaymentPurpose::classify(payment.session_id, payment.payee_id, payment.subscription_id) {
            PaymentPurpose::Session {
                session_id,
                payee_id,
            } => {
                let now = Utc::now();
                EscrowRepository::open_in_txn(
                    txn,
                    &OpenEscrowInput {
                        session_id,
                        payer_id: payment.payer_id,
                        payee_id,
                        amount: payment.amount,
                        currency: payment.currency.clone(),
                        hold_until: hold_until(now, self.policy.escrow_hold_days),
                        payment_id: Some(payment.id),
                    },
                )
                .await?;
            }
            PaymentPurpose::Subscription { .. } => {
                if payment.service_fee > Decimal::ZERO {
                    let breakdown = FeeCalculator::split(payment.amount, payment.fee_percentage)?;
                    PlatformFeeRepository::record_in(
                        txn,
                        payment.id,
                        FeeReferenceKind::Payment,
                        &breakdown,
                        &payment.currency,
                    )
                    .await?;
                }
            }
            PaymentPurpose::TopUp => {
                let wallet = WalletRepository::ensure_in(txn, payment.payer_id, currency).await?;
                WalletRepository::apply_in_txn(
                    txn,
                    &WalletMutation::credit(wallet.id, payment.amount, "Wallet top-up")
                        .with_reference(WalletReference::new(payment.id, ReferenceKind::Payment)),
                )
                .await?;
            }
        }
        Ok(())
    }

    fn payment_record(payment: &payments::Model, status: CorePaymentStatus) -> RecordInput {
        RecordInput::new(
            payment.payer_id,
            CoreTransactionType::Payment,
            PaymentService::payment_ledger_status(status),
            payment.amount,
            payment.currency.clone(),
            format!("Payment {status}"),
        )
        .reference(payment.id, "payment")
        .gateway(payment.gateway.into(), Some(payment.gateway_payment_id.clone()))
        .metadata(json!({
            "session_id": payment.session_id,
            "subscription_id": payment.subscription_id,
            "service_fee": payment.service_fee,
        }))
    }

    // ========================================================================
    // Refunds
    // ========================================================================

    /// Requests a refund against a settled payment.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` / `PaymentNotSettled`
    /// - `InvalidAmount` if non-failed refunds would exceed the payment
    pub async fn create_refund(
        &self,
        payment_id: Uuid,
        amount: Decimal,
        reason: Option<String>,
        gateway_refund_id: Option<String>,
    ) -> Result<refunds::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let refund = Self::create_refund_in(&txn, payment_id, amount, reason, gateway_refund_id).await?;
        txn.commit().await?;

        info!(refund_id = %refund.id, payment_id = %payment_id, amount = %amount, "Refund requested");
        Ok(refund)
    }

    /// [`PaymentRepository::create_refund`] inside the caller's transaction.
    ///
    /// The payment row stays locked so concurrent refunds cannot both pass
    /// the cap check.
    ///
    /// # Errors
    ///
    /// See [`PaymentRepository::create_refund`].
    pub async fn create_refund_in(
        txn: &DatabaseTransaction,
        payment_id: Uuid,
        amount: Decimal,
        reason: Option<String>,
        gateway_refund_id: Option<String>,
    ) -> Result<refunds::Model, StoreError> {
        let payment = payments::Entity::find_by_id(payment_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(LedgerError::PaymentNotFound(payment_id))?;

        let already_refunded: Option<Option<Decimal>> = refunds::Entity::find()
            .select_only()
            .column_as(refunds::Column::Amount.sum(), "total")
            .filter(refunds::Column::PaymentId.eq(payment_id))
            .filter(refunds::Column::Status.ne(RefundStatus::Failed))
            .into_tuple()
            .one(txn)
            .await?;

        PaymentService::validate_refund(
            payment.id,
            payment.status.into(),
            payment.amount,
            already_refunded.flatten().unwrap_or(Decimal::ZERO),
            amount,
        )?;

        let now = Utc::now().into();
        let refund = refunds::ActiveModel {
            id: Set(Uuid::new_v4()),
            payment_id: Set(payment.id),
            amount: Set(amount),
            currency: Set(payment.currency.clone()),
            status: Set(RefundStatus::Pending),
            reason: Set(reason),
            gateway_refund_id: Set(gateway_refund_id),
            processed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        LedgerRepository::record_in(
            txn,
            Self::refund_record(&payment, &refund, CoreRefundStatus::Pending),
        )
        .await?;

        Ok(refund)
    }

    /// Moves a refund to a new status.
    ///
    /// A succeeded refund of a top-up takes the money back out of the
    /// payer's wallet.
    ///
    /// # Errors
    ///
    /// - `RefundNotFound`
    /// - `InvalidTransition` for a terminal change
    /// - `InsufficientBalance` if the payer already spent a refunded top-up
    pub async fn transition_refund(
        &self,
        refund_id: Uuid,
        to: CoreRefundStatus,
        gateway_refund_id: Option<String>,
    ) -> Result<refunds::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let (refund, transition) =
            Self::transition_refund_in(&txn, refund_id, to, gateway_refund_id).await?;
        txn.commit().await?;

        if transition == Transition::Changed {
            info!(refund_id = %refund.id, status = %to, "Refund status changed");
        }
        Ok(refund)
    }

    /// [`PaymentRepository::transition_refund`] inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// See [`PaymentRepository::transition_refund`].
    pub async fn transition_refund_in(
        txn: &DatabaseTransaction,
        refund_id: Uuid,
        to: CoreRefundStatus,
        gateway_refund_id: Option<String>,
    ) -> Result<(refunds::Model, Transition), StoreError> {
        let refund = refunds::Entity::find_by_id(refund_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(LedgerError::RefundNotFound(refund_id))?;

        let transition = PaymentService::refund_transition(refund.status.into(), to)?;
        if transition == Transition::Unchanged {
            debug!(refund_id = %refund_id, status = %to, "Refund already in requested status");
            return Ok((refund, transition));
        }

        let payment = payments::Entity::find_by_id(refund.payment_id)
            .one(txn)
            .await?
            .ok_or(LedgerError::PaymentNotFound(refund.payment_id))?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: refunds::ActiveModel = refund.into();
        active.status = Set(to.into());
        active.processed_at = Set(Some(now));
        active.updated_at = Set(now);
        if let Some(gateway_refund_id) = gateway_refund_id {
            active.gateway_refund_id = Set(Some(gateway_refund_id));
        }
        let refund = active.update(txn).await?;

        if to == CoreRefundStatus::Succeeded
            && PaymentPurpose::classify(payment.session_id, payment.payee_id, payment.subscription_id)
                == PaymentPurpose::TopUp
        {
            let currency = parse_currency(&payment.currency)?;
            let wallet = WalletRepository::ensure_in(txn, payment.payer_id, currency).await?;
            WalletRepository::apply_in_txn(
                txn,
                &WalletMutation::debit(wallet.id, refund.amount, "Top-up refunded")
                    .with_reference(WalletReference::new(refund.id, ReferenceKind::Refund)),
            )
            .await?;
        }

        LedgerRepository::record_in(txn, Self::refund_record(&payment, &refund, to)).await?;

        Ok((refund, transition))
    }

    /// Finds a refund by id.
    ///
    /// # Errors
    ///
    /// Returns `RefundNotFound` if it does not exist.
    pub async fn get_refund(&self, refund_id: Uuid) -> Result<refunds::Model, StoreError> {
        refunds::Entity::find_by_id(refund_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::RefundNotFound(refund_id).into())
    }

    /// Finds a refund by its gateway id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_refund_by_gateway_id(
        &self,
        gateway_refund_id: &str,
    ) -> Result<Option<refunds::Model>, StoreError> {
        let refund = refunds::Entity::find()
            .filter(refunds::Column::GatewayRefundId.eq(gateway_refund_id))
            .one(&self.db)
            .await?;
        Ok(refund)
    }

    /// Refunds recorded against a payment, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn refunds_for_payment(
        &self,
        payment_id: Uuid,
    ) -> Result<Vec<refunds::Model>, StoreError> {
        let refunds = refunds::Entity::find()
            .filter(refunds::Column::PaymentId.eq(payment_id))
            .order_by_asc(refunds::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(refunds)
    }

    fn refund_record(
        payment: &payments::Model,
        refund: &refunds::Model,
        status: CoreRefundStatus,
    ) -> RecordInput {
        RecordInput::new(
            payment.payer_id,
            CoreTransactionType::Refund,
            PaymentService::refund_ledger_status(status),
            refund.amount,
            refund.currency.clone(),
            format!("Refund {status}"),
        )
        .reference(refund.id, "refund")
        .gateway(payment.gateway.into(), refund.gateway_refund_id.clone())
        .metadata(json!({ "payment_id": payment.id, "reason": refund.reason }))
    }

    // ========================================================================
    // Payouts
    // ========================================================================

    /// Requests a payout, reserving the funds in the mentor's wallet.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` / `UnsupportedCurrency` for bad input
    /// - `InsufficientBalance` if the wallet cannot cover the payout
    /// - `WalletInactive` if the wallet is frozen
    pub async fn create_payout(
        &self,
        input: CreatePayoutInput,
    ) -> Result<payouts::Model, StoreError> {
        validate_amount(input.amount)?;
        let currency = parse_currency(&input.currency)?;
        let fee_percentage = input
            .fee_percentage
            .unwrap_or(self.policy.platform_fee_percentage);
        FeeCalculator::validate_percentage(fee_percentage)?;

        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let wallet = WalletRepository::ensure_in(&txn, input.mentor_id, currency).await?;
        let payout_id = Uuid::new_v4();

        WalletRepository::apply_in_txn(
            &txn,
            &WalletMutation::debit(wallet.id, input.amount, "Payout requested")
                .with_reference(WalletReference::new(payout_id, ReferenceKind::Payout)),
        )
        .await?;

        let now = Utc::now().into();
        let payout = payouts::ActiveModel {
            id: Set(payout_id),
            mentor_id: Set(input.mentor_id),
            wallet_id: Set(wallet.id),
            amount: Set(input.amount),
            currency: Set(currency.code().to_string()),
            fee_percentage: Set(fee_percentage),
            status: Set(PayoutStatus::Pending),
            payment_method_id: Set(input.payment_method_id),
            gateway: Set(input.gateway.map(PaymentGateway::from)),
            gateway_payout_id: Set(None),
            failure_reason: Set(None),
            scheduled_at: Set(input.scheduled_at.map(Into::into)),
            processed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        LedgerRepository::record_in(&txn, Self::payout_record(&payout, CorePayoutStatus::Pending))
            .await?;
        txn.commit().await?;

        info!(
            payout_id = %payout.id,
            mentor_id = %payout.mentor_id,
            amount = %payout.amount,
            "Payout requested"
        );
        Ok(payout)
    }

    /// Moves a payout to a new status.
    ///
    /// A failed payout returns the reserved funds; a succeeded one books the
    /// platform fee.
    ///
    /// # Errors
    ///
    /// - `PayoutNotFound`
    /// - `InvalidTransition` for a backwards or terminal change
    pub async fn transition_payout(
        &self,
        payout_id: Uuid,
        to: CorePayoutStatus,
        gateway_payout_id: Option<String>,
        failure_reason: Option<String>,
    ) -> Result<payouts::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let (payout, transition) =
            Self::transition_payout_in(&txn, payout_id, to, gateway_payout_id, failure_reason)
                .await?;
        txn.commit().await?;

        if transition == Transition::Changed {
            info!(payout_id = %payout.id, status = %to, "Payout status changed");
        }
        Ok(payout)
    }

    /// [`PaymentRepository::transition_payout`] inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// See [`PaymentRepository::transition_payout`].
    pub async fn transition_payout_in(
        txn: &DatabaseTransaction,
        payout_id: Uuid,
        to: CorePayoutStatus,
        gateway_payout_id: Option<String>,
        failure_reason: Option<String>,
    ) -> Result<(payouts::Model, Transition), StoreError> {
        let payout = payouts::Entity::find_by_id(payout_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(LedgerError::PayoutNotFound(payout_id))?;

        let transition = PaymentService::payout_transition(payout.status.into(), to)?;
        if transition == Transition::Unchanged {
            debug!(payout_id = %payout_id, status = %to, "Payout already in requested status");
            return Ok((payout, transition));
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let terminal = matches!(to, CorePayoutStatus::Succeeded | CorePayoutStatus::Failed);
        let mut active: payouts::ActiveModel = payout.into();
        active.status = Set(to.into());
        active.updated_at = Set(now);
        if terminal {
            active.processed_at = Set(Some(now));
        }
        if let Some(gateway_payout_id) = gateway_payout_id {
            active.gateway_payout_id = Set(Some(gateway_payout_id));
        }
        if to == CorePayoutStatus::Failed {
            active.failure_reason = Set(failure_reason);
        }
        let payout = active.update(txn).await?;

        match to {
            CorePayoutStatus::Failed => {
                WalletRepository::apply_in_txn(
                    txn,
                    &WalletMutation::credit(payout.wallet_id, payout.amount, "Payout failed, funds returned")
                        .with_reference(WalletReference::new(payout.id, ReferenceKind::Payout)),
                )
                .await?;
            }
            CorePayoutStatus::Succeeded => {
                let breakdown = FeeCalculator::split(payout.amount, payout.fee_percentage)?;
                if breakdown.fee > Decimal::ZERO {
                    PlatformFeeRepository::record_in(
                        txn,
                        payout.id,
                        FeeReferenceKind::Payout,
                        &breakdown,
                        &payout.currency,
                    )
                    .await?;
                }
            }
            CorePayoutStatus::Pending | CorePayoutStatus::Processing => {}
        }

        LedgerRepository::record_in(txn, Self::payout_record(&payout, to)).await?;

        Ok((payout, transition))
    }

    /// Finds a payout by id.
    ///
    /// # Errors
    ///
    /// Returns `PayoutNotFound` if it does not exist.
    pub async fn get_payout(&self, payout_id: Uuid) -> Result<payouts::Model, StoreError> {
        payouts::Entity::find_by_id(payout_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::PayoutNotFound(payout_id).into())
    }

    /// Finds a payout by its gateway id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_payout_by_gateway_id(
        &self,
        gateway_payout_id: &str,
    ) -> Result<Option<payouts::Model>, StoreError> {
        let payout = payouts::Entity::find()
            .filter(payouts::Column::GatewayPayoutId.eq(gateway_payout_id))
            .one(&self.db)
            .await?;
        Ok(payout)
    }

    fn payout_record(payout: &payouts::Model, status: CorePayoutStatus) -> RecordInput {
        let mut record = RecordInput::new(
            payout.mentor_id,
            CoreTransactionType::Payout,
            PaymentService::payout_ledger_status(status),
            payout.amount,
            payout.currency.clone(),
            format!("Payout {status}"),
        )
        .reference(payout.id, "payout")
        .metadata(json!({
            "fee_percentage": payout.fee_percentage,
            "failure_reason": payout.failure_reason,
        }));
        if let Some(gateway) = payout.gateway {
            record = record.gateway(gateway.into(), payout.gateway_payout_id.clone());
        }
        record
    }
}
