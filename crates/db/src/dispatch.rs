//! Webhook dispatcher.
//!
//! [`PaymentEventHandler`] is the [`WebhookHandler`] the gate runs for every
//! stored event. It locates the local payment, refund, payout or dispute the
//! event refers to and applies the reported status through the repositories,
//! all on the gate's transaction.

use async_trait::async_trait;
use mentorledger_core::LedgerError;
use mentorledger_core::dispute::{DisputeOutcome, DisputeStatus as CoreDisputeStatus};
use mentorledger_core::payment::{
    Gateway, PaymentStatus as CorePaymentStatus, PayoutStatus as CorePayoutStatus,
    RefundStatus as CoreRefundStatus,
};
use mentorledger_core::webhook::{GatewayObject, WebhookEventType};
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::entities::{
    payments, payouts, refunds, sea_orm_active_enums::PaymentGateway, webhook_events,
};
use crate::error::StoreError;
use crate::repositories::{
    DisputeRepository, OpenDisputeInput, PaymentRepository, ResolveOutcome, WebhookHandler,
};

/// Applies gateway events to payments, refunds, payouts and disputes.
#[derive(Debug, Clone)]
pub struct PaymentEventHandler {
    payments: PaymentRepository,
}

impl PaymentEventHandler {
    /// Creates a handler that settles payments with the given repository.
    #[must_use]
    pub const fn new(payments: PaymentRepository) -> Self {
        Self { payments }
    }

    async fn on_payment(
        &self,
        txn: &DatabaseTransaction,
        gateway: Gateway,
        object: &GatewayObject,
        to: CorePaymentStatus,
    ) -> Result<(), StoreError> {
        let payment = find_payment(txn, gateway, &object.id, object.reference.as_deref())
            .await?
            .ok_or_else(|| LedgerError::UnknownGatewayReference(object.id.clone()))?;

        if let Err(mismatch) = object.ensure_matches(payment.amount, &payment.currency) {
            error!(
                payment_id = %payment.id,
                status = %to,
                reported_amount = ?object.amount,
                reported_currency = ?object.currency,
                amount = %payment.amount,
                currency = %payment.currency,
                "Gateway payment does not match the ledger"
            );
            return Err(mismatch.into());
        }

        let result = self.payments.transition_payment_in(txn, payment.id, to).await;
        reconcile(result, to == CorePaymentStatus::Processing).map(|_| ())
    }

    async fn on_refund(
        txn: &DatabaseTransaction,
        gateway: Gateway,
        object: &GatewayObject,
        to: CoreRefundStatus,
    ) -> Result<(), StoreError> {
        let refund = match find_refund(txn, &object.id, object.reference.as_deref()).await? {
            Some(refund) => refund,
            None if to == CoreRefundStatus::Failed => {
                warn!(gateway_refund_id = %object.id, "Failed refund has no local record; ignoring");
                return Ok(());
            }
            None => {
                let payment_ref = object.payment_ref.as_deref().ok_or_else(|| {
                    LedgerError::InvalidPayload(format!("refund {} names no payment", object.id))
                })?;
                let payment = find_payment(txn, gateway, payment_ref, None)
                    .await?
                    .ok_or_else(|| LedgerError::UnknownGatewayReference(payment_ref.to_string()))?;
                let amount = object.amount.ok_or_else(|| {
                    LedgerError::InvalidPayload(format!("refund {} has no amount", object.id))
                })?;
                PaymentRepository::create_refund_in(
                    txn,
                    payment.id,
                    amount,
                    object.reason.clone(),
                    Some(object.id.clone()),
                )
                .await?
            }
        };

        let result =
            PaymentRepository::transition_refund_in(txn, refund.id, to, Some(object.id.clone()))
                .await;
        reconcile(result, false).map(|_| ())
    }

    async fn on_payout(
        txn: &DatabaseTransaction,
        object: &GatewayObject,
        to: CorePayoutStatus,
    ) -> Result<(), StoreError> {
        let payout = find_payout(txn, &object.id, object.reference.as_deref())
            .await?
            .ok_or_else(|| LedgerError::UnknownGatewayReference(object.id.clone()))?;

        let result = PaymentRepository::transition_payout_in(
            txn,
            payout.id,
            to,
            Some(object.id.clone()),
            object.reason.clone(),
        )
        .await;
        reconcile(result, false).map(|_| ())
    }

    async fn on_dispute_created(
        txn: &DatabaseTransaction,
        gateway: Gateway,
        object: &GatewayObject,
    ) -> Result<(), StoreError> {
        let payment_ref = object.payment_ref.as_deref().ok_or_else(|| {
            LedgerError::InvalidPayload(format!("dispute {} names no payment", object.id))
        })?;
        let payment = find_payment(txn, gateway, payment_ref, None)
            .await?
            .ok_or_else(|| LedgerError::UnknownGatewayReference(payment_ref.to_string()))?;

        DisputeRepository::open_in(
            txn,
            &OpenDisputeInput {
                payment_id: payment.id,
                amount: object.amount.unwrap_or(payment.amount),
                reason: object.reason.clone(),
                evidence_due_by: object.evidence_due_by,
                gateway_dispute_id: Some(object.id.clone()),
            },
        )
        .await?;
        Ok(())
    }

    async fn on_dispute_updated(
        txn: &DatabaseTransaction,
        object: &GatewayObject,
    ) -> Result<(), StoreError> {
        let dispute = DisputeRepository::find_by_gateway_id_in(txn, &object.id)
            .await?
            .ok_or_else(|| LedgerError::UnknownGatewayReference(object.id.clone()))?;

        let Some(reported) = object.status.as_deref().and_then(CoreDisputeStatus::from_gateway)
        else {
            warn!(
                dispute_id = %dispute.id,
                status = ?object.status,
                "Unrecognised dispute status; ignoring"
            );
            return Ok(());
        };

        let current = CoreDisputeStatus::from(dispute.status);
        if reported == current {
            debug!(dispute_id = %dispute.id, status = %current, "Dispute status unchanged");
            return Ok(());
        }

        let outcome = match reported {
            CoreDisputeStatus::NeedsResponse => {
                debug!(dispute_id = %dispute.id, status = %current, "Stale dispute update ignored");
                return Ok(());
            }
            CoreDisputeStatus::UnderReview => {
                let result = DisputeRepository::mark_under_review_in(txn, dispute.id).await;
                return reconcile(result, false).map(|_| ());
            }
            CoreDisputeStatus::Won => DisputeOutcome::Won,
            CoreDisputeStatus::Lost => DisputeOutcome::Lost,
        };

        match reconcile(DisputeRepository::resolve_in(txn, dispute.id, outcome).await, false)? {
            Some(ResolveOutcome::Resolved(_)) | None => Ok(()),
            Some(ResolveOutcome::ClawbackFailed { dispute, error }) => {
                error!(
                    dispute_id = %dispute.id,
                    error = %error,
                    "Lost dispute parked for manual clawback"
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl WebhookHandler for PaymentEventHandler {
    async fn handle(
        &self,
        txn: &DatabaseTransaction,
        event: &webhook_events::Model,
    ) -> Result<(), StoreError> {
        let gateway = Gateway::from(event.gateway);
        let Some(kind) = WebhookEventType::parse(&event.event_type) else {
            warn!(
                event_id = %event.id,
                gateway = %gateway,
                event_type = %event.event_type,
                "Unhandled webhook event type acknowledged"
            );
            return Ok(());
        };

        let object = GatewayObject::extract(gateway, kind, &event.payload)?;
        debug!(event_id = %event.id, event_type = %kind, object_id = %object.id, "Dispatching webhook");

        match kind {
            WebhookEventType::PaymentProcessing => {
                self.on_payment(txn, gateway, &object, CorePaymentStatus::Processing)
                    .await
            }
            WebhookEventType::PaymentSucceeded => {
                self.on_payment(txn, gateway, &object, CorePaymentStatus::Succeeded)
                    .await
            }
            WebhookEventType::PaymentFailed => {
                self.on_payment(txn, gateway, &object, CorePaymentStatus::Failed)
                    .await
            }
            WebhookEventType::RefundSucceeded => {
                Self::on_refund(txn, gateway, &object, CoreRefundStatus::Succeeded).await
            }
            WebhookEventType::RefundFailed => {
                Self::on_refund(txn, gateway, &object, CoreRefundStatus::Failed).await
            }
            WebhookEventType::PayoutPaid => {
                Self::on_payout(txn, &object, CorePayoutStatus::Succeeded).await
            }
            WebhookEventType::PayoutFailed => {
                Self::on_payout(txn, &object, CorePayoutStatus::Failed).await
            }
            WebhookEventType::DisputeCreated => {
                Self::on_dispute_created(txn, gateway, &object).await
            }
            WebhookEventType::DisputeUpdated => Self::on_dispute_updated(txn, &object).await,
        }
    }
}

/// Turns a rejected transition into an inconsistency with the gateway.
///
/// A stale intermediate status arriving after a final one is acknowledged
/// instead and yields `None`.
fn reconcile<T>(result: Result<T, StoreError>, stale_ok: bool) -> Result<Option<T>, StoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::Ledger(LedgerError::InvalidTransition { entity, from, to })) => {
            if stale_ok {
                debug!(entity, from = %from, to = %to, "Stale gateway status ignored");
                return Ok(None);
            }
            error!(
                entity,
                from = %from,
                to = %to,
                "Gateway reported a status that contradicts the ledger"
            );
            Err(LedgerError::ExternalInconsistency(format!(
                "gateway reports {entity} {to} but it is already {from}"
            ))
            .into())
        }
        Err(e) => Err(e),
    }
}

async fn find_payment(
    txn: &DatabaseTransaction,
    gateway: Gateway,
    gateway_payment_id: &str,
    reference: Option<&str>,
) -> Result<Option<payments::Model>, StoreError> {
    let by_gateway_id = payments::Entity::find()
        .filter(payments::Column::Gateway.eq(PaymentGateway::from(gateway)))
        .filter(payments::Column::GatewayPaymentId.eq(gateway_payment_id))
        .one(txn)
        .await?;
    if by_gateway_id.is_some() {
        return Ok(by_gateway_id);
    }
    match reference.and_then(|r| Uuid::parse_str(r).ok()) {
        Some(id) => Ok(payments::Entity::find_by_id(id).one(txn).await?),
        None => Ok(None),
    }
}

async fn find_refund(
    txn: &DatabaseTransaction,
    gateway_refund_id: &str,
    reference: Option<&str>,
) -> Result<Option<refunds::Model>, StoreError> {
    let by_gateway_id = refunds::Entity::find()
        .filter(refunds::Column::GatewayRefundId.eq(gateway_refund_id))
        .one(txn)
        .await?;
    if by_gateway_id.is_some() {
        return Ok(by_gateway_id);
    }
    match reference.and_then(|r| Uuid::parse_str(r).ok()) {
        Some(id) => Ok(refunds::Entity::find_by_id(id).one(txn).await?),
        None => Ok(None),
    }
}

async fn find_payout(
    txn: &DatabaseTransaction,
    gateway_payout_id: &str,
    reference: Option<&str>,
) -> Result<Option<payouts::Model>, StoreError> {
    let by_gateway_id = payouts::Entity::find()
        .filter(payouts::Column::GatewayPayoutId.eq(gateway_payout_id))
        .one(txn)
        .await?;
    if by_gateway_id.is_some() {
        return Ok(by_gateway_id);
    }
    match reference.and_then(|r| Uuid::parse_str(r).ok()) {
        Some(id) => Ok(payouts::Entity::find_by_id(id).one(txn).await?),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contradicting_transition_becomes_inconsistency() {
        let rejected: Result<(), StoreError> =
            Err(LedgerError::invalid_transition("payment", "failed", "succeeded").into());

        let err = reconcile(rejected, false).unwrap_err();
        assert_eq!(err.error_code(), "EXTERNAL_INCONSISTENCY");
        assert!(err.requires_alert());
    }

    #[test]
    fn test_stale_intermediate_status_is_acknowledged() {
        let rejected: Result<(), StoreError> =
            Err(LedgerError::invalid_transition("payment", "succeeded", "processing").into());

        assert_eq!(reconcile(rejected, true).unwrap(), None);
    }

    #[test]
    fn test_other_errors_pass_through() {
        let missing: Result<(), StoreError> =
            Err(LedgerError::UnknownGatewayReference("pi_123".into()).into());

        let err = reconcile(missing, false).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_GATEWAY_REFERENCE");
    }
}
