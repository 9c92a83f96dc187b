//! Webhook idempotency gate.
//!
//! Every inbound event is stored under UNIQUE (gateway, external_event_id)
//! before anything else happens. Delivery locks the stored row, runs the
//! handler in a savepoint and flips `processed` in the same transaction, so
//! an event's side effects are applied at most once no matter how many
//! times or how concurrently the gateway sends it.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mentorledger_core::webhook::{AdmitOutcome, DeliveryOutcome, InboundEvent, RetryPolicy};
use sea_orm::sea_query::{LockBehavior, LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::entities::{sea_orm_active_enums::PaymentGateway, webhook_events};
use crate::error::StoreError;
use crate::{Timeouts, begin_bounded};

/// Age after which an admitted but never attempted event counts as abandoned.
const UNATTEMPTED_GRACE_SECS: i64 = 60;

/// Applies the side effects of one stored event.
///
/// Implementations must do all their writes through `txn`; the gate commits
/// them together with the `processed` flag.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Handles the event.
    ///
    /// # Errors
    ///
    /// Any error rolls the handler's writes back and schedules a retry.
    async fn handle(
        &self,
        txn: &DatabaseTransaction,
        event: &webhook_events::Model,
    ) -> Result<(), StoreError>;
}

/// Webhook idempotency gate.
#[derive(Debug, Clone)]
pub struct WebhookGate {
    db: DatabaseConnection,
    timeouts: Timeouts,
    policy: RetryPolicy,
}

impl WebhookGate {
    /// Creates a gate with the default retry policy.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            timeouts: Timeouts::default(),
            policy: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides the lock and statement timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Stores an inbound event unless it was already seen.
    ///
    /// An event that is already stored but not yet processed, e.g. one whose
    /// handling failed, is accepted again so the redelivery can be applied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if no event id can be determined, or a
    /// database error.
    pub async fn admit(&self, inbound: &InboundEvent) -> Result<AdmitOutcome, StoreError> {
        let external_event_id = inbound.event_id()?;
        let event = webhook_events::ActiveModel {
            id: Set(Uuid::new_v4()),
            gateway: Set(inbound.gateway.into()),
            event_type: Set(inbound.event_type.clone()),
            external_event_id: Set(external_event_id.clone()),
            payload: Set(inbound.payload.clone()),
            signature: Set(inbound.signature.clone()),
            processed: Set(false),
            processed_at: Set(None),
            error_message: Set(None),
            retry_count: Set(0),
            next_attempt_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        let inserted = webhook_events::Entity::insert(event)
            .on_conflict(
                OnConflict::columns([
                    webhook_events::Column::Gateway,
                    webhook_events::Column::ExternalEventId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if inserted > 0 {
            debug!(
                gateway = %inbound.gateway,
                event_type = %inbound.event_type,
                external_event_id = %external_event_id,
                "Webhook admitted"
            );
            return Ok(AdmitOutcome::Accepted);
        }

        let existing = Self::find_stored(inbound, &external_event_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| vanished(&external_event_id))?;

        if existing.processed {
            debug!(
                gateway = %inbound.gateway,
                external_event_id = %external_event_id,
                "Duplicate webhook ignored"
            );
            Ok(AdmitOutcome::Duplicate)
        } else {
            debug!(
                event_id = %existing.id,
                gateway = %inbound.gateway,
                external_event_id = %external_event_id,
                retry_count = existing.retry_count,
                "Redelivery of unprocessed webhook accepted"
            );
            Ok(AdmitOutcome::Accepted)
        }
    }

    /// Admits an event and applies it through `handler`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the gate itself cannot read or write the
    /// event row. Handler failures are reported as
    /// [`DeliveryOutcome::Failed`] or [`DeliveryOutcome::Exhausted`].
    pub async fn deliver(
        &self,
        inbound: &InboundEvent,
        handler: &dyn WebhookHandler,
    ) -> Result<DeliveryOutcome, StoreError> {
        let external_event_id = inbound.event_id()?;
        let admitted = self.admit(inbound).await?;
        if admitted
            .ensure_accepted(inbound.gateway, &external_event_id)
            .is_err()
        {
            return Ok(DeliveryOutcome::Duplicate);
        }

        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let event = Self::find_stored(inbound, &external_event_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| vanished(&external_event_id))?;

        let outcome = self.attempt(&txn, event, handler, Utc::now()).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Re-delivers failed events whose backoff has elapsed, and events
    /// whose first delivery was abandoned.
    ///
    /// Rows are claimed with `FOR UPDATE SKIP LOCKED`, so several workers can
    /// run this concurrently without handling the same event twice.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn retry_due(
        &self,
        handler: &dyn WebhookHandler,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<(Uuid, DeliveryOutcome)>, StoreError> {
        let candidates: Vec<Uuid> = webhook_events::Entity::find()
            .select_only()
            .column(webhook_events::Column::Id)
            .filter(Self::due(now, self.policy))
            .order_by_asc(webhook_events::Column::CreatedAt)
            .limit(limit)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut outcomes = Vec::with_capacity(candidates.len());
        for id in candidates {
            let txn = begin_bounded(&self.db, self.timeouts).await?;
            let claimed = webhook_events::Entity::find_by_id(id)
                .filter(webhook_events::Column::Processed.eq(false))
                .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
                .one(&txn)
                .await?;

            let Some(event) = claimed else {
                debug!(event_id = %id, "Webhook claimed by another worker");
                txn.rollback().await?;
                continue;
            };

            let outcome = self.attempt(&txn, event, handler, now).await?;
            txn.commit().await?;
            outcomes.push((id, outcome));
        }

        if !outcomes.is_empty() {
            info!(count = outcomes.len(), "Webhook retries attempted");
        }
        Ok(outcomes)
    }

    /// Unprocessed events that used up their retries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn exhausted(&self, limit: u64) -> Result<Vec<webhook_events::Model>, StoreError> {
        let events = webhook_events::Entity::find()
            .filter(webhook_events::Column::Processed.eq(false))
            .filter(webhook_events::Column::RetryCount.gte(retry_count_column(self.policy.max_retries)))
            .order_by_asc(webhook_events::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(events)
    }

    /// Gives an exhausted event a fresh set of retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn requeue(&self, event_id: Uuid) -> Result<Option<webhook_events::Model>, StoreError> {
        let Some(event) = webhook_events::Entity::find_by_id(event_id)
            .filter(webhook_events::Column::Processed.eq(false))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut active: webhook_events::ActiveModel = event.into();
        active.retry_count = Set(0);
        active.next_attempt_at = Set(None);
        let event = active.update(&self.db).await?;

        info!(event_id = %event.id, "Webhook requeued");
        Ok(Some(event))
    }

    /// Finds a stored event.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, event_id: Uuid) -> Result<Option<webhook_events::Model>, StoreError> {
        Ok(webhook_events::Entity::find_by_id(event_id).one(&self.db).await?)
    }

    fn find_stored(
        inbound: &InboundEvent,
        external_event_id: &str,
    ) -> Select<webhook_events::Entity> {
        webhook_events::Entity::find()
            .filter(webhook_events::Column::Gateway.eq(PaymentGateway::from(inbound.gateway)))
            .filter(webhook_events::Column::ExternalEventId.eq(external_event_id))
    }

    fn due(now: DateTime<Utc>, policy: RetryPolicy) -> Condition {
        let abandoned_before = now - TimeDelta::seconds(UNATTEMPTED_GRACE_SECS);
        Condition::all()
            .add(webhook_events::Column::Processed.eq(false))
            .add(webhook_events::Column::RetryCount.lt(retry_count_column(policy.max_retries)))
            .add(
                Condition::any()
                    .add(webhook_events::Column::NextAttemptAt.lte(now))
                    .add(
                        Condition::all()
                            .add(webhook_events::Column::NextAttemptAt.is_null())
                            .add(webhook_events::Column::CreatedAt.lte(abandoned_before)),
                    ),
            )
    }

    /// Runs one delivery attempt on a locked row.
    async fn attempt(
        &self,
        txn: &DatabaseTransaction,
        event: webhook_events::Model,
        handler: &dyn WebhookHandler,
        now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, StoreError> {
        if event.processed {
            debug!(
                event_id = %event.id,
                external_event_id = %event.external_event_id,
                "Webhook already processed"
            );
            return Ok(DeliveryOutcome::Duplicate);
        }

        let retry_count = u32::try_from(event.retry_count).unwrap_or(0);
        if self.policy.is_exhausted(retry_count) {
            return Ok(DeliveryOutcome::Exhausted { retry_count });
        }
        if let Some(next_attempt_at) = event.next_attempt_at {
            let next_attempt_at = next_attempt_at.with_timezone(&Utc);
            if next_attempt_at > now {
                return Ok(DeliveryOutcome::Deferred { next_attempt_at });
            }
        }

        let savepoint = txn.begin().await?;
        let result = handler.handle(&savepoint, &event).await;

        match result {
            Ok(()) => {
                savepoint.commit().await?;
                let mut active: webhook_events::ActiveModel = event.into();
                active.processed = Set(true);
                active.processed_at = Set(Some(Utc::now().into()));
                active.error_message = Set(None);
                active.next_attempt_at = Set(None);
                let event = active.update(txn).await?;

                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    external_event_id = %event.external_event_id,
                    "Webhook processed"
                );
                Ok(DeliveryOutcome::Processed)
            }
            Err(e) => {
                savepoint.rollback().await?;
                let retry_count = retry_count.saturating_add(1);
                let next_attempt_at = self.policy.next_attempt_at(now, retry_count);
                let message = e.to_string();

                let mut active: webhook_events::ActiveModel = event.into();
                active.retry_count = Set(retry_count_column(retry_count));
                active.error_message = Set(Some(message.clone()));
                active.next_attempt_at = Set(Some(next_attempt_at.into()));
                let event = active.update(txn).await?;

                if self.policy.is_exhausted(retry_count) {
                    error!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        external_event_id = %event.external_event_id,
                        retry_count,
                        error = %message,
                        "Webhook retries exhausted; needs manual intervention"
                    );
                    Ok(DeliveryOutcome::Exhausted { retry_count })
                } else {
                    warn!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        retry_count,
                        next_attempt_at = %next_attempt_at,
                        error = %message,
                        "Webhook handling failed"
                    );
                    Ok(DeliveryOutcome::Failed {
                        retry_count,
                        next_attempt_at,
                        error: message,
                    })
                }
            }
        }
    }
}

fn vanished(external_event_id: &str) -> StoreError {
    StoreError::Database(sea_orm::DbErr::RecordNotFound(format!(
        "webhook event {external_event_id} vanished after admission"
    )))
}

fn retry_count_column(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}
