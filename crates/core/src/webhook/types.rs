//! Inbound gateway event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::payment::types::Gateway;
use crate::webhook::payload;

/// Normalised event kinds the ledger reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEventType {
    /// Gateway started processing a payment.
    PaymentProcessing,
    /// Payment captured.
    PaymentSucceeded,
    /// Payment rejected.
    PaymentFailed,
    /// Refund completed.
    RefundSucceeded,
    /// Refund rejected.
    RefundFailed,
    /// Payout reached the destination.
    PayoutPaid,
    /// Payout rejected.
    PayoutFailed,
    /// Chargeback opened.
    DisputeCreated,
    /// Chargeback changed status or closed.
    DisputeUpdated,
}

impl WebhookEventType {
    /// Canonical name stored with the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PaymentProcessing => "payment.processing",
            Self::PaymentSucceeded => "payment.succeeded",
            Self::PaymentFailed => "payment.failed",
            Self::RefundSucceeded => "refund.succeeded",
            Self::RefundFailed => "refund.failed",
            Self::PayoutPaid => "payout.paid",
            Self::PayoutFailed => "payout.failed",
            Self::DisputeCreated => "dispute.created",
            Self::DisputeUpdated => "dispute.updated",
        }
    }

    /// Parses a canonical name or a gateway-native event name.
    ///
    /// Returns `None` for events the ledger does not handle.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let name = raw.trim().to_lowercase();
        let kind = match name.as_str() {
            "payment.processing"
            | "payment_intent.processing"
            | "payment.authorized"
            | "payment.capture.pending" => Self::PaymentProcessing,
            "payment.succeeded"
            | "payment_intent.succeeded"
            | "payment.captured"
            | "payment.capture.completed" => Self::PaymentSucceeded,
            "payment.failed" | "payment_intent.payment_failed" | "payment.capture.denied" => {
                Self::PaymentFailed
            }
            "refund.succeeded" | "refund.processed" | "payment.capture.refunded" => {
                Self::RefundSucceeded
            }
            "refund.failed" => Self::RefundFailed,
            "payout.paid" | "payout.processed" | "payment.payouts-item.succeeded" => {
                Self::PayoutPaid
            }
            "payout.failed" | "payout.reversed" | "payment.payouts-item.failed" => {
                Self::PayoutFailed
            }
            "dispute.created" | "charge.dispute.created" | "payment.dispute.created"
            | "customer.dispute.created" => Self::DisputeCreated,
            "dispute.updated"
            | "charge.dispute.updated"
            | "charge.dispute.closed"
            | "payment.dispute.under_review"
            | "payment.dispute.won"
            | "payment.dispute.lost"
            | "payment.dispute.closed"
            | "customer.dispute.updated"
            | "customer.dispute.resolved" => Self::DisputeUpdated,
            _ => return None,
        };
        Some(kind)
    }

    /// Object family the event carries, used to locate it in nested payloads.
    #[must_use]
    pub const fn object_kind(self) -> &'static str {
        match self {
            Self::PaymentProcessing | Self::PaymentSucceeded | Self::PaymentFailed => "payment",
            Self::RefundSucceeded | Self::RefundFailed => "refund",
            Self::PayoutPaid | Self::PayoutFailed => "payout",
            Self::DisputeCreated | Self::DisputeUpdated => "dispute",
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A webhook as received, after signature verification.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Gateway that sent the event.
    pub gateway: Gateway,
    /// Event name as sent by the gateway.
    pub event_type: String,
    /// Gateway-assigned event id, if delivered out of band (e.g. a header).
    pub external_event_id: Option<String>,
    /// Raw payload.
    pub payload: serde_json::Value,
    /// Signature header, kept for audit.
    pub signature: Option<String>,
}

impl InboundEvent {
    /// Creates an event whose id will be read from the payload.
    #[must_use]
    pub fn new(gateway: Gateway, event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            gateway,
            event_type: event_type.into(),
            external_event_id: None,
            payload,
            signature: None,
        }
    }

    /// Sets the event id explicitly.
    #[must_use]
    pub fn with_event_id(mut self, id: impl Into<String>) -> Self {
        self.external_event_id = Some(id.into());
        self
    }

    /// Attaches the signature header.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Resolves the deduplication key: the explicit id, else the payload's.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` when neither source carries an id.
    pub fn event_id(&self) -> Result<String, LedgerError> {
        self.external_event_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| payload::event_id(self.gateway, &self.payload))
            .ok_or_else(|| {
                LedgerError::InvalidPayload(format!(
                    "{} event '{}' carries no event id",
                    self.gateway, self.event_type
                ))
            })
    }
}

/// Result of persisting an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// Stored now, or stored earlier and still waiting to be processed.
    Accepted,
    /// Already stored and processed; nothing was written.
    Duplicate,
}

impl AdmitOutcome {
    /// Turns a duplicate into [`LedgerError::DuplicateEvent`].
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEvent` when the event was already processed.
    pub fn ensure_accepted(
        self,
        gateway: Gateway,
        external_event_id: &str,
    ) -> Result<(), LedgerError> {
        match self {
            Self::Accepted => Ok(()),
            Self::Duplicate => Err(LedgerError::DuplicateEvent {
                gateway: gateway.to_string(),
                external_event_id: external_event_id.to_string(),
            }),
        }
    }
}

/// Result of delivering an event to its handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Side effects committed and the event marked processed.
    Processed,
    /// Event had already been processed.
    Duplicate,
    /// Event is waiting out its backoff.
    Deferred {
        /// Earliest time of the next attempt.
        next_attempt_at: DateTime<Utc>,
    },
    /// Handler failed; the event will be retried.
    Failed {
        /// Failures so far.
        retry_count: u32,
        /// Earliest time of the next attempt.
        next_attempt_at: DateTime<Utc>,
        /// Handler error message.
        error: String,
    },
    /// Retries used up; needs manual intervention.
    Exhausted {
        /// Failures so far.
        retry_count: u32,
    },
}
