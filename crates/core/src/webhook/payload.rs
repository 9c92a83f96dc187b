//! Gateway payload extraction.
//!
//! Each gateway nests the interesting object differently and encodes amounts
//! differently: Stripe and Razorpay send integer minor units, PayPal and UPI
//! send decimal strings. Everything is normalised into [`GatewayObject`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::LedgerError;
use crate::payment::types::Gateway;
use crate::webhook::types::WebhookEventType;

/// The object a gateway event is about, normalised across gateways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayObject {
    /// Gateway id of the object (payment, refund, payout or dispute id).
    pub id: String,
    /// Gateway id of the underlying payment, for refunds and disputes.
    pub payment_ref: Option<String>,
    /// Merchant reference echoed back by the gateway (our own record id).
    pub reference: Option<String>,
    /// Amount in major units.
    pub amount: Option<Decimal>,
    /// ISO 4217 code, upper-cased.
    pub currency: Option<String>,
    /// Reason text or code.
    pub reason: Option<String>,
    /// Gateway status string.
    pub status: Option<String>,
    /// Deadline for submitting dispute evidence.
    pub evidence_due_by: Option<DateTime<Utc>>,
}

/// Reads the gateway's event id from the payload.
#[must_use]
pub fn event_id(gateway: Gateway, payload: &Value) -> Option<String> {
    let pointers: &[&str] = match gateway {
        Gateway::Stripe | Gateway::Paypal => &["/id"],
        Gateway::Razorpay | Gateway::Upi => &["/event_id", "/id"],
    };
    first_string(payload, pointers)
}

impl GatewayObject {
    /// Extracts the object an event refers to.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if the object or its id is missing, or an
    /// amount cannot be parsed.
    pub fn extract(
        gateway: Gateway,
        event_type: WebhookEventType,
        payload: &Value,
    ) -> Result<Self, LedgerError> {
        let object = locate(gateway, event_type, payload).ok_or_else(|| {
            LedgerError::InvalidPayload(format!("{gateway} {event_type} payload has no object"))
        })?;

        let id_pointers: &[&str] = match gateway {
            Gateway::Upi => &["/transaction_id", "/id"],
            Gateway::Stripe | Gateway::Paypal | Gateway::Razorpay => &["/id"],
        };
        let id = first_string(object, id_pointers).ok_or_else(|| {
            LedgerError::InvalidPayload(format!("{gateway} {event_type} object has no id"))
        })?;

        let extracted = match gateway {
            Gateway::Stripe => Self {
                id,
                payment_ref: first_string(object, &["/payment_intent", "/charge"]),
                reference: first_string(object, &["/metadata/reference"]),
                amount: minor_units(object.pointer("/amount"))?,
                currency: currency(object, &["/currency"]),
                reason: first_string(object, &["/reason", "/failure_message"]),
                status: first_string(object, &["/status"]),
                evidence_due_by: timestamp(object.pointer("/evidence_details/due_by")),
            },
            Gateway::Razorpay => Self {
                id,
                payment_ref: first_string(object, &["/payment_id"]),
                reference: first_string(object, &["/reference_id", "/notes/reference"]),
                amount: minor_units(object.pointer("/amount"))?,
                currency: currency(object, &["/currency"]),
                reason: first_string(object, &["/reason_code", "/error_description"]),
                status: first_string(object, &["/status"]),
                evidence_due_by: timestamp(object.pointer("/respond_by")),
            },
            Gateway::Paypal => Self {
                id,
                payment_ref: first_string(
                    object,
                    &[
                        "/supplementary_data/related_ids/capture_id",
                        "/disputed_transactions/0/seller_transaction_id",
                    ],
                ),
                reference: first_string(
                    object,
                    &["/payout_item/sender_item_id", "/invoice_id", "/custom_id"],
                ),
                amount: major_units(
                    object
                        .pointer("/amount/value")
                        .or_else(|| object.pointer("/dispute_amount/value")),
                )?,
                currency: currency(
                    object,
                    &["/amount/currency_code", "/dispute_amount/currency_code"],
                ),
                reason: first_string(object, &["/reason"]),
                status: first_string(object, &["/dispute_outcome/outcome_code", "/status"]),
                evidence_due_by: timestamp(object.pointer("/seller_response_due_date")),
            },
            Gateway::Upi => Self {
                id,
                payment_ref: first_string(object, &["/payment_id"]),
                reference: first_string(object, &["/reference"]),
                amount: major_units(object.pointer("/amount"))?,
                currency: currency(object, &["/currency"]),
                reason: first_string(object, &["/reason"]),
                status: first_string(object, &["/status"]),
                evidence_due_by: timestamp(object.pointer("/respond_by")),
            },
        };
        Ok(extracted)
    }

    /// Checks the reported amount and currency against the local record.
    ///
    /// Fields the gateway left out are not compared.
    ///
    /// # Errors
    ///
    /// Returns `ExternalInconsistency` on any mismatch.
    pub fn ensure_matches(&self, amount: Decimal, currency: &str) -> Result<(), LedgerError> {
        if let Some(reported) = self.amount
            && reported != amount
        {
            return Err(LedgerError::ExternalInconsistency(format!(
                "gateway reports {} for {reported} but the ledger holds {amount}",
                self.id
            )));
        }
        if let Some(reported) = self.currency.as_deref()
            && !reported.eq_ignore_ascii_case(currency)
        {
            return Err(LedgerError::ExternalInconsistency(format!(
                "gateway reports {} in {reported} but the ledger holds {currency}",
                self.id
            )));
        }
        Ok(())
    }
}

fn locate<'a>(gateway: Gateway, event_type: WebhookEventType, payload: &'a Value) -> Option<&'a Value> {
    let object = match gateway {
        Gateway::Stripe => payload.pointer("/data/object"),
        Gateway::Razorpay => {
            payload.pointer(&format!("/payload/{}/entity", event_type.object_kind()))
        }
        Gateway::Paypal => payload.pointer("/resource"),
        Gateway::Upi => Some(payload),
    };
    object.filter(|value| value.is_object())
}

fn first_string(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|pointer| match value.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn currency(value: &Value, pointers: &[&str]) -> Option<String> {
    first_string(value, pointers).map(|code| code.trim().to_uppercase())
}

fn minor_units(value: Option<&Value>) -> Result<Option<Decimal>, LedgerError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(|minor| Some(Decimal::new(minor, 2)))
            .ok_or_else(|| LedgerError::InvalidPayload(format!("amount {n} is not in minor units"))),
        Some(other) => Err(LedgerError::InvalidPayload(format!(
            "amount {other} is not in minor units"
        ))),
    }
}

fn major_units(value: Option<&Value>) -> Result<Option<Decimal>, LedgerError> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(LedgerError::InvalidPayload(format!("amount {other} is not a number")));
        }
    };
    Decimal::from_str(text.trim())
        .map(Some)
        .map_err(|_| LedgerError::InvalidPayload(format!("amount '{text}' is not a decimal")))
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_stripe_dispute() {
        let payload = json!({
            "id": "evt_1",
            "type": "charge.dispute.created",
            "data": {"object": {
                "id": "dp_1",
                "payment_intent": "pi_1",
                "amount": 7500,
                "reason": "fraudulent",
                "status": "needs_response",
                "evidence_details": {"due_by": 1_790_000_000}
            }}
        });
        let object =
            GatewayObject::extract(Gateway::Stripe, WebhookEventType::DisputeCreated, &payload)
                .unwrap();

        assert_eq!(object.id, "dp_1");
        assert_eq!(object.payment_ref.as_deref(), Some("pi_1"));
        assert_eq!(object.amount, Some(dec!(75.00)));
        assert_eq!(object.reason.as_deref(), Some("fraudulent"));
        assert_eq!(
            object.evidence_due_by,
            DateTime::from_timestamp(1_790_000_000, 0)
        );
    }

    #[test]
    fn test_razorpay_refund_picks_refund_entity() {
        let payload = json!({
            "event_id": "rzp_evt_1",
            "payload": {
                "payment": {"entity": {"id": "pay_1", "amount": 50000}},
                "refund": {"entity": {"id": "rfnd_1", "payment_id": "pay_1", "amount": 12050}}
            }
        });
        let object =
            GatewayObject::extract(Gateway::Razorpay, WebhookEventType::RefundSucceeded, &payload)
                .unwrap();

        assert_eq!(object.id, "rfnd_1");
        assert_eq!(object.payment_ref.as_deref(), Some("pay_1"));
        assert_eq!(object.amount, Some(dec!(120.50)));
    }

    #[test]
    fn test_paypal_decimal_amount_and_outcome() {
        let payload = json!({
            "id": "WH-1",
            "resource": {
                "id": "PP-D-1",
                "dispute_amount": {"currency_code": "USD", "value": "19.99"},
                "disputed_transactions": [{"seller_transaction_id": "CAP-1"}],
                "status": "RESOLVED",
                "dispute_outcome": {"outcome_code": "RESOLVED_BUYER_FAVOUR"},
                "seller_response_due_date": "2026-11-01T10:00:00Z"
            }
        });
        let object =
            GatewayObject::extract(Gateway::Paypal, WebhookEventType::DisputeUpdated, &payload)
                .unwrap();

        assert_eq!(object.id, "PP-D-1");
        assert_eq!(object.payment_ref.as_deref(), Some("CAP-1"));
        assert_eq!(object.amount, Some(dec!(19.99)));
        assert_eq!(object.currency.as_deref(), Some("USD"));
        assert_eq!(object.status.as_deref(), Some("RESOLVED_BUYER_FAVOUR"));
        assert!(object.evidence_due_by.is_some());
    }

    #[test]
    fn test_upi_root_object() {
        let payload = json!({
            "event_id": "upi_evt_1",
            "transaction_id": "upi_tx_1",
            "amount": "500.00",
            "status": "SUCCESS"
        });
        let object =
            GatewayObject::extract(Gateway::Upi, WebhookEventType::PaymentSucceeded, &payload)
                .unwrap();
        assert_eq!(object.id, "upi_tx_1");
        assert_eq!(object.amount, Some(dec!(500.00)));
        assert_eq!(event_id(Gateway::Upi, &payload).as_deref(), Some("upi_evt_1"));
    }

    #[test]
    fn test_reported_amount_and_currency_must_match() {
        let payload = json!({"data": {"object": {
            "id": "pi_1",
            "amount": 50000,
            "currency": "inr"
        }}});
        let object =
            GatewayObject::extract(Gateway::Stripe, WebhookEventType::PaymentSucceeded, &payload)
                .unwrap();
        assert_eq!(object.currency.as_deref(), Some("INR"));

        assert!(object.ensure_matches(dec!(500), "INR").is_ok());
        assert!(matches!(
            object.ensure_matches(dec!(450.00), "INR"),
            Err(LedgerError::ExternalInconsistency(_))
        ));
        assert!(matches!(
            object.ensure_matches(dec!(500.00), "USD"),
            Err(LedgerError::ExternalInconsistency(_))
        ));
    }

    #[test]
    fn test_unreported_fields_are_not_compared() {
        let payload = json!({"transaction_id": "upi_tx_1", "status": "SUCCESS"});
        let object =
            GatewayObject::extract(Gateway::Upi, WebhookEventType::PaymentSucceeded, &payload)
                .unwrap();
        assert!(object.ensure_matches(dec!(123.45), "INR").is_ok());
    }

    #[test]
    fn test_missing_object_is_invalid() {
        let payload = json!({"id": "evt_1", "data": {}});
        assert!(matches!(
            GatewayObject::extract(Gateway::Stripe, WebhookEventType::PaymentSucceeded, &payload),
            Err(LedgerError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_fractional_minor_units_rejected() {
        let payload = json!({"data": {"object": {"id": "pi_1", "amount": 10.5}}});
        assert!(matches!(
            GatewayObject::extract(Gateway::Stripe, WebhookEventType::PaymentSucceeded, &payload),
            Err(LedgerError::InvalidPayload(_))
        ));
    }
}
