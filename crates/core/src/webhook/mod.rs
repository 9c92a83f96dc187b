//! Inbound gateway events.
//!
//! # Modules
//!
//! - `types` - Event kinds, inbound envelope and delivery outcomes
//! - `payload` - Per-gateway object extraction
//! - `retry` - Backoff schedule for failed deliveries

pub mod payload;
pub mod retry;
pub mod types;

pub use payload::GatewayObject;
pub use retry::RetryPolicy;
pub use types::{AdmitOutcome, DeliveryOutcome, InboundEvent, WebhookEventType};
