//! Payment, refund and payout lifecycles.

pub mod service;
pub mod types;

pub use service::PaymentService;
pub use types::{Gateway, PaymentPurpose, PaymentStatus, PayoutStatus, RefundStatus, Transition};
