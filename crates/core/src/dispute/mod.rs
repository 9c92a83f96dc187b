//! Chargeback tracking against settled payments.

pub mod service;
pub mod types;

pub use service::{DisputeService, Resolution};
pub use types::{DisputeOutcome, DisputeStatus};
