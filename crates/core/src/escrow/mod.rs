//! Escrow holds for mentorship sessions.
//!
//! # Modules
//!
//! - `types` - Escrow status, release modes and plans
//! - `service` - State transitions and release planning

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::EscrowService;
pub use types::{
    DisputeDecision, DisputeResolution, EscrowStatus, RefundPlan, ReleaseMode, ReleasePlan,
    RemainderDisposition,
};
