//! Repository abstractions for data access.
//!
//! Repositories carry out the plans produced by `mentorledger-core` inside
//! database transactions, hiding the `SeaORM` implementation details from
//! the rest of the application. Operations that other repositories compose
//! come in an `_in` / `_in_txn` form that runs on the caller's transaction.

pub mod dispute;
pub mod escrow;
pub mod ledger;
pub mod payment;
pub mod platform_fee;
pub mod wallet;
pub mod webhook;

pub use dispute::{DisputeRepository, OpenDisputeInput, ResolveOutcome};
pub use escrow::{EscrowRelease, EscrowRepository, ExpiredEscrows, OpenEscrowInput};
pub use ledger::{LedgerFilter, LedgerRepository, RecordInput};
pub use payment::{CreatePaymentInput, CreatePayoutInput, PaymentRepository};
pub use platform_fee::PlatformFeeRepository;
pub use wallet::{AppliedMutation, WalletMutation, WalletRepository};
pub use webhook::{WebhookGate, WebhookHandler};
