//! `SeaORM` entity definitions.

pub mod disputes;
pub mod escrow_accounts;
pub mod payments;
pub mod payouts;
pub mod platform_fees;
pub mod refunds;
pub mod sea_orm_active_enums;
pub mod transactions;
pub mod wallet_transactions;
pub mod wallets;
pub mod webhook_events;
