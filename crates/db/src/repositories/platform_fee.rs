//! Platform fee repository. Append-only like the ledger.

use chrono::Utc;
use mentorledger_core::fee::FeeBreakdown;
use mentorledger_core::ledger::parse_currency;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::{platform_fees, sea_orm_active_enums::FeeReferenceKind};
use crate::error::StoreError;

/// Platform fee repository.
#[derive(Debug, Clone)]
pub struct PlatformFeeRepository {
    db: DatabaseConnection,
}

impl PlatformFeeRepository {
    /// Creates a new platform fee repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a collected fee on the caller's connection or transaction.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCurrency` or a database error.
    pub async fn record_in<C>(
        conn: &C,
        reference_id: Uuid,
        reference_kind: FeeReferenceKind,
        breakdown: &FeeBreakdown,
        currency: &str,
    ) -> Result<platform_fees::Model, StoreError>
    where
        C: ConnectionTrait,
    {
        let currency = parse_currency(currency)?;
        let fee = platform_fees::ActiveModel {
            id: Set(Uuid::new_v4()),
            reference_id: Set(reference_id),
            reference_kind: Set(reference_kind),
            base_amount: Set(breakdown.gross),
            fee_percentage: Set(breakdown.percentage),
            fee_amount: Set(breakdown.fee),
            currency: Set(currency.code().to_string()),
            collected_at: Set(Utc::now().into()),
        };
        Ok(fee.insert(conn).await?)
    }

    /// Fees collected on one payment, payout or escrow.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_reference(
        &self,
        reference_id: Uuid,
    ) -> Result<Vec<platform_fees::Model>, StoreError> {
        let fees = platform_fees::Entity::find()
            .filter(platform_fees::Column::ReferenceId.eq(reference_id))
            .order_by_asc(platform_fees::Column::CollectedAt)
            .all(&self.db)
            .await?;
        Ok(fees)
    }

    /// Total fees collected in one currency.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCurrency` or a database error.
    pub async fn total_collected(&self, currency: &str) -> Result<Decimal, StoreError> {
        let currency = parse_currency(currency)?;
        let total: Option<Option<Decimal>> = platform_fees::Entity::find()
            .select_only()
            .column_as(platform_fees::Column::FeeAmount.sum(), "total")
            .filter(platform_fees::Column::Currency.eq(currency.code()))
            .into_tuple()
            .one(&self.db)
            .await?;
        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }
}
