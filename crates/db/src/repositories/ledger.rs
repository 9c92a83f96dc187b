//! Ledger repository: the append-only record of every money movement.
//!
//! Rows are only ever inserted. There is no update or delete here, and the
//! `prevent_ledger_mutation` trigger rejects both at the database.

use chrono::{DateTime, Utc};
use mentorledger_core::ledger::{
    LedgerSummary, TransactionStatus as CoreTransactionStatus,
    TransactionType as CoreTransactionType, parse_currency, validate_non_negative,
};
use mentorledger_core::payment::Gateway;
use mentorledger_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use serde_json::Value;
use uuid::Uuid;

use crate::entities::{
    sea_orm_active_enums::{PaymentGateway, TransactionStatus, TransactionType},
    transactions,
};
use crate::error::StoreError;

/// Input for appending one ledger record.
#[derive(Debug, Clone)]
pub struct RecordInput {
    /// User the record belongs to.
    pub user_id: Uuid,
    /// Non-negative magnitude; direction comes from the type.
    pub amount: Decimal,
    /// ISO 4217 code.
    pub currency: String,
    /// Record type.
    pub transaction_type: CoreTransactionType,
    /// Record status.
    pub status: CoreTransactionStatus,
    /// Human-readable description.
    pub description: String,
    /// Id of the payment, escrow, refund, payout or dispute behind the record.
    pub reference_id: Option<Uuid>,
    /// Kind of `reference_id`.
    pub reference_type: Option<&'static str>,
    /// Gateway that moved the money, if any.
    pub gateway: Option<Gateway>,
    /// Gateway-side id of the movement.
    pub gateway_transaction_id: Option<String>,
    /// Free-form details (fee split, reasons).
    pub metadata: Option<Value>,
}

impl RecordInput {
    /// Starts a record with the required fields.
    pub fn new(
        user_id: Uuid,
        transaction_type: CoreTransactionType,
        status: CoreTransactionStatus,
        amount: Decimal,
        currency: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            amount,
            currency: currency.into(),
            transaction_type,
            status,
            description: description.into(),
            reference_id: None,
            reference_type: None,
            gateway: None,
            gateway_transaction_id: None,
            metadata: None,
        }
    }

    /// Links the record to the object that caused it.
    #[must_use]
    pub fn reference(mut self, id: Uuid, kind: &'static str) -> Self {
        self.reference_id = Some(id);
        self.reference_type = Some(kind);
        self
    }

    /// Attaches gateway details.
    #[must_use]
    pub fn gateway(mut self, gateway: Gateway, transaction_id: Option<String>) -> Self {
        self.gateway = Some(gateway);
        self.gateway_transaction_id = transaction_id;
        self
    }

    /// Attaches metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Filter options for ledger queries.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    /// Created at or after.
    pub from: Option<DateTime<Utc>>,
    /// Created before.
    pub to: Option<DateTime<Utc>>,
    /// Filter by record type.
    pub transaction_type: Option<CoreTransactionType>,
    /// Filter by status.
    pub status: Option<CoreTransactionStatus>,
    /// Filter by currency code.
    pub currency: Option<String>,
    /// Filter by referenced object.
    pub reference_id: Option<Uuid>,
}

/// Ledger repository.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends a record on its own.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a negative amount, `UnsupportedCurrency`
    /// for an unknown code, or a database error.
    pub async fn record(&self, input: RecordInput) -> Result<transactions::Model, StoreError> {
        Self::record_in(&self.db, input).await
    }

    /// Appends a record on the caller's connection or transaction.
    ///
    /// # Errors
    ///
    /// See [`LedgerRepository::record`].
    pub async fn record_in<C>(conn: &C, input: RecordInput) -> Result<transactions::Model, StoreError>
    where
        C: ConnectionTrait,
    {
        validate_non_negative(input.amount)?;
        let currency = parse_currency(&input.currency)?;

        let record = transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(input.user_id),
            amount: Set(input.amount),
            currency: Set(currency.code().to_string()),
            transaction_type: Set(input.transaction_type.into()),
            status: Set(input.status.into()),
            description: Set(input.description),
            reference_id: Set(input.reference_id),
            reference_type: Set(input.reference_type.map(str::to_string)),
            gateway: Set(input.gateway.map(PaymentGateway::from)),
            gateway_transaction_id: Set(input.gateway_transaction_id),
            metadata: Set(input.metadata),
            created_at: Set(Utc::now().into()),
        };

        Ok(record.insert(conn).await?)
    }

    /// Lists a user's records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn query(
        &self,
        user_id: Uuid,
        filter: &LedgerFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<transactions::Model>, StoreError> {
        let query = Self::filtered(user_id, filter);
        let total = query.clone().count(&self.db).await?;

        let data = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Totals a user's completed records in one currency over a period.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn summary(
        &self,
        user_id: Uuid,
        currency: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerSummary, StoreError> {
        let filter = LedgerFilter {
            from,
            to,
            currency: Some(parse_currency(currency)?.code().to_string()),
            ..LedgerFilter::default()
        };

        let rows: Vec<(TransactionType, TransactionStatus, Decimal)> =
            Self::filtered(user_id, &filter)
                .select_only()
                .column(transactions::Column::TransactionType)
                .column(transactions::Column::Status)
                .column(transactions::Column::Amount)
                .into_tuple()
                .all(&self.db)
                .await?;

        Ok(LedgerSummary::from_records(rows.into_iter().map(
            |(transaction_type, status, amount)| (transaction_type.into(), status.into(), amount),
        )))
    }

    /// All records that reference an object, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn for_reference(
        &self,
        reference_id: Uuid,
    ) -> Result<Vec<transactions::Model>, StoreError> {
        let records = transactions::Entity::find()
            .filter(transactions::Column::ReferenceId.eq(reference_id))
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.db)
            .await?;
        Ok(records)
    }

    fn filtered(user_id: Uuid, filter: &LedgerFilter) -> Select<transactions::Entity> {
        let mut query =
            transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id));

        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::CreatedAt.lt(to));
        }
        if let Some(transaction_type) = filter.transaction_type {
            query = query
                .filter(transactions::Column::TransactionType.eq(TransactionType::from(transaction_type)));
        }
        if let Some(status) = filter.status {
            query = query.filter(transactions::Column::Status.eq(TransactionStatus::from(status)));
        }
        if let Some(currency) = &filter.currency {
            query = query.filter(transactions::Column::Currency.eq(currency.to_uppercase()));
        }
        if let Some(reference_id) = filter.reference_id {
            query = query.filter(transactions::Column::ReferenceId.eq(reference_id));
        }

        query
    }
}
