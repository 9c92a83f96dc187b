//! Wallet repository.
//!
//! Every balance change runs read-compute-write under `SELECT ... FOR UPDATE`
//! on the wallet row, inside one storage transaction that also appends the
//! wallet ledger row. Concurrent mutations of the same wallet serialize on
//! that lock; there is no in-process mutex.

use chrono::Utc;
use mentorledger_core::LedgerError;
use mentorledger_core::ledger::{
    TransactionStatus as CoreTransactionStatus, TransactionType as CoreTransactionType,
    parse_currency,
};
use mentorledger_core::wallet::{self as wallet_rules, BalanceChange, EntryKind, WalletReference};
use mentorledger_shared::types::{Currency, PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::ledger::{LedgerRepository, RecordInput};
use crate::entities::{
    sea_orm_active_enums::{WalletEntryKind, WalletReferenceType},
    wallet_transactions, wallets,
};
use crate::error::StoreError;
use crate::{Timeouts, begin_bounded};

/// One credit or debit to apply to a wallet.
#[derive(Debug, Clone)]
pub struct WalletMutation {
    /// Target wallet.
    pub wallet_id: Uuid,
    /// Credit or debit.
    pub kind: EntryKind,
    /// Positive magnitude.
    pub amount: Decimal,
    /// Description stored on the wallet ledger row.
    pub description: String,
    /// Record that caused the mutation.
    pub reference: Option<WalletReference>,
}

impl WalletMutation {
    /// A credit of `amount`.
    pub fn credit(wallet_id: Uuid, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            wallet_id,
            kind: EntryKind::Credit,
            amount,
            description: description.into(),
            reference: None,
        }
    }

    /// A debit of `amount`.
    pub fn debit(wallet_id: Uuid, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Debit,
            ..Self::credit(wallet_id, amount, description)
        }
    }

    /// Links the mutation to the record that caused it.
    #[must_use]
    pub const fn with_reference(mut self, reference: WalletReference) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// Result of an applied mutation.
#[derive(Debug, Clone)]
pub struct AppliedMutation {
    /// The wallet after the mutation.
    pub wallet: wallets::Model,
    /// The appended wallet ledger row.
    pub transaction: wallet_transactions::Model,
    /// Balance after the mutation.
    pub new_balance: Decimal,
}

/// Wallet repository.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    db: DatabaseConnection,
    timeouts: Timeouts,
    supported_currencies: Vec<Currency>,
}

impl WalletRepository {
    /// Creates a new wallet repository accepting every known currency.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            timeouts: Timeouts::default(),
            supported_currencies: Currency::ALL.to_vec(),
        }
    }

    /// Overrides the lock and statement timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Restricts the currencies wallets may be opened in.
    #[must_use]
    pub fn with_supported_currencies(mut self, currencies: Vec<Currency>) -> Self {
        self.supported_currencies = currencies;
        self
    }

    /// Returns the user's wallet in `currency`, creating it if needed.
    ///
    /// Safe under concurrency: exactly one wallet exists per (user, currency).
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCurrency` for unknown or disabled currencies.
    pub async fn ensure_wallet(
        &self,
        user_id: Uuid,
        currency: &str,
    ) -> Result<wallets::Model, StoreError> {
        let currency = parse_currency(currency)?;
        if !self.supported_currencies.contains(&currency) {
            return Err(LedgerError::UnsupportedCurrency(currency.code().to_string()).into());
        }
        Self::ensure_in(&self.db, user_id, currency).await
    }

    /// [`WalletRepository::ensure_wallet`] on the caller's connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn ensure_in<C>(
        conn: &C,
        user_id: Uuid,
        currency: Currency,
    ) -> Result<wallets::Model, StoreError>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now().into();
        let wallet = wallets::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            currency: Set(currency.code().to_string()),
            balance: Set(Decimal::ZERO),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = wallets::Entity::insert(wallet)
            .on_conflict(
                OnConflict::columns([wallets::Column::UserId, wallets::Column::Currency])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        if inserted == 1 {
            debug!(user_id = %user_id, currency = %currency, "Wallet created");
        }

        wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .filter(wallets::Column::Currency.eq(currency.code()))
            .one(conn)
            .await?
            .ok_or_else(|| {
                LedgerError::Storage(format!("wallet for {user_id}/{currency} vanished after upsert"))
                    .into()
            })
    }

    /// Applies a credit or debit and records it in the ledger.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound` / `WalletInactive`
    /// - `InvalidAmount` for a non-positive or over-precise amount
    /// - `InsufficientBalance` if a debit would overdraw; nothing is written
    /// - `PersistenceConflict` if the wallet lock cannot be acquired in time
    pub async fn apply(&self, mutation: WalletMutation) -> Result<AppliedMutation, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;

        let applied = match Self::apply_in_txn(&txn, &mutation).await {
            Ok(applied) => applied,
            Err(e) => {
                debug!(wallet_id = %mutation.wallet_id, error = %e, "Wallet mutation rejected");
                return Err(e);
            }
        };

        let (transaction_type, reference_type) = match mutation.kind {
            EntryKind::Credit => (CoreTransactionType::WalletCredit, "wallet_credit"),
            EntryKind::Debit => (CoreTransactionType::WalletDebit, "wallet_debit"),
        };
        LedgerRepository::record_in(
            &txn,
            RecordInput::new(
                applied.wallet.user_id,
                transaction_type,
                CoreTransactionStatus::Completed,
                mutation.amount,
                applied.wallet.currency.clone(),
                mutation.description.clone(),
            )
            .reference(applied.transaction.id, reference_type),
        )
        .await?;

        txn.commit().await?;

        info!(
            wallet_id = %mutation.wallet_id,
            kind = %mutation.kind,
            amount = %mutation.amount,
            new_balance = %applied.new_balance,
            "Wallet mutation applied"
        );
        Ok(applied)
    }

    /// Applies a mutation inside the caller's transaction.
    ///
    /// Locks the wallet row until the caller commits or rolls back. Does not
    /// write a ledger record; composite operations record their own.
    ///
    /// # Errors
    ///
    /// See [`WalletRepository::apply`].
    pub async fn apply_in_txn(
        txn: &DatabaseTransaction,
        mutation: &WalletMutation,
    ) -> Result<AppliedMutation, StoreError> {
        let wallet = wallets::Entity::find_by_id(mutation.wallet_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(LedgerError::WalletNotFound(mutation.wallet_id))?;

        if !wallet.is_active {
            return Err(LedgerError::WalletInactive(wallet.id).into());
        }

        let change = BalanceChange::compute(wallet.id, wallet.balance, mutation.kind, mutation.amount)?;
        let now = Utc::now().into();

        let row = wallet_transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            wallet_id: Set(wallet.id),
            amount: Set(change.signed_amount),
            kind: Set(WalletEntryKind::from(mutation.kind)),
            description: Set(mutation.description.clone()),
            reference_id: Set(mutation.reference.map(|r| r.id)),
            reference_type: Set(mutation.reference.map(|r| WalletReferenceType::from(r.kind))),
            balance_after: Set(change.new_balance),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;

        let mut active: wallets::ActiveModel = wallet.into();
        active.balance = Set(change.new_balance);
        active.updated_at = Set(now);
        let wallet = active.update(txn).await?;

        Ok(AppliedMutation {
            wallet,
            transaction: row,
            new_balance: change.new_balance,
        })
    }

    /// Locks several wallets in ascending id order.
    ///
    /// Operations that move money between two wallets take both locks up
    /// front through this, so opposing transfers cannot deadlock.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` or a database error.
    pub async fn lock_in_order(
        txn: &DatabaseTransaction,
        wallet_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        let mut ordered = wallet_ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();
        for wallet_id in ordered {
            wallets::Entity::find_by_id(wallet_id)
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(LedgerError::WalletNotFound(wallet_id))?;
        }
        Ok(())
    }

    /// Finds a wallet by id.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if it does not exist.
    pub async fn get(&self, wallet_id: Uuid) -> Result<wallets::Model, StoreError> {
        wallets::Entity::find_by_id(wallet_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(wallet_id).into())
    }

    /// Reads the current balance without locking.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound`, or `PersistenceConflict` if the read exceeds
    /// the statement timeout.
    pub async fn get_balance(&self, wallet_id: Uuid) -> Result<Decimal, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let balance: Option<Decimal> = wallets::Entity::find_by_id(wallet_id)
            .select_only()
            .column(wallets::Column::Balance)
            .into_tuple()
            .one(&txn)
            .await?;
        txn.commit().await?;
        balance.ok_or_else(|| LedgerError::WalletNotFound(wallet_id).into())
    }

    /// Sums the wallet's ledger rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn replay_balance(&self, wallet_id: Uuid) -> Result<Decimal, StoreError> {
        let amounts: Vec<Decimal> = wallet_transactions::Entity::find()
            .select_only()
            .column(wallet_transactions::Column::Amount)
            .filter(wallet_transactions::Column::WalletId.eq(wallet_id))
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(wallet_rules::replay(amounts))
    }

    /// Checks that the stored balance equals the replayed ledger.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` or a database error.
    pub async fn verify_conservation(&self, wallet_id: Uuid) -> Result<bool, StoreError> {
        let wallet = self.get(wallet_id).await?;
        let replayed = self.replay_balance(wallet_id).await?;
        let conserved = replayed == wallet.balance;
        if !conserved {
            error!(
                wallet_id = %wallet_id,
                stored = %wallet.balance,
                replayed = %replayed,
                "Wallet balance does not match its ledger"
            );
        }
        Ok(conserved)
    }

    /// Lists the wallet's ledger rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history(
        &self,
        wallet_id: Uuid,
        page: &PageRequest,
    ) -> Result<PageResponse<wallet_transactions::Model>, StoreError> {
        let query = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet_id));
        let total = query.clone().count(&self.db).await?;

        let data = query
            .order_by_desc(wallet_transactions::Column::CreatedAt)
            .order_by_desc(wallet_transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Freezes or unfreezes a wallet.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` or a database error.
    pub async fn set_active(
        &self,
        wallet_id: Uuid,
        is_active: bool,
    ) -> Result<wallets::Model, StoreError> {
        let txn = begin_bounded(&self.db, self.timeouts).await?;
        let wallet = wallets::Entity::find_by_id(wallet_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(LedgerError::WalletNotFound(wallet_id))?;

        let mut active: wallets::ActiveModel = wallet.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(wallet_id = %wallet_id, is_active, "Wallet activity changed");
        Ok(updated)
    }
}
