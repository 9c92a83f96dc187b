//! Storage-layer errors.
//!
//! Business failures stay [`LedgerError`]s; driver failures are classified so
//! lock timeouts, serialization failures and deadlocks surface as the
//! retryable `PersistenceConflict`.

use mentorledger_core::LedgerError;
use sea_orm::{DbErr, RuntimeErr, SqlErr};

/// SQLSTATE codes that mean "try again".
const CONFLICT_SQLSTATES: [&str; 3] = [
    "55P03", // lock_not_available (lock_timeout)
    "40001", // serialization_failure
    "40P01", // deadlock_detected
];

/// SQLSTATE raised when `statement_timeout` fires.
const QUERY_CANCELED: &str = "57014";

/// Errors returned by repositories.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A ledger rule rejected the operation, or storage reported a conflict.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Unexpected database failure.
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match sqlstate(&err).as_deref() {
            Some(code) if CONFLICT_SQLSTATES.contains(&code) || code == QUERY_CANCELED => {
                Self::Ledger(LedgerError::PersistenceConflict(err.to_string()))
            }
            _ => Self::Database(err),
        }
    }
}

impl StoreError {
    /// Returns a stable error code for logs and callers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if the operation may succeed when retried unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Ledger(e) if e.is_retryable())
    }

    /// Returns true if the error needs operator attention.
    #[must_use]
    pub fn requires_alert(&self) -> bool {
        match self {
            Self::Ledger(e) => e.requires_alert(),
            Self::Database(_) => true,
        }
    }

    /// The business error, if this is one.
    #[must_use]
    pub const fn ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(e) => Some(e),
            Self::Database(_) => None,
        }
    }
}

/// Returns true if the error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Query(e) | DbErr::Exec(e) | DbErr::Conn(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db)) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}
