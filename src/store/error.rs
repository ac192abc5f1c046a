//! Store Errors
//!
//! Error types for account store and transfer ledger operations.

use std::time::Duration;
use uuid::Uuid;

use crate::domain::LedgerError;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur in the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key (account id or email) is already taken
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Optimistic concurrency conflict
    #[error("Version conflict for account {account_id}: expected version {expected}, found {found}")]
    VersionConflict {
        account_id: Uuid,
        expected: i64,
        found: i64,
    },

    /// Account vanished between read and write
    #[error("Account not found: {0}")]
    AccountMissing(Uuid),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    /// Store unreachable (pool exhausted, connection dropped, lock poisoned)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Stored row violates a domain rule; retrying cannot help
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Check if this error is a concurrency conflict
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::VersionConflict { .. } | StoreError::Timeout(_) | StoreError::Unavailable(_)
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                let key = db_err.constraint().unwrap_or("unique key").to_string();
                StoreError::DuplicateKey(key)
            }
            sqlx::Error::PoolTimedOut => StoreError::Unavailable("connection pool timed out".into()),
            sqlx::Error::PoolClosed => StoreError::Unavailable("connection pool closed".into()),
            sqlx::Error::Io(ref e) => StoreError::Unavailable(e.to_string()),
            other => StoreError::Database(other),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(_) => {
                LedgerError::invalid_argument("email already registered")
            }
            StoreError::VersionConflict { .. } => LedgerError::Conflict,
            StoreError::Timeout(_) | StoreError::Unavailable(_) => {
                LedgerError::Transient(err.to_string())
            }
            StoreError::AccountMissing(id) => LedgerError::NotFound(id.to_string()),
            StoreError::Corrupt(_) => LedgerError::Internal(err.to_string()),
            StoreError::Database(e) => LedgerError::Internal(e.to_string()),
        }
    }
}
