//! Domain Error Types
//!
//! Pure ledger errors that don't depend on infrastructure.

use thiserror::Error;

/// Every failure the ledger core can report to its callers.
///
/// Validation failures are deterministic and never retried. `Conflict` and
/// `Transient` are retried internally a bounded number of times before they
/// surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No authenticated principal on the request
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated but lacking administrator privilege
    #[error("Administrator privilege required")]
    Forbidden,

    /// Missing or malformed input field
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Sender account is missing or deactivated
    #[error("Sender account is not active")]
    SenderInactive,

    /// No account matches the receiver email
    #[error("Receiver account not found")]
    ReceiverNotFound,

    /// Sender and receiver are the same account
    #[error("Cannot transfer to the same account")]
    SelfTransfer,

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// Admin target lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency retries exhausted
    #[error("Concurrent modification, retries exhausted")]
    Conflict,

    /// Store unreachable or timed out; safe for the caller to retry
    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn insufficient_funds(required: i64, available: i64) -> Self {
        Self::InsufficientFunds { required, available }
    }

    /// Check if retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict | Self::Transient(_))
    }
}
