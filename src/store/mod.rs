//! Store module
//!
//! Persistence ports for accounts and the transfer ledger, plus the
//! in-memory and PostgreSQL adapters.
//!
//! The only way to append to the ledger is [`LedgerStore::commit_transfer`],
//! which applies both balance updates and the transfer record as one unit.

mod error;
mod memory;
mod postgres;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Account, Transfer};

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Insert a new account. Fails with `DuplicateKey` if the id or email is taken.
    async fn insert(&self, account: &Account) -> Result<Account, StoreError>;

    /// Persist a modified account.
    ///
    /// `account.version` is the version the caller read; the write succeeds
    /// only if it is still current and returns the stored account with the
    /// bumped version. Each call commits or fails as a whole.
    async fn save(&self, account: &Account) -> Result<Account, StoreError>;
}

/// Read side of the append-only transfer log. All lists are newest first.
#[async_trait]
pub trait TransferLedger: Send + Sync {
    async fn find_transfer(&self, id: Uuid) -> Result<Option<Transfer>, StoreError>;

    async fn outgoing(&self, sender_id: Uuid) -> Result<Vec<Transfer>, StoreError>;

    async fn incoming(&self, receiver_id: Uuid) -> Result<Vec<Transfer>, StoreError>;

    async fn all_transfers(&self) -> Result<Vec<Transfer>, StoreError>;
}

/// The four writes of one transfer.
///
/// `sender` and `receiver` carry their new balances and the versions they
/// were read at.
#[derive(Debug, Clone)]
pub struct TransferCommit {
    pub sender: Account,
    pub receiver: Account,
    pub transfer: Transfer,
}

#[async_trait]
pub trait LedgerStore: AccountStore + TransferLedger {
    /// Apply debit, credit and ledger append atomically.
    ///
    /// Either both accounts are written (each guarded by its expected
    /// version) and the transfer is appended, or nothing changes. Committing
    /// a transfer id that is already in the ledger is a no-op success.
    async fn commit_transfer(&self, commit: &TransferCommit) -> Result<(), StoreError>;
}

/// Run a store call with an upper bound on its duration.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
