//! In-memory store
//!
//! Accounts, the email index and the transfer log live behind a single
//! lock so `commit_transfer` is trivially atomic. Intended for tests and
//! local development.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Account, Transfer};

use super::{AccountStore, LedgerStore, StoreError, TransferCommit, TransferLedger};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    emails: HashMap<String, Uuid>,
    /// Append order is chronological
    transfers: Vec<Transfer>,
}

impl State {
    fn check_version(&self, expected: &Account) -> Result<(), StoreError> {
        let current = self
            .accounts
            .get(&expected.id)
            .ok_or(StoreError::AccountMissing(expected.id))?;

        if current.version != expected.version {
            return Err(StoreError::VersionConflict {
                account_id: expected.id,
                expected: expected.version,
                found: current.version,
            });
        }
        Ok(())
    }

    fn write(&mut self, account: &Account) -> Account {
        let stored = Account {
            version: account.version + 1,
            updated_at: Utc::now(),
            ..account.clone()
        };
        self.accounts.insert(stored.id, stored.clone());
        stored
    }

    fn newest_first<P>(&self, predicate: P) -> Vec<Transfer>
    where
        P: Fn(&Transfer) -> bool,
    {
        self.transfers
            .iter()
            .rev()
            .filter(|t| predicate(t))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove an account record, as an external cleanup process would.
    /// Transfers referencing it are kept.
    pub fn remove_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let mut state = self.write_state()?;
        let removed = state.accounts.remove(&id);
        if let Some(account) = &removed {
            state.emails.remove(&account.email);
        }
        Ok(removed)
    }

    /// Sum of every balance, for conservation checks.
    pub fn total_balance(&self) -> Result<i64, StoreError> {
        let state = self.read_state()?;
        Ok(state.accounts.values().map(|a| a.balance.value()).sum())
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.read_state()?.accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let state = self.read_state()?;
        Ok(state
            .emails
            .get(email)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn insert(&self, account: &Account) -> Result<Account, StoreError> {
        let mut state = self.write_state()?;
        if state.accounts.contains_key(&account.id) {
            return Err(StoreError::DuplicateKey("accounts_pkey".to_string()));
        }
        if state.emails.contains_key(&account.email) {
            return Err(StoreError::DuplicateKey("accounts_email_key".to_string()));
        }
        state.emails.insert(account.email.clone(), account.id);
        state.accounts.insert(account.id, account.clone());
        Ok(account.clone())
    }

    async fn save(&self, account: &Account) -> Result<Account, StoreError> {
        let mut state = self.write_state()?;
        state.check_version(account)?;

        let previous_email = state.accounts[&account.id].email.clone();
        if previous_email != account.email {
            if state.emails.contains_key(&account.email) {
                return Err(StoreError::DuplicateKey("accounts_email_key".to_string()));
            }
            state.emails.remove(&previous_email);
            state.emails.insert(account.email.clone(), account.id);
        }

        Ok(state.write(account))
    }
}

#[async_trait]
impl TransferLedger for InMemoryStore {
    async fn find_transfer(&self, id: Uuid) -> Result<Option<Transfer>, StoreError> {
        let state = self.read_state()?;
        Ok(state.transfers.iter().find(|t| t.id == id).cloned())
    }

    async fn outgoing(&self, sender_id: Uuid) -> Result<Vec<Transfer>, StoreError> {
        Ok(self.read_state()?.newest_first(|t| t.sender_id == sender_id))
    }

    async fn incoming(&self, receiver_id: Uuid) -> Result<Vec<Transfer>, StoreError> {
        Ok(self.read_state()?.newest_first(|t| t.receiver_id == receiver_id))
    }

    async fn all_transfers(&self) -> Result<Vec<Transfer>, StoreError> {
        Ok(self.read_state()?.newest_first(|_| true))
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn commit_transfer(&self, commit: &TransferCommit) -> Result<(), StoreError> {
        let mut state = self.write_state()?;

        if state.transfers.iter().any(|t| t.id == commit.transfer.id) {
            return Ok(());
        }

        // Validate everything before the first mutation
        state.check_version(&commit.sender)?;
        state.check_version(&commit.receiver)?;

        state.write(&commit.sender);
        state.write(&commit.receiver);
        state.transfers.push(commit.transfer.clone());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Balance};

    fn open(email: &str, balance: i64) -> Account {
        Account::open(email, email, Balance::new(balance).unwrap())
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        let store = InMemoryStore::new();
        store.insert(&open("a@example.com", 10)).await.unwrap();

        let result = store.insert(&open("a@example.com", 10)).await;
        assert!(matches!(result, Err(StoreError::DuplicateKey(_))));
    }

    #[tokio::test]
    async fn test_save_detects_stale_version() {
        let store = InMemoryStore::new();
        let account = store.insert(&open("a@example.com", 10)).await.unwrap();

        let saved = store.save(&account.with_active(false)).await.unwrap();
        assert_eq!(saved.version, account.version + 1);

        let stale = store.save(&account.with_active(true)).await;
        assert!(matches!(stale, Err(StoreError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let a = store.insert(&open("a@example.com", 100)).await.unwrap();
        let b = store.insert(&open("b@example.com", 100)).await.unwrap();
        let amount = Amount::new(40).unwrap();

        // Receiver changes underneath the commit
        store.save(&b.with_active(true)).await.unwrap();

        let commit = TransferCommit {
            sender: a.debited(&amount).unwrap(),
            receiver: b.credited(&amount).unwrap(),
            transfer: Transfer::new(Uuid::new_v4(), a.id, b.id, amount),
        };
        let result = store.commit_transfer(&commit).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));

        let a_after = store.find_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(a_after.balance.value(), 100);
        assert_eq!(a_after.version, a.version);
        assert!(store.all_transfers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_same_transfer_twice_is_noop() {
        let store = InMemoryStore::new();
        let a = store.insert(&open("a@example.com", 100)).await.unwrap();
        let b = store.insert(&open("b@example.com", 100)).await.unwrap();
        let amount = Amount::new(40).unwrap();

        let commit = TransferCommit {
            sender: a.debited(&amount).unwrap(),
            receiver: b.credited(&amount).unwrap(),
            transfer: Transfer::new(Uuid::new_v4(), a.id, b.id, amount),
        };
        store.commit_transfer(&commit).await.unwrap();
        store.commit_transfer(&commit).await.unwrap();

        assert_eq!(store.all_transfers().await.unwrap().len(), 1);
        assert_eq!(store.total_balance().unwrap(), 200);
        let a_after = store.find_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(a_after.balance.value(), 60);
    }

    #[tokio::test]
    async fn test_remove_account_keeps_transfers() {
        let store = InMemoryStore::new();
        let a = store.insert(&open("a@example.com", 100)).await.unwrap();
        let b = store.insert(&open("b@example.com", 100)).await.unwrap();
        let amount = Amount::new(1).unwrap();
        let commit = TransferCommit {
            sender: a.debited(&amount).unwrap(),
            receiver: b.credited(&amount).unwrap(),
            transfer: Transfer::new(Uuid::new_v4(), a.id, b.id, amount),
        };
        store.commit_transfer(&commit).await.unwrap();

        store.remove_account(b.id).unwrap();
        assert!(store.find_by_email("b@example.com").await.unwrap().is_none());
        assert_eq!(store.incoming(b.id).await.unwrap().len(), 1);
    }
}
