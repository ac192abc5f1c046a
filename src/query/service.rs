//! Query Service
//!
//! Read-only projections over the account store and transfer ledger.
//! Counterparties that no longer exist degrade to `AccountDescriptor::Deleted`
//! instead of failing the query.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::LedgerSettings;
use crate::domain::{Account, LedgerError, Principal, Transfer};
use crate::guard;
use crate::store::{bounded, LedgerStore};

/// How an account referenced by a transfer is presented
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccountDescriptor {
    Known { id: Uuid, name: String, email: String },
    Deleted { id: Uuid },
}

impl AccountDescriptor {
    pub fn id(&self) -> Uuid {
        match self {
            AccountDescriptor::Known { id, .. } | AccountDescriptor::Deleted { id } => *id,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            AccountDescriptor::Known { email, .. } => Some(email),
            AccountDescriptor::Deleted { .. } => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            AccountDescriptor::Known { name, .. } => Some(name),
            AccountDescriptor::Deleted { .. } => None,
        }
    }

    fn from_lookup(id: Uuid, account: Option<&Account>) -> Self {
        match account {
            Some(account) => AccountDescriptor::Known {
                id,
                name: account.display_name.clone(),
                email: account.email.clone(),
            },
            None => AccountDescriptor::Deleted { id },
        }
    }
}

/// Money that left the caller's account. `amount` is negative.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingTransfer {
    pub transfer_id: Uuid,
    pub to: AccountDescriptor,
    pub amount: i64,
    pub date: DateTime<Utc>,
}

/// Money that arrived in the caller's account. `amount` is positive.
#[derive(Debug, Clone, Serialize)]
pub struct IncomingTransfer {
    pub transfer_id: Uuid,
    pub from: AccountDescriptor,
    pub amount: i64,
    pub date: DateTime<Utc>,
}

/// One row of the admin audit
#[derive(Debug, Clone, Serialize)]
pub struct AuditedTransfer {
    pub transfer_id: Uuid,
    pub from: AccountDescriptor,
    pub to: AccountDescriptor,
    pub amount: i64,
    pub date: DateTime<Utc>,
}

/// Query Service for balances and transfer history
pub struct QueryService {
    store: Arc<dyn LedgerStore>,
    settings: LedgerSettings,
}

impl QueryService {
    pub fn new(store: Arc<dyn LedgerStore>, settings: LedgerSettings) -> Self {
        Self { store, settings }
    }

    /// Current balance. Self-only: `account_id` must be the caller.
    pub async fn balance_of(&self, principal: &Principal, account_id: Uuid) -> Result<i64, LedgerError> {
        let caller_id = guard::require_authenticated(principal)?;
        if caller_id != account_id {
            return Err(LedgerError::Unauthorized);
        }

        let account = bounded(self.settings.store_timeout, self.store.find_by_id(account_id))
            .await?
            .ok_or(LedgerError::Unauthorized)?;

        Ok(account.balance.value())
    }

    /// Transfers sent by the caller, newest first
    pub async fn outgoing_transfers(&self, principal: &Principal) -> Result<Vec<OutgoingTransfer>, LedgerError> {
        let caller_id = guard::require_authenticated(principal)?;
        let transfers = bounded(self.settings.store_timeout, self.store.outgoing(caller_id)).await?;
        let accounts = self.resolve(transfers.iter().map(|t| t.receiver_id)).await?;

        Ok(transfers
            .into_iter()
            .map(|t| OutgoingTransfer {
                transfer_id: t.id,
                to: AccountDescriptor::from_lookup(t.receiver_id, accounts.get(&t.receiver_id)),
                amount: -t.amount.value(),
                date: t.created_at,
            })
            .collect())
    }

    /// Transfers received by the caller, newest first
    pub async fn incoming_transfers(&self, principal: &Principal) -> Result<Vec<IncomingTransfer>, LedgerError> {
        let caller_id = guard::require_authenticated(principal)?;
        let transfers = bounded(self.settings.store_timeout, self.store.incoming(caller_id)).await?;
        let accounts = self.resolve(transfers.iter().map(|t| t.sender_id)).await?;

        Ok(transfers
            .into_iter()
            .map(|t| IncomingTransfer {
                transfer_id: t.id,
                from: AccountDescriptor::from_lookup(t.sender_id, accounts.get(&t.sender_id)),
                amount: t.amount.value(),
                date: t.created_at,
            })
            .collect())
    }

    /// Every transfer in the ledger, newest first. Admin only.
    pub async fn all_transfers(&self, principal: &Principal) -> Result<Vec<AuditedTransfer>, LedgerError> {
        guard::require_admin(principal)?;
        let transfers: Vec<Transfer> =
            bounded(self.settings.store_timeout, self.store.all_transfers()).await?;
        let accounts = self
            .resolve(transfers.iter().flat_map(|t| [t.sender_id, t.receiver_id]))
            .await?;

        Ok(transfers
            .into_iter()
            .map(|t| AuditedTransfer {
                transfer_id: t.id,
                from: AccountDescriptor::from_lookup(t.sender_id, accounts.get(&t.sender_id)),
                to: AccountDescriptor::from_lookup(t.receiver_id, accounts.get(&t.receiver_id)),
                amount: t.amount.value(),
                date: t.created_at,
            })
            .collect())
    }

    /// Look up each distinct account once; missing ones are simply absent.
    async fn resolve(
        &self,
        ids: impl Iterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, Account>, LedgerError> {
        let mut wanted: Vec<Uuid> = ids.collect();
        wanted.sort_unstable();
        wanted.dedup();

        let mut found = HashMap::with_capacity(wanted.len());
        for id in wanted {
            if let Some(account) = bounded(self.settings.store_timeout, self.store.find_by_id(id)).await? {
                found.insert(id, account);
            }
        }
        Ok(found)
    }
}
