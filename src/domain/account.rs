//! Account entity
//!
//! An identity holding a balance plus active/admin flags. Balance changes
//! are produced here and persisted by the store with a version guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, AmountError, Balance};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub balance: Balance,
    pub active: bool,
    pub is_admin: bool,
    /// Optimistic concurrency token, bumped by the store on every write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open a new active, non-admin account.
    pub fn open(email: impl Into<String>, display_name: impl Into<String>, balance: Balance) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: display_name.into(),
            balance,
            active: true,
            is_admin: false,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    /// Copy of this account with `amount` removed from the balance.
    ///
    /// The version is left untouched: it is the expected version for the
    /// store's compare-and-swap.
    pub fn debited(&self, amount: &Amount) -> Result<Account, AmountError> {
        Ok(Account {
            balance: self.balance.debit(amount)?,
            ..self.clone()
        })
    }

    /// Copy of this account with `amount` added to the balance.
    pub fn credited(&self, amount: &Amount) -> Result<Account, AmountError> {
        Ok(Account {
            balance: self.balance.credit(amount)?,
            ..self.clone()
        })
    }

    pub fn with_active(&self, active: bool) -> Account {
        Account {
            active,
            ..self.clone()
        }
    }
}
