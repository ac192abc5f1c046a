//! Transfer record
//!
//! Immutable record of one completed balance movement. A Transfer exists
//! if and only if the matching debit and credit were applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Amount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    pub fn new(id: Uuid, sender_id: Uuid, receiver_id: Uuid, amount: Amount) -> Self {
        Self {
            id,
            sender_id,
            receiver_id,
            amount,
            created_at: Utc::now(),
        }
    }

    /// Whether `account_id` is either side of this transfer
    pub fn involves(&self, account_id: Uuid) -> bool {
        self.sender_id == account_id || self.receiver_id == account_id
    }
}
