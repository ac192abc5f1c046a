//! Command definitions
//!
//! Commands represent intentions to change the system state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move money from the caller to another account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    /// Email of the recipient
    pub receiver_email: String,
    /// Amount in the smallest currency unit, unparsed
    pub amount: String,
}

impl TransferCommand {
    pub fn new(receiver_email: impl Into<String>, amount: impl ToString) -> Self {
        Self {
            receiver_email: receiver_email.into(),
            amount: amount.to_string(),
        }
    }
}

/// Result of a successful transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer_id: Uuid,
}

// =========================================================================
// SetActiveCommand
// =========================================================================

/// Command to activate or deactivate an account by email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveCommand {
    pub email: String,
    pub active: bool,
}

impl SetActiveCommand {
    pub fn activate(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            active: true,
        }
    }

    pub fn deactivate(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            active: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveResult {
    pub account_id: Uuid,
    pub email: String,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

// =========================================================================
// OpenAccountCommand
// =========================================================================

/// Command to open a new account on behalf of the registration layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountCommand {
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
}

impl OpenAccountCommand {
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
            is_admin: false,
        }
    }

    pub fn as_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountResult {
    pub account_id: Uuid,
    pub email: String,
    pub balance: i64,
}
