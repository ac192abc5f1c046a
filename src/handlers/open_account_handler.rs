//! Open Account Handler
//!
//! Entry point for the registration layer: creates an account with the
//! configured starting balance. Credentials are not handled here.

use std::sync::Arc;

use crate::config::LedgerSettings;
use crate::domain::{Account, LedgerError};
use crate::store::{bounded, LedgerStore};

use super::{OpenAccountCommand, OpenAccountResult};

pub struct OpenAccountHandler {
    store: Arc<dyn LedgerStore>,
    settings: LedgerSettings,
}

impl OpenAccountHandler {
    pub fn new(store: Arc<dyn LedgerStore>, settings: LedgerSettings) -> Self {
        Self { store, settings }
    }

    pub async fn execute(&self, command: OpenAccountCommand) -> Result<OpenAccountResult, LedgerError> {
        let email = command.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(LedgerError::invalid_argument("a valid email is required"));
        }

        let display_name = command.display_name.trim();
        if display_name.is_empty() {
            return Err(LedgerError::invalid_argument("display name is required"));
        }

        let account = Account::open(email, display_name, self.settings.initial_balance)
            .with_admin(command.is_admin);

        // Duplicate email surfaces as InvalidArgument
        let stored = bounded(self.settings.store_timeout, self.store.insert(&account)).await?;

        tracing::info!(account = %stored.id, is_admin = stored.is_admin, "Account opened");

        Ok(OpenAccountResult {
            account_id: stored.id,
            email: stored.email,
            balance: stored.balance.value(),
        })
    }
}
