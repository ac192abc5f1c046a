//! Set Active Handler
//!
//! Admin-only activation and deactivation of accounts, looked up by email.
//! Invalidating open sessions of a deactivated account is left to the
//! session layer.

use std::sync::Arc;

use crate::config::LedgerSettings;
use crate::domain::{LedgerError, Principal};
use crate::guard;
use crate::store::{bounded, LedgerStore, StoreError};

use super::{SetActiveCommand, SetActiveResult};

/// Handler for account activation changes
pub struct SetActiveHandler {
    store: Arc<dyn LedgerStore>,
    settings: LedgerSettings,
}

impl SetActiveHandler {
    pub fn new(store: Arc<dyn LedgerStore>, settings: LedgerSettings) -> Self {
        Self { store, settings }
    }

    /// Execute the command; the flag is written even if it already has the
    /// requested value.
    pub async fn execute(
        &self,
        command: SetActiveCommand,
        principal: &Principal,
    ) -> Result<SetActiveResult, LedgerError> {
        let admin_id = guard::require_admin(principal)?;

        let email = command.email.trim();
        if email.is_empty() {
            return Err(LedgerError::invalid_argument("email is required"));
        }

        let limit = self.settings.store_timeout;
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let account = bounded(limit, self.store.find_by_email(email))
                .await?
                .ok_or_else(|| LedgerError::NotFound(format!("account {email}")))?;

            match bounded(limit, self.store.save(&account.with_active(command.active))).await {
                Ok(saved) => {
                    tracing::info!(
                        admin = %admin_id,
                        account = %saved.id,
                        active = saved.active,
                        correlation_id = ?principal.correlation_id,
                        "Account status changed"
                    );
                    return Ok(SetActiveResult {
                        account_id: saved.id,
                        email: saved.email,
                        active: saved.active,
                        updated_at: saved.updated_at,
                    });
                }
                Err(StoreError::AccountMissing(_)) => {
                    return Err(LedgerError::NotFound(format!("account {email}")));
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(
                        "Status change attempt {}/{} failed ({}), retrying",
                        attempt,
                        max_attempts,
                        err
                    );
                    tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
