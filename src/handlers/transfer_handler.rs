//! Transfer Handler
//!
//! The ledger engine: validates a transfer and applies it as one atomic
//! state change across two accounts plus one ledger append.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use uuid::Uuid;

use crate::config::LedgerSettings;
use crate::domain::{Account, Amount, LedgerError, Principal, Transfer};
use crate::guard;
use crate::store::{bounded, LedgerStore, StoreError, TransferCommit};

use super::{TransferCommand, TransferResult};

/// Outcome of a single attempt that did not succeed
#[derive(Debug)]
enum AttemptError {
    /// Deterministic validation failure, never retried
    Rejected(LedgerError),
    /// Store failure, possibly retryable
    Store(StoreError),
}

impl From<StoreError> for AttemptError {
    fn from(err: StoreError) -> Self {
        AttemptError::Store(err)
    }
}

impl From<LedgerError> for AttemptError {
    fn from(err: LedgerError) -> Self {
        AttemptError::Rejected(err)
    }
}

/// Input after the presence/format checks
#[derive(Debug)]
struct ValidatedInput {
    receiver_email: String,
    quantity: i64,
}

impl ValidatedInput {
    fn parse(command: &TransferCommand) -> Result<Self, LedgerError> {
        let receiver_email = command.receiver_email.trim();
        if receiver_email.is_empty() {
            return Err(LedgerError::invalid_argument("receiver email is required"));
        }

        let raw = command.amount.trim();
        if raw.is_empty() {
            return Err(LedgerError::invalid_argument("amount is required"));
        }
        let quantity = raw
            .parse::<i64>()
            .map_err(|_| LedgerError::invalid_argument(format!("amount is not a whole number: {raw}")))?;

        Ok(Self {
            receiver_email: receiver_email.to_string(),
            quantity,
        })
    }
}

// =========================================================================
// TransferHandler
// =========================================================================

/// Handler for peer transfers
pub struct TransferHandler {
    store: Arc<dyn LedgerStore>,
    settings: LedgerSettings,
}

impl TransferHandler {
    pub fn new(store: Arc<dyn LedgerStore>, settings: LedgerSettings) -> Self {
        Self { store, settings }
    }

    /// Execute the transfer command on behalf of `principal`
    pub async fn execute(
        &self,
        command: TransferCommand,
        principal: &Principal,
    ) -> Result<TransferResult, LedgerError> {
        let caller_id = guard::require_authenticated(principal)?;
        let input = ValidatedInput::parse(&command)?;

        // One id for every attempt so a retry can detect an earlier success
        let transfer_id = Uuid::new_v4();
        let max_attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.try_transfer(caller_id, &input, transfer_id, attempt).await {
                Ok(()) => {
                    tracing::info!(
                        %transfer_id,
                        sender = %caller_id,
                        receiver = %input.receiver_email,
                        amount = input.quantity,
                        correlation_id = ?principal.correlation_id,
                        "Transfer completed"
                    );
                    return Ok(TransferResult { transfer_id });
                }
                Err(AttemptError::Rejected(err)) => {
                    tracing::debug!(
                        sender = %caller_id,
                        correlation_id = ?principal.correlation_id,
                        "Transfer rejected: {}",
                        err
                    );
                    return Err(err);
                }
                Err(AttemptError::Store(err)) if Self::should_retry(&err) && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        %transfer_id,
                        "Transfer attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        max_attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(AttemptError::Store(err)) => {
                    tracing::error!(%transfer_id, "Transfer failed after {} attempt(s): {}", attempt, err);
                    return Err(Self::final_error(err, caller_id));
                }
            }
        }

        // max_attempts >= 1, every iteration returns on its last pass
        Err(LedgerError::Conflict)
    }

    /// One read-validate-commit pass
    async fn try_transfer(
        &self,
        caller_id: Uuid,
        input: &ValidatedInput,
        transfer_id: Uuid,
        attempt: u32,
    ) -> Result<(), AttemptError> {
        let limit = self.settings.store_timeout;

        if attempt > 1 && bounded(limit, self.store.find_transfer(transfer_id)).await?.is_some() {
            tracing::debug!(%transfer_id, "Earlier attempt already committed");
            return Ok(());
        }

        let sender = bounded(limit, self.store.find_by_id(caller_id))
            .await?
            .filter(|account| account.active)
            .ok_or(LedgerError::SenderInactive)?;

        let receiver = bounded(limit, self.store.find_by_email(&input.receiver_email))
            .await?
            .ok_or(LedgerError::ReceiverNotFound)?;

        if receiver.id == sender.id {
            return Err(LedgerError::SelfTransfer.into());
        }

        if !sender.balance.covers(input.quantity) {
            return Err(LedgerError::insufficient_funds(input.quantity, sender.balance.value()).into());
        }

        let amount = Amount::new(input.quantity)
            .map_err(|e| LedgerError::invalid_argument(e.to_string()))?;

        let commit = Self::prepare(sender, receiver, transfer_id, amount)?;
        bounded(limit, self.store.commit_transfer(&commit)).await?;

        Ok(())
    }

    fn prepare(
        sender: Account,
        receiver: Account,
        transfer_id: Uuid,
        amount: Amount,
    ) -> Result<TransferCommit, LedgerError> {
        let debited = sender
            .debited(&amount)
            .map_err(|_| LedgerError::insufficient_funds(amount.value(), sender.balance.value()))?;
        let credited = receiver
            .credited(&amount)
            .map_err(|e| LedgerError::invalid_argument(format!("receiver cannot accept amount: {e}")))?;

        Ok(TransferCommit {
            transfer: Transfer::new(transfer_id, sender.id, receiver.id, amount),
            sender: debited,
            receiver: credited,
        })
    }

    /// Conflicts and unavailability are retried. A counterparty vanishing
    /// mid-commit is retried too so the next pass reports it properly.
    fn should_retry(err: &StoreError) -> bool {
        err.is_retryable() || matches!(err, StoreError::AccountMissing(_))
    }

    /// A counterparty vanishing on the last attempt is reported the way the
    /// next read would have reported it.
    fn final_error(err: StoreError, caller_id: Uuid) -> LedgerError {
        match err {
            StoreError::AccountMissing(id) if id == caller_id => LedgerError::SenderInactive,
            StoreError::AccountMissing(_) => LedgerError::ReceiverNotFound,
            other => other.into(),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.settings.retry_backoff * attempt;
        let jitter_cap = (self.settings.retry_backoff.as_millis() as u64 / 2).max(1);
        base + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_cap))
    }
}
