//! PostgreSQL store
//!
//! Accounts carry a `version` column used as the optimistic concurrency
//! token. A transfer is committed in one transaction: the ledger is checked
//! for the transfer id, both accounts are updated with a version guard, and
//! the transfer row is inserted. Any failure rolls the whole unit back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Account, Amount, Balance, Transfer};

use super::{AccountStore, LedgerStore, StoreError, TransferCommit, TransferLedger};

const ACCOUNT_COLUMNS: &str = r#"
    id, email, display_name, balance, is_active, is_admin, version, created_at, updated_at
"#;

const TRANSFER_COLUMNS: &str = "id, sender_id, receiver_id, amount, created_at";

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    display_name: String,
    balance: i64,
    is_active: bool,
    is_admin: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let balance = Balance::new(row.balance).map_err(|e| {
            StoreError::Corrupt(format!("balance for account {}: {}", row.id, e))
        })?;
        Ok(Account {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            balance,
            active: row.is_active,
            is_admin: row.is_admin,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransferRow {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    amount: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransferRow> for Transfer {
    type Error = StoreError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        let amount = Amount::new(row.amount).map_err(|e| {
            StoreError::Corrupt(format!("amount for transfer {}: {}", row.id, e))
        })?;
        Ok(Transfer {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            amount,
            created_at: row.created_at,
        })
    }
}

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_account(&self, sql: &str, key: AccountKey<'_>) -> Result<Option<Account>, StoreError> {
        let query = sqlx::query_as::<_, AccountRow>(sql);
        let query = match key {
            AccountKey::Id(id) => query.bind(id),
            AccountKey::Email(email) => query.bind(email),
        };
        let row = query.fetch_optional(&self.pool).await?;
        row.map(Account::try_from).transpose()
    }

    async fn fetch_transfers(&self, sql: &str, filter: Option<Uuid>) -> Result<Vec<Transfer>, StoreError> {
        let query = sqlx::query_as::<_, TransferRow>(sql);
        let query = match filter {
            Some(id) => query.bind(id),
            None => query,
        };
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Transfer::try_from)
            .collect()
    }

    /// Version-guarded balance write inside an open transaction
    async fn write_balance(
        tx: &mut Transaction<'_, Postgres>,
        account: &Account,
    ) -> Result<(), StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $3
            "#,
        )
        .bind(account.id)
        .bind(account.balance.value())
        .bind(account.version)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(Self::explain_missed_write(tx, account).await);
        }
        Ok(())
    }

    async fn explain_missed_write(
        tx: &mut Transaction<'_, Postgres>,
        account: &Account,
    ) -> StoreError {
        let found: Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT version FROM accounts WHERE id = $1")
                .bind(account.id)
                .fetch_optional(&mut **tx)
                .await;

        match found {
            Ok(Some(found)) => StoreError::VersionConflict {
                account_id: account.id,
                expected: account.version,
                found,
            },
            Ok(None) => StoreError::AccountMissing(account.id),
            Err(e) => e.into(),
        }
    }
}

/// Lookup key for a single account query
enum AccountKey<'a> {
    Id(Uuid),
    Email(&'a str),
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        self.fetch_account(&sql, AccountKey::Id(id)).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        self.fetch_account(&sql, AccountKey::Email(email)).await
    }

    async fn insert(&self, account: &Account) -> Result<Account, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO accounts (
                id, email, display_name, balance, is_active, is_admin, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let row: AccountRow = sqlx::query_as(&sql)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.display_name)
            .bind(account.balance.value())
            .bind(account.active)
            .bind(account.is_admin)
            .bind(account.version)
            .bind(account.created_at)
            .bind(account.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Account::try_from(row)
    }

    async fn save(&self, account: &Account) -> Result<Account, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE accounts
            SET email = $2, display_name = $3, balance = $4, is_active = $5, is_admin = $6,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $7
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.display_name)
            .bind(account.balance.value())
            .bind(account.active)
            .bind(account.is_admin)
            .bind(account.version)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Err(Self::explain_missed_write(&mut tx, account).await);
        };

        tx.commit().await?;
        Account::try_from(row)
    }
}

#[async_trait]
impl TransferLedger for PgStore {
    async fn find_transfer(&self, id: Uuid) -> Result<Option<Transfer>, StoreError> {
        let sql = format!("SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = $1");
        let row: Option<TransferRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Transfer::try_from).transpose()
    }

    async fn outgoing(&self, sender_id: Uuid) -> Result<Vec<Transfer>, StoreError> {
        let sql = format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE sender_id = $1 ORDER BY created_at DESC, seq DESC"
        );
        self.fetch_transfers(&sql, Some(sender_id)).await
    }

    async fn incoming(&self, receiver_id: Uuid) -> Result<Vec<Transfer>, StoreError> {
        let sql = format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE receiver_id = $1 ORDER BY created_at DESC, seq DESC"
        );
        self.fetch_transfers(&sql, Some(receiver_id)).await
    }

    async fn all_transfers(&self) -> Result<Vec<Transfer>, StoreError> {
        let sql = format!("SELECT {TRANSFER_COLUMNS} FROM transfers ORDER BY created_at DESC, seq DESC");
        self.fetch_transfers(&sql, None).await
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn commit_transfer(&self, commit: &TransferCommit) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let already_applied: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM transfers WHERE id = $1)")
                .bind(commit.transfer.id)
                .fetch_one(&mut *tx)
                .await?;

        if already_applied {
            tx.rollback().await?;
            return Ok(());
        }

        // Lock rows in a stable order so opposing transfers cannot deadlock
        let (first, second) = if commit.sender.id < commit.receiver.id {
            (&commit.sender, &commit.receiver)
        } else {
            (&commit.receiver, &commit.sender)
        };
        Self::write_balance(&mut tx, first).await?;
        Self::write_balance(&mut tx, second).await?;

        sqlx::query(
            r#"
            INSERT INTO transfers (id, sender_id, receiver_id, amount, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(commit.transfer.id)
        .bind(commit.transfer.sender_id)
        .bind(commit.transfer.receiver_id)
        .bind(commit.transfer.amount.value())
        .bind(commit.transfer.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            "Transfer {} committed: {} -> {} ({})",
            commit.transfer.id,
            commit.transfer.sender_id,
            commit.transfer.receiver_id,
            commit.transfer.amount
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_row(balance: i64) -> AccountRow {
        AccountRow {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            display_name: "a".to_string(),
            balance,
            is_active: true,
            is_admin: false,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_account_row_conversion() {
        let account = Account::try_from(account_row(250)).unwrap();
        assert_eq!(account.balance.value(), 250);
        assert!(account.active);
    }

    #[test]
    fn test_corrupt_rows_are_not_retryable() {
        let err = Account::try_from(account_row(-1)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(!err.is_retryable());

        let row = TransferRow {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            amount: 0,
            created_at: Utc::now(),
        };
        let err = Transfer::try_from(row).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
