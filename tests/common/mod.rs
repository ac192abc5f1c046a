//! Common test utilities
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tokio::sync::OnceCell;
use uuid::Uuid;

use wallet_ledger::store::{
    AccountStore, InMemoryStore, LedgerStore, PgStore, StoreError, TransferCommit, TransferLedger,
};
use wallet_ledger::{Account, Balance, LedgerSettings, Transfer};

/// Settings with short waits so retry paths stay fast
pub fn fast_settings() -> LedgerSettings {
    LedgerSettings {
        store_timeout: Duration::from_millis(200),
        max_attempts: 3,
        retry_backoff: Duration::from_millis(2),
        ..LedgerSettings::default()
    }
}

/// Insert one account per `(email, balance)` pair
pub async fn seed<S: AccountStore + ?Sized>(store: &S, accounts: &[(&str, i64)]) -> Vec<Account> {
    let mut seeded = Vec::with_capacity(accounts.len());
    for (email, balance) in accounts {
        let name = email.split('@').next().unwrap_or_default();
        let account = Account::open(*email, name, Balance::new(*balance).unwrap());
        seeded.push(store.insert(&account).await.unwrap());
    }
    seeded
}

pub async fn balance_of<S: AccountStore + ?Sized>(store: &S, id: Uuid) -> i64 {
    store.find_by_id(id).await.unwrap().unwrap().balance.value()
}

// =========================================================================
// FlakyStore
// =========================================================================

/// In-memory store with injectable faults.
///
/// - `fail_commits(n)`: the next `n` commits fail with `Unavailable` and change nothing
/// - `lose_next_ack()`: the next commit is applied but reports `Timeout`
/// - `slow_reads(d)`: account lookups sleep for `d` first
/// - `vanish_on_commit(id)`: the next commit first removes account `id`
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    failing_commits: AtomicU32,
    lose_ack: AtomicBool,
    read_delay_ms: AtomicU32,
    vanishing: Mutex<Option<Uuid>>,
    pub commit_calls: AtomicU32,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_commits(&self, n: u32) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    pub fn lose_next_ack(&self) {
        self.lose_ack.store(true, Ordering::SeqCst);
    }

    pub fn slow_reads(&self, delay: Duration) {
        self.read_delay_ms.store(delay.as_millis() as u32, Ordering::SeqCst);
    }

    pub fn vanish_on_commit(&self, id: Uuid) {
        *self.vanishing.lock().unwrap() = Some(id);
    }

    pub fn commits(&self) -> u32 {
        self.commit_calls.load(Ordering::SeqCst)
    }

    async fn maybe_delay(&self) {
        let ms = self.read_delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms as u64)).await;
        }
    }
}

#[async_trait]
impl AccountStore for FlakyStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        self.maybe_delay().await;
        self.inner.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.maybe_delay().await;
        self.inner.find_by_email(email).await
    }

    async fn insert(&self, account: &Account) -> Result<Account, StoreError> {
        self.inner.insert(account).await
    }

    async fn save(&self, account: &Account) -> Result<Account, StoreError> {
        self.inner.save(account).await
    }
}

#[async_trait]
impl TransferLedger for FlakyStore {
    async fn find_transfer(&self, id: Uuid) -> Result<Option<Transfer>, StoreError> {
        self.inner.find_transfer(id).await
    }

    async fn outgoing(&self, sender_id: Uuid) -> Result<Vec<Transfer>, StoreError> {
        self.inner.outgoing(sender_id).await
    }

    async fn incoming(&self, receiver_id: Uuid) -> Result<Vec<Transfer>, StoreError> {
        self.inner.incoming(receiver_id).await
    }

    async fn all_transfers(&self) -> Result<Vec<Transfer>, StoreError> {
        self.inner.all_transfers().await
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn commit_transfer(&self, commit: &TransferCommit) -> Result<(), StoreError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failing_commits.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_commits.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }

        let vanishing = self.vanishing.lock().unwrap().take();
        if let Some(id) = vanishing {
            self.inner.remove_account(id)?;
        }

        self.inner.commit_transfer(commit).await?;

        if self.lose_ack.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Timeout(Duration::from_millis(1)));
        }
        Ok(())
    }
}

pub fn flaky() -> Arc<FlakyStore> {
    Arc::new(FlakyStore::new())
}

// =========================================================================
// PostgreSQL
// =========================================================================

static SCHEMA: OnceCell<()> = OnceCell::const_new();

/// Connect and apply the schema, or `None` when `DATABASE_URL` is unset.
///
/// Tests use unique emails instead of truncating so they can run in parallel.
pub async fn setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    SCHEMA
        .get_or_init(|| async {
            pool.execute(include_str!("../../migrations/001_initial_schema.sql"))
                .await
                .expect("Failed to apply schema");
        })
        .await;

    Some(pool)
}

pub async fn pg_store() -> Option<Arc<PgStore>> {
    setup_test_db().await.map(|pool| Arc::new(PgStore::new(pool)))
}

/// An email no other test run will use
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4().simple())
}
