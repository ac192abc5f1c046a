//! PostgreSQL store tests
//!
//! Skipped unless DATABASE_URL points at a disposable database.

use uuid::Uuid;

use wallet_ledger::handlers::{SetActiveCommand, SetActiveHandler, TransferCommand, TransferHandler};
use wallet_ledger::store::{AccountStore, LedgerStore, StoreError, TransferCommit, TransferLedger};
use wallet_ledger::{Account, Amount, Balance, LedgerError, LedgerSettings, Principal, Transfer};

mod common;

use common::{pg_store, unique_email};

macro_rules! require_db {
    () => {
        match pg_store().await {
            Some(store) => store,
            None => {
                eprintln!("DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

async fn open(store: &dyn LedgerStore, prefix: &str, balance: i64) -> Account {
    let account = Account::open(unique_email(prefix), prefix, Balance::new(balance).unwrap());
    store.insert(&account).await.unwrap()
}

#[tokio::test]
async fn test_insert_and_lookup() {
    let store = require_db!();
    let account = open(store.as_ref(), "lookup", 1_000).await;

    let by_id = store.find_by_id(account.id).await.unwrap().unwrap();
    let by_email = store.find_by_email(&account.email).await.unwrap().unwrap();
    assert_eq!(by_id.id, by_email.id);
    assert_eq!(by_id.balance.value(), 1_000);
    assert_eq!(by_id.version, 1);

    let duplicate = Account::open(account.email.clone(), "again", Balance::zero());
    let err = store.insert(&duplicate).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey(_)), "{err:?}");
}

#[tokio::test]
async fn test_save_is_version_guarded() {
    let store = require_db!();
    let account = open(store.as_ref(), "versioned", 10).await;

    let saved = store.save(&account.with_active(false)).await.unwrap();
    assert_eq!(saved.version, account.version + 1);
    assert!(!saved.active);

    let err = store.save(&account.with_active(true)).await.unwrap_err();
    assert!(err.is_concurrency_conflict(), "{err:?}");
}

#[tokio::test]
async fn test_commit_transfer_atomic_and_idempotent() {
    let store = require_db!();
    let a = open(store.as_ref(), "sender", 100).await;
    let b = open(store.as_ref(), "receiver", 0).await;
    let amount = Amount::new(40).unwrap();

    let commit = TransferCommit {
        sender: a.debited(&amount).unwrap(),
        receiver: b.credited(&amount).unwrap(),
        transfer: Transfer::new(Uuid::new_v4(), a.id, b.id, amount),
    };
    store.commit_transfer(&commit).await.unwrap();
    store.commit_transfer(&commit).await.unwrap();

    assert_eq!(store.find_by_id(a.id).await.unwrap().unwrap().balance.value(), 60);
    assert_eq!(store.find_by_id(b.id).await.unwrap().unwrap().balance.value(), 40);
    assert_eq!(store.outgoing(a.id).await.unwrap().len(), 1);

    // Same stale reads under a new id must not apply
    let stale = TransferCommit {
        transfer: Transfer::new(Uuid::new_v4(), a.id, b.id, amount),
        ..commit
    };
    let err = store.commit_transfer(&stale).await.unwrap_err();
    assert!(err.is_concurrency_conflict(), "{err:?}");
    assert_eq!(store.find_by_id(a.id).await.unwrap().unwrap().balance.value(), 60);
    assert_eq!(store.incoming(b.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engine_concurrent_full_balance() {
    let store = require_db!();
    let a = open(store.as_ref(), "racer", 500).await;
    let b = open(store.as_ref(), "left", 0).await;
    let c = open(store.as_ref(), "right", 0).await;
    let sender = Principal::account(a.id);

    let mut tasks = Vec::new();
    for receiver in [b.email.clone(), c.email.clone()] {
        let handler = TransferHandler::new(store.clone(), LedgerSettings::default());
        let sender = sender.clone();
        tasks.push(tokio::spawn(async move {
            handler.execute(TransferCommand::new(receiver, 500), &sender).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LedgerError::InsufficientFunds { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(successes, 1);

    let balances = [
        store.find_by_id(a.id).await.unwrap().unwrap().balance.value(),
        store.find_by_id(b.id).await.unwrap().unwrap().balance.value(),
        store.find_by_id(c.id).await.unwrap().unwrap().balance.value(),
    ];
    assert_eq!(balances[0], 0);
    assert_eq!(balances.iter().sum::<i64>(), 500);
}

#[tokio::test]
async fn test_set_active_round_trip() {
    let store = require_db!();
    let account = open(store.as_ref(), "toggle", 1).await;
    let handler = SetActiveHandler::new(store.clone(), LedgerSettings::default());
    let admin = Principal::admin(Uuid::new_v4());

    let result = handler
        .execute(SetActiveCommand::deactivate(account.email.clone()), &admin)
        .await
        .unwrap();
    assert!(!result.active);

    let stored = store.find_by_id(account.id).await.unwrap().unwrap();
    assert!(!stored.active);
    assert_eq!(stored.version, account.version + 1);
}
