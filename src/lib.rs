//! wallet_ledger Library
//!
//! Account ledger core (accounts, transfers, access checks, queries) and
//! its HTTP adapter. Re-exports modules for integration testing and
//! external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod guard;
pub mod handlers;
pub mod query;
pub mod store;

mod error;

pub use config::{Config, LedgerSettings};
pub use domain::{Account, Amount, AmountError, Balance, LedgerError, Principal, Transfer};
pub use error::{AppError, AppResult};
