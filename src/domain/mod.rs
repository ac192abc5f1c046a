//! Domain module
//!
//! Core ledger types and business rules.

pub mod account;
pub mod amount;
pub mod error;
pub mod principal;
pub mod transfer;

pub use account::Account;
pub use amount::{Amount, AmountError, Balance, DEFAULT_INITIAL_BALANCE};
pub use error::LedgerError;
pub use principal::Principal;
pub use transfer::Transfer;
