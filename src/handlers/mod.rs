//! Command Handlers module
//!
//! Handlers that change ledger state. Each one authorizes the principal,
//! validates input and talks to the store with bounded, retried calls.

mod commands;
mod open_account_handler;
mod set_active_handler;
mod transfer_handler;


pub use commands::*;
pub use open_account_handler::OpenAccountHandler;
pub use set_active_handler::SetActiveHandler;
pub use transfer_handler::TransferHandler;
