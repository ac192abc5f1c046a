//! Query module
//!
//! Read models for balances, transfer history and the admin audit.

pub mod service;

pub use service::{AccountDescriptor, AuditedTransfer, IncomingTransfer, OutgoingTransfer, QueryService};
