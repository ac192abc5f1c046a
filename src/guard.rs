//! Access Guard
//!
//! Stateless authorization predicates consulted before any ledger operation.
//! Admin checks always run the authentication check first, so an anonymous
//! caller sees `Unauthorized` rather than `Forbidden`.

use uuid::Uuid;

use crate::domain::{LedgerError, Principal};

/// Returns the caller's account id, or `Unauthorized`.
pub fn require_authenticated(principal: &Principal) -> Result<Uuid, LedgerError> {
    principal.account_id.ok_or(LedgerError::Unauthorized)
}

/// Returns the caller's account id if they are an administrator.
pub fn require_admin(principal: &Principal) -> Result<Uuid, LedgerError> {
    let account_id = require_authenticated(principal)?;
    if !principal.is_admin {
        tracing::debug!(%account_id, "Admin operation refused");
        return Err(LedgerError::Forbidden);
    }
    Ok(account_id)
}
