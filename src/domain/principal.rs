//! Principal context
//!
//! The identity attached to a request by the upstream authentication layer.
//! Built once per request and passed explicitly into every ledger call.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is calling, and with which privilege.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Authenticated account, absent for anonymous callers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,

    /// Administrator flag as resolved by the auth layer
    pub is_admin: bool,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl Principal {
    /// An unauthenticated caller
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated, non-admin caller
    pub fn account(account_id: Uuid) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }

    /// An authenticated administrator
    pub fn admin(account_id: Uuid) -> Self {
        Self::account(account_id).with_admin(true)
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.account_id.is_some()
    }
}
