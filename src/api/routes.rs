//! API Routes
//!
//! HTTP endpoint definitions. Every handler receives the [`Principal`]
//! resolved by the middleware and delegates to the ledger core.

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::Principal;
use crate::error::{AppError, AppResult};
use crate::guard;
use crate::handlers::{SetActiveCommand, SetActiveHandler, TransferCommand, TransferHandler};
use crate::query::{AuditedTransfer, IncomingTransfer, OutgoingTransfer, QueryService};

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    #[serde(default)]
    pub email: Option<String>,
    /// Integer or numeric string
    #[serde(default)]
    pub amount: Option<Value>,
}

impl TransferRequest {
    /// Hand the amount to the engine as text so every format problem is
    /// reported by the same validation path.
    fn into_command(self) -> TransferCommand {
        let amount = match self.amount {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        };
        TransferCommand::new(self.email.unwrap_or_default(), amount)
    }
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub message: String,
    pub transfer_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OutgoingTransferDto {
    pub transfer_id: Uuid,
    pub to: Option<String>,
    pub to_name: Option<String>,
    pub to_id: Uuid,
    pub amount: i64,
    pub date: DateTime<Utc>,
}

impl From<OutgoingTransfer> for OutgoingTransferDto {
    fn from(t: OutgoingTransfer) -> Self {
        Self {
            transfer_id: t.transfer_id,
            to: t.to.email().map(str::to_string),
            to_name: t.to.name().map(str::to_string),
            to_id: t.to.id(),
            amount: t.amount,
            date: t.date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IncomingTransferDto {
    pub transfer_id: Uuid,
    pub from: Option<String>,
    pub from_name: Option<String>,
    pub from_id: Uuid,
    pub amount: i64,
    pub date: DateTime<Utc>,
}

impl From<IncomingTransfer> for IncomingTransferDto {
    fn from(t: IncomingTransfer) -> Self {
        Self {
            transfer_id: t.transfer_id,
            from: t.from.email().map(str::to_string),
            from_name: t.from.name().map(str::to_string),
            from_id: t.from.id(),
            amount: t.amount,
            date: t.date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditedTransferDto {
    pub transfer_id: Uuid,
    pub from: Option<String>,
    pub from_name: Option<String>,
    pub from_id: Uuid,
    pub to: Option<String>,
    pub to_name: Option<String>,
    pub to_id: Uuid,
    pub amount: i64,
    pub date: DateTime<Utc>,
}

impl From<AuditedTransfer> for AuditedTransferDto {
    fn from(t: AuditedTransfer) -> Self {
        Self {
            transfer_id: t.transfer_id,
            from: t.from.email().map(str::to_string),
            from_name: t.from.name().map(str::to_string),
            from_id: t.from.id(),
            to: t.to.email().map(str::to_string),
            to_name: t.to.name().map(str::to_string),
            to_id: t.to.id(),
            amount: t.amount,
            date: t.date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransfersResponse<T> {
    pub transfers: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct AccountStatusRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountStatusResponse {
    pub message: String,
    pub email: String,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthCheckResponse {
    pub authenticated: bool,
    pub account_id: Uuid,
    pub is_admin: bool,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/transfer", post(transfer))
        .route("/my-transfers", get(my_transfers))
        .route("/incoming-transfers", get(incoming_transfers))
        .route("/balance", get(balance))
        .route("/check-auth", get(check_auth))
        .route("/check-admin", get(check_admin))
        // Admin
        .route("/admin/all-transfers", get(all_transfers))
        .route("/admin/deactivate-user", patch(deactivate_user))
        .route("/admin/activate-user", patch(activate_user))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidBody(rejection.body_text()))
}

// =========================================================================
// POST /transfer
// =========================================================================

/// Move money from the caller to the account with the given email
async fn transfer(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> AppResult<Json<TransferResponse>> {
    // Access decides the status before the body does
    guard::require_authenticated(&principal)?;
    let command = json_body(payload)?.into_command();
    let handler = TransferHandler::new(state.store.clone(), state.settings.clone());

    // Detached so a dropped connection cannot abandon a commit halfway
    let result = tokio::spawn(async move { handler.execute(command, &principal).await })
        .await
        .map_err(|e| AppError::Internal(format!("transfer task failed: {e}")))??;

    Ok(Json(TransferResponse {
        message: "Transfer successful".to_string(),
        transfer_id: result.transfer_id,
    }))
}

// =========================================================================
// Queries
// =========================================================================

async fn my_transfers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<TransfersResponse<OutgoingTransferDto>>> {
    let transfers = QueryService::new(state.store, state.settings)
        .outgoing_transfers(&principal)
        .await?;

    Ok(Json(TransfersResponse {
        transfers: transfers.into_iter().map(Into::into).collect(),
    }))
}

async fn incoming_transfers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<TransfersResponse<IncomingTransferDto>>> {
    let transfers = QueryService::new(state.store, state.settings)
        .incoming_transfers(&principal)
        .await?;

    Ok(Json(TransfersResponse {
        transfers: transfers.into_iter().map(Into::into).collect(),
    }))
}

/// Balance of the caller's own account
async fn balance(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<BalanceResponse>> {
    let account_id = guard::require_authenticated(&principal)?;
    let balance = QueryService::new(state.store, state.settings)
        .balance_of(&principal, account_id)
        .await?;

    Ok(Json(BalanceResponse { balance }))
}

async fn all_transfers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<TransfersResponse<AuditedTransferDto>>> {
    let transfers = QueryService::new(state.store, state.settings)
        .all_transfers(&principal)
        .await?;

    Ok(Json(TransfersResponse {
        transfers: transfers.into_iter().map(Into::into).collect(),
    }))
}

// =========================================================================
// Probes
// =========================================================================

async fn check_auth(Extension(principal): Extension<Principal>) -> AppResult<Json<AuthCheckResponse>> {
    let account_id = guard::require_authenticated(&principal)?;
    Ok(Json(AuthCheckResponse {
        authenticated: true,
        account_id,
        is_admin: principal.is_admin,
    }))
}

async fn check_admin(Extension(principal): Extension<Principal>) -> AppResult<Json<AuthCheckResponse>> {
    let account_id = guard::require_admin(&principal)?;
    Ok(Json(AuthCheckResponse {
        authenticated: true,
        account_id,
        is_admin: true,
    }))
}

// =========================================================================
// PATCH /admin/{deactivate,activate}-user
// =========================================================================

async fn deactivate_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<AccountStatusRequest>, JsonRejection>,
) -> AppResult<Json<AccountStatusResponse>> {
    guard::require_admin(&principal)?;
    let email = json_body(payload)?.email.unwrap_or_default();
    set_active(state, principal, SetActiveCommand::deactivate(email)).await
}

async fn activate_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<AccountStatusRequest>, JsonRejection>,
) -> AppResult<Json<AccountStatusResponse>> {
    guard::require_admin(&principal)?;
    let email = json_body(payload)?.email.unwrap_or_default();
    set_active(state, principal, SetActiveCommand::activate(email)).await
}

async fn set_active(
    state: AppState,
    principal: Principal,
    command: SetActiveCommand,
) -> AppResult<Json<AccountStatusResponse>> {
    let result = SetActiveHandler::new(state.store, state.settings)
        .execute(command, &principal)
        .await?;

    let message = if result.active {
        "User activated"
    } else {
        "User deactivated"
    };

    Ok(Json(AccountStatusResponse {
        message: message.to_string(),
        email: result.email,
        active: result.active,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> TransferCommand {
        serde_json::from_str::<TransferRequest>(body).unwrap().into_command()
    }

    #[test]
    fn test_transfer_request_integer_amount() {
        let cmd = parse(r#"{"email": "bob@example.com", "amount": 300000}"#);
        assert_eq!(cmd.receiver_email, "bob@example.com");
        assert_eq!(cmd.amount, "300000");
    }

    #[test]
    fn test_transfer_request_string_amount() {
        let cmd = parse(r#"{"email": "bob@example.com", "amount": "42"}"#);
        assert_eq!(cmd.amount, "42");
    }

    #[test]
    fn test_transfer_request_missing_fields() {
        let cmd = parse("{}");
        assert!(cmd.receiver_email.is_empty());
        assert!(cmd.amount.is_empty());
    }

    #[test]
    fn test_transfer_request_fraction_kept_for_rejection() {
        let cmd = parse(r#"{"email": "bob@example.com", "amount": 10.5}"#);
        assert_eq!(cmd.amount, "10.5");
        assert!(cmd.amount.parse::<i64>().is_err());
    }

    #[test]
    fn test_status_request_tolerates_missing_email() {
        let req: AccountStatusRequest = serde_json::from_str("{}").unwrap();
        assert!(req.email.is_none());
    }
}
