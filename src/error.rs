//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::LedgerError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Invalid header {0}")]
    InvalidHeader(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            AppError::Ledger(err) => match err {
                LedgerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
                LedgerError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
                LedgerError::InvalidArgument(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_argument", Some(msg.clone()))
                }
                LedgerError::SenderInactive => (StatusCode::FORBIDDEN, "sender_inactive", None),
                LedgerError::ReceiverNotFound => {
                    (StatusCode::NOT_FOUND, "receiver_not_found", None)
                }
                LedgerError::SelfTransfer => (StatusCode::BAD_REQUEST, "self_transfer", None),
                LedgerError::InsufficientFunds { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_funds", Some(err.to_string()))
                }
                LedgerError::NotFound(what) => (StatusCode::NOT_FOUND, "not_found", Some(what.clone())),
                LedgerError::Conflict => (StatusCode::CONFLICT, "conflict", None),
                LedgerError::Transient(_) => {
                    tracing::warn!("Transient failure: {}", err);
                    (StatusCode::SERVICE_UNAVAILABLE, "transient", None)
                }
                LedgerError::Internal(msg) => {
                    tracing::error!("Internal error: {}", msg);
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
                }
            },
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "invalid_api_key", None),
            AppError::InvalidHeader(name) => {
                (StatusCode::BAD_REQUEST, "invalid_header", Some(name.clone()))
            }
            AppError::InvalidBody(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_argument", Some(msg.clone()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.status_and_code();

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
