//! API Middleware
//!
//! Gateway key check, principal resolution and request logging.
//!
//! Identity is established by the upstream authentication layer and reaches
//! this service as trusted headers. Nothing here verifies credentials.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::domain::Principal;
use crate::error::AppError;

use super::{digest_key, AppState};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-request-user-id";
pub const USER_ADMIN_HEADER: &str = "x-request-user-admin";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// =========================================================================
// Principal resolution
// =========================================================================

/// Check the gateway key and attach a [`Principal`] to the request.
///
/// A missing user header yields an anonymous principal; the handlers decide
/// whether that is acceptable.
pub async fn principal_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();

    if let Some(expected) = &state.gateway_key_digest {
        let provided = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(digest_key);
        if provided.as_deref() != Some(expected.as_str()) {
            return Err(AppError::InvalidApiKey);
        }
    }

    let principal = principal_from_headers(headers)?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Build the principal from the trusted identity headers
pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, AppError> {
    let mut principal = match header_str(headers, USER_ID_HEADER) {
        Some(raw) => {
            let id = Uuid::parse_str(raw.trim())
                .map_err(|_| AppError::InvalidHeader(USER_ID_HEADER.to_string()))?;
            Principal::account(id)
        }
        None => Principal::anonymous(),
    };

    let is_admin = header_str(headers, USER_ADMIN_HEADER)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
        .unwrap_or(false);
    principal = principal.with_admin(is_admin);

    if let Some(correlation_id) =
        header_str(headers, CORRELATION_ID_HEADER).and_then(|s| Uuid::parse_str(s).ok())
    {
        principal = principal.with_correlation_id(correlation_id);
    }

    Ok(principal)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["x-api-key", "authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let masked_value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request logging
// =========================================================================

/// Request logging middleware.
///
/// Runs outermost, so it also assigns the correlation id when the caller
/// did not send one.
pub async fn logging_middleware(mut request: Request<Body>, next: Next) -> Response {
    let provided =
        header_str(request.headers(), CORRELATION_ID_HEADER).and_then(|s| Uuid::parse_str(s).ok());
    let correlation_id = match provided {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4();
            if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                request.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            id
        }
    };

    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = mask_headers_for_logging(request.headers());
    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        %correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let mut response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        %correlation_id,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
