//! Handler for deployment triggers.
//!
//! The body must be a JSON object whose `secret` field equals the configured
//! secret. Every parse failure (invalid UTF-8, invalid JSON, a JSON value that
//! is not an object, a body that could not be read) collapses into a single
//! 400. A missing, non-string or wrong secret is a 401.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    response::IntoResponse,
};
use http::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use subtle::ConstantTimeEq;

use crate::config::DEPLOYING_BODY;
use crate::error::AppError;
use crate::state::AppState;

/// Validate the trigger and hand the deployment off to the trigger.
///
/// The launch never blocks the response and its outcome is not reported
/// back to the caller.
pub async fn trigger(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = body.map_err(|e| {
        tracing::debug!(error = %e, "Failed to read request body");
        AppError::BadRequest
    })?;

    let payload: Map<String, Value> = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "Request body is not a JSON object");
        AppError::BadRequest
    })?;

    let presented = payload.get("secret").and_then(Value::as_str);
    match presented {
        Some(secret) if secrets_match(&state.deploy.secret, secret) => {}
        _ => {
            tracing::warn!(has_secret = presented.is_some(), "Deploy secret mismatch");
            return Err(AppError::Unauthorized);
        }
    }

    tracing::info!("Deployment accepted");
    state.trigger.launch(&state.deploy.secret);

    // Fixed wire bytes, not re-serialized.
    Ok(([(CONTENT_TYPE, "application/json")], DEPLOYING_BODY))
}

/// Compare secrets without short-circuiting on the first differing byte.
fn secrets_match(expected: &str, presented: &str) -> bool {
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
