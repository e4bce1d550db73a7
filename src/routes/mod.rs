//! HTTP routes for the deploy listener.
//!
//! Exactly one route exists: `POST` on the configured deploy path. Every
//! other path, and every other method on the deploy path, is answered with
//! 404 so the listener reveals nothing beyond the one endpoint.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod deploy;

use axum::{extract::DefaultBodyLimit, middleware, routing::post, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::CACHE_CONTROL_NO_STORE;
use crate::error::AppError;
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Fallback for unknown paths and unsupported methods.
pub async fn not_found() -> AppError {
    AppError::NotFound
}

/// Creates the Axum router for the deploy endpoint.
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.deploy.max_body_bytes;
    let deploy_path = state.deploy.path.clone();

    Router::new()
        .route(&deploy_path, post(deploy::trigger).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ))
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
