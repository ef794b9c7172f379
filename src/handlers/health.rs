//! Health and readiness endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Service status and gate mode
//! - `GET /ready` - Kubernetes-compatible readiness probe
//!
//! Both sit behind the gate like every other route. Add them to
//! `IGNORE_PATHS` (the default) so probes do not need a key.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "credential_source": "header",
///   "uptime_seconds": 42,
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        credential_source: state.credential_source().to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint for Kubernetes probes.
///
/// The gate is fully built before the listener binds, so a running server
/// is always ready.
#[instrument]
pub async fn readiness_check() -> StatusCode {
    StatusCode::OK
}
