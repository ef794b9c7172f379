//! Reference host routing with the API key gate in front.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   API Key Gate   │ ← 403 blocked, 401 missing/invalid key
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │    Body Limit    │
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Routes
//!
//! - `/health`, `/ready` - Probes (ignored by the default `IGNORE_PATHS`)
//! - everything else - Echo handler standing in for the protected upstream

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Build the application router with the gate wrapping every route,
/// including the fallback.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .fallback(handlers::echo);

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================

    // 1. Request body size limit
    info!(
        max_size_bytes = config.max_request_body_size,
        "Request body size limit configured"
    );
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));

    // 2. API key gate
    router = router.layer(state.gate.clone());

    // 3. Tracing (outermost, so rejections are logged too)
    router = router.layer(TraceLayer::new_for_http());

    router.with_state(state)
}
