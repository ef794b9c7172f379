//! # keygate
//!
//! API key gatekeeping middleware for Axum/Tower request chains.
//!
//! For every request the gate decides, in a single pass, to:
//!
//! - **forward** it untouched (path matches an ignore pattern),
//! - **reject** it outright with 403 (path matches a block pattern), or
//! - **validate** the presented API key and forward (optionally stripping the
//!   key header) or reject with 401.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Host (Axum router / gateway)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ApiKeyGate (tower::Layer)                                  │
//! │    ├── PathPatterns      ignore / block regex lists         │
//! │    ├── extract_api_key   X-API-Key or Authorization: Bearer │
//! │    └── AllowList         constant-time membership           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Downstream service                                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use keygate::{ApiKeyGate, GateConfig};
//!
//! # fn main() -> Result<(), keygate::GateError> {
//! let gate = ApiKeyGate::new(GateConfig {
//!     valid_api_keys: vec!["sk-live-123".to_string()],
//!     ignore_paths: vec!["^/health$".to_string()],
//!     block_paths: vec!["^/admin".to_string()],
//!     remove_header: true,
//!     ..GateConfig::default()
//! })?;
//!
//! let app: Router = Router::new()
//!     .route("/health", get(|| async { "ok" }))
//!     .route("/orders", get(|| async { "orders" }))
//!     .layer(gate);
//! # let _ = app;
//! # Ok(())
//! # }
//! ```
//!
//! ## Reference Server
//!
//! The `keygate` binary runs the gate in front of an echo handler:
//! ```bash
//! VALID_API_KEYS=sk-live-123 BLOCK_PATHS='^/admin' REMOVE_HEADER=true cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

// Re-exports for convenience
pub use config::{Config, GateConfig};
pub use error::{AppError, AppResult, GateError};
pub use middleware::{ApiKeyGate, GateDecision};
pub use routes::build_router;
pub use state::AppState;
