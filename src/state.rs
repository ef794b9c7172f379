//! Shared application state for the reference host's handlers.
//!
//! All fields are read-only after startup and cheap to clone, so the state
//! can be handed to every request without locking.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::AppResult;
use crate::middleware::ApiKeyGate;

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// The gate guarding every route
    pub gate: ApiKeyGate,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    /// Create application state from configuration and a constructed gate.
    pub fn new(config: Config, gate: ApiKeyGate) -> Self {
        Self {
            config: Arc::new(config),
            gate,
            started_at: Instant::now(),
        }
    }

    /// Build the gate from `config.gate` and wrap both into state.
    ///
    /// Fails when the gate section is absent or rejected by
    /// [`ApiKeyGate::new`].
    pub fn from_config(config: Config) -> AppResult<Self> {
        let gate = ApiKeyGate::from_optional(config.gate.clone())?;
        Ok(Self::new(config, gate))
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Label for the gate's credential source, as reported by `/health`.
    pub fn credential_source(&self) -> &'static str {
        if self.gate.config().use_authorization {
            "authorization"
        } else {
            "header"
        }
    }
}
