//! Application configuration loaded from environment variables.
//!
//! # Gate Configuration
//!
//! - `VALID_API_KEYS`: Comma-separated allow-list. When unset, the gate
//!   configuration is absent and the server refuses to start.
//! - `API_KEY_HEADER`: Header carrying the key (default: `X-API-Key`)
//! - `USE_AUTHORIZATION`: Read `Authorization: Bearer <key>` instead (default: false)
//! - `IGNORE_PATHS`: Comma-separated regexes that bypass the gate
//!   (default: `^/health$,^/ready$`)
//! - `BLOCK_PATHS`: Comma-separated regexes that are always denied (default: none)
//! - `REMOVE_HEADER`: Strip the key header before forwarding (default: false)
//!
//! Path patterns are regular expressions, so they cannot contain a literal
//! comma when supplied through the environment.
//!
//! # Server Configuration
//!
//! - `HOST` / `PORT`: Listen address (default: `0.0.0.0:3000`)
//! - `MAX_REQUEST_BODY_SIZE`: Maximum request body in bytes (default: 10MB)
//! - `METRICS_PORT`: Prometheus listener port, 0 disables (default: 9090)

use std::env;
use std::fmt;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::credential::DEFAULT_API_KEY_HEADER;

/// Ignore list used when `IGNORE_PATHS` is unset: the probe endpoints.
pub const DEFAULT_IGNORE_PATHS: &str = "^/health$,^/ready$";

/// Configuration for a single API key gate.
///
/// Immutable once handed to [`ApiKeyGate::new`](crate::middleware::ApiKeyGate::new).
/// Deserializable so hosts can embed it in their own config files.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GateConfig {
    /// Allow-list of valid API keys (must be non-empty)
    pub valid_api_keys: Vec<String>,

    /// Header carrying the key when `use_authorization` is false
    pub api_key_header: String,

    /// Read the key from `Authorization: Bearer <key>`
    pub use_authorization: bool,

    /// Path patterns that bypass the gate entirely
    pub ignore_paths: Vec<String>,

    /// Path patterns that are always rejected with 403
    pub block_paths: Vec<String>,

    /// Remove the key header before forwarding authorized requests
    pub remove_header: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            valid_api_keys: Vec::new(),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            use_authorization: false,
            ignore_paths: Vec::new(),
            block_paths: Vec::new(),
            remove_header: false,
        }
    }
}

// Keys never reach logs through `{:?}`.
impl fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateConfig")
            .field(
                "valid_api_keys",
                &format_args!("<{} redacted>", self.valid_api_keys.len()),
            )
            .field("api_key_header", &self.api_key_header)
            .field("use_authorization", &self.use_authorization)
            .field("ignore_paths", &self.ignore_paths)
            .field("block_paths", &self.block_paths)
            .field("remove_header", &self.remove_header)
            .finish()
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Maximum request body size in bytes (default: 10MB)
    pub max_request_body_size: usize,

    // =========================================================================
    // Gate Configuration
    // =========================================================================
    /// API key gate settings; `None` when `VALID_API_KEYS` is unset
    pub gate: Option<GateConfig>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value is malformed
    /// (e.g., non-numeric PORT, non-boolean USE_AUTHORIZATION).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// `lookup` returns the raw value of a variable, or `None` when unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            // Server
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", 3000)?,
            max_request_body_size: parse_var(&lookup, "MAX_REQUEST_BODY_SIZE", 10 * 1024 * 1024)?, // 10MB

            // Gate
            gate: Self::gate_from_lookup(&lookup)?,

            // Observability
            metrics_port: parse_var(&lookup, "METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Read the gate section. Absent (not empty) when `VALID_API_KEYS` is unset.
    fn gate_from_lookup<F>(lookup: &F) -> AppResult<Option<GateConfig>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(keys) = lookup("VALID_API_KEYS") else {
            return Ok(None);
        };

        Ok(Some(GateConfig {
            valid_api_keys: split_list(&keys),
            api_key_header: lookup("API_KEY_HEADER")
                .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
            use_authorization: parse_var(lookup, "USE_AUTHORIZATION", false)?,
            ignore_paths: split_list(
                &lookup("IGNORE_PATHS").unwrap_or_else(|| DEFAULT_IGNORE_PATHS.to_string()),
            ),
            block_paths: split_list(&lookup("BLOCK_PATHS").unwrap_or_default()),
            remove_header: parse_var(lookup, "REMOVE_HEADER", false)?,
        }))
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> AppResult<()> {
        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        self.metrics_enabled()
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }
}

/// Parse a variable into the specified type, falling back to `default` when unset.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_request_body_size: 10 * 1024 * 1024, // 10MB
            gate: None,
            metrics_port: 9090,
        }
    }
}
