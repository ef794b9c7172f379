use thiserror::Error;

/// Errors raised while constructing an API key gate.
///
/// These only ever happen once, at startup. A gate that fails to build is
/// never wired into the request path. Request-time outcomes (blocked,
/// missing or invalid key) are responses, not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("gate configuration cannot be absent")]
    MissingConfig,

    /// The allow-list is empty after dropping empty and duplicate keys.
    ///
    /// A list holding only `""` is rejected here rather than accepted as a
    /// gate that can never authorize anyone.
    #[error("no valid API keys provided")]
    NoValidKeys,

    #[error("invalid API key header name '{0}'")]
    InvalidHeaderName(String),
}

/// Host application errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Gate construction failed: {0}")]
    Gate(#[from] GateError),
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
