use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status ("healthy")
    pub status: String,
    /// Application version
    pub version: String,
    /// Gate mode: "authorization" or "header"
    pub credential_source: String,
    /// Seconds since the server started
    pub uptime_seconds: u64,
    /// Response timestamp
    pub timestamp: DateTime<Utc>,
}

/// Request as observed by the downstream echo handler.
///
/// Headers are reported after the gate has run, so a stripped credential
/// header is absent here.
#[derive(Debug, Serialize, Deserialize)]
pub struct EchoResponse {
    /// HTTP method
    pub method: String,
    /// Request path (no query string)
    pub path: String,
    /// Header names (lowercase) to their first value; non-text values are omitted
    pub headers: BTreeMap<String, String>,
}
