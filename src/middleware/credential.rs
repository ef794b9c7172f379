//! Credential extraction and allow-list validation.
//!
//! # Extraction Modes
//!
//! Exactly one source is consulted per gate, never a fallback chain:
//!
//! - **Named header** (default `X-API-Key`): the raw header value
//! - **Authorization**: the remainder of `Authorization: Bearer <key>`
//!
//! ```bash
//! curl -H "X-API-Key: sk-live-123" http://localhost:3000/orders
//! curl -H "Authorization: Bearer sk-live-123" http://localhost:3000/orders
//! ```
//!
//! Values are used as-is: no trimming, no case folding, first value only.

use std::fmt;

use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, HeaderName};
use subtle::{Choice, ConstantTimeEq};

/// Header consulted when no header name is configured.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Prefix required on the `Authorization` header (case-sensitive).
pub const BEARER_PREFIX: &str = "Bearer ";

/// Where a gate looks for the presented API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// `Authorization: Bearer <key>`
    Authorization,
    /// Raw value of the named header.
    Header(HeaderName),
}

impl CredentialSource {
    /// Scheme advertised in `WWW-Authenticate` on 401 responses.
    pub fn challenge(&self) -> &'static str {
        match self {
            CredentialSource::Authorization => "Bearer",
            CredentialSource::Header(_) => "API-Key",
        }
    }
}

/// Extract the presented API key.
///
/// Returns `None` when the header is absent, empty, not valid visible ASCII,
/// or (in Authorization mode) lacks the `Bearer ` prefix.
pub fn extract_api_key<'a>(headers: &'a HeaderMap, source: &CredentialSource) -> Option<&'a str> {
    let key = match source {
        CredentialSource::Authorization => headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))?,
        CredentialSource::Header(name) => headers.get(name).and_then(|v| v.to_str().ok())?,
    };

    (!key.is_empty()).then_some(key)
}

/// The configured set of valid API keys.
#[derive(Clone)]
pub struct AllowList {
    keys: Vec<String>,
}

impl fmt::Debug for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowList")
            .field("keys", &format_args!("<{} redacted>", self.keys.len()))
            .finish()
    }
}

impl AllowList {
    /// Build an allow-list, dropping duplicates and empty entries.
    pub fn new<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for key in keys {
            if !key.is_empty() && !unique.contains(&key) {
                unique.push(key);
            }
        }
        Self { keys: unique }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Check membership without short-circuiting on the first match.
    ///
    /// Every configured key is compared in constant time so response timing
    /// does not reveal which key (or how much of it) was matched.
    pub fn contains(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }

        self.keys
            .iter()
            .fold(Choice::from(0), |found, key| {
                found | candidate.as_bytes().ct_eq(key.as_bytes())
            })
            .into()
    }
}
