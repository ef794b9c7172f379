//! API key gate middleware.
//!
//! The gate is built from three independent pieces plus the layer that
//! orders them:
//!
//! - **Path classification** ([`paths`]): ordered regex lists for ignore/block
//! - **Credential extraction & validation** ([`credential`]): named header or
//!   `Authorization: Bearer`, constant-time allow-list membership
//! - **Request gate** ([`auth`]): Tower layer applying the decision sequence
//!
//! # Architecture
//!
//! ```text
//! Request → Ignore? → Block? → Extract → Validate → Strip → Handler → Response
//!              ↓         ↓         ↓          ↓
//!           forward     403       401        401
//! ```

pub mod auth;
pub mod credential;
pub mod paths;

pub use auth::{ApiKeyGate, ApiKeyGateService, GateDecision};
pub use credential::{
    AllowList, BEARER_PREFIX, CredentialSource, DEFAULT_API_KEY_HEADER, extract_api_key,
};
pub use paths::{PathPatterns, RejectedPattern, decoded_path, matches_any};
