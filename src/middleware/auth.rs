//! API key gate middleware.
//!
//! # Decision Sequence
//!
//! Every request gets exactly one pass and exactly one outcome:
//!
//! ```text
//! path matches ignore?  ── yes ──▶ forward unchanged          (Ignored)
//!        │ no
//! path matches block?   ── yes ──▶ 403 Forbidden              (Blocked)
//!        │ no
//! credential present?   ── no  ──▶ 401 Unauthorized           (MissingCredential)
//!        │ yes
//! credential allowed?   ── no  ──▶ 401 Unauthorized           (InvalidCredential)
//!        │ yes
//! strip header (if configured) ──▶ forward                    (Authorized)
//! ```
//!
//! Ignore is always evaluated before block. The two lists are never merged,
//! so a path in both is forwarded.
//!
//! # Header Stripping
//!
//! With `remove_header` set, the configured credential header is removed on
//! the Authorized path before the downstream service sees the request. Only
//! the named header is ever removed: in Authorization mode the
//! `Authorization` header is forwarded untouched.
//!
//! # Usage
//!
//! ```rust,ignore
//! let gate = ApiKeyGate::new(GateConfig {
//!     valid_api_keys: vec!["sk-live-123".to_string()],
//!     ignore_paths: vec!["^/health$".to_string()],
//!     ..GateConfig::default()
//! })?;
//! let app = Router::new().route("/orders", get(list_orders)).layer(gate);
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::header::HeaderName;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{debug, info, warn};

use super::credential::{AllowList, CredentialSource, DEFAULT_API_KEY_HEADER, extract_api_key};
use super::paths::{PathPatterns, decoded_path};
use crate::config::GateConfig;
use crate::error::GateError;
use crate::metrics;

/// Body of the 403 response for blocked paths.
pub const BLOCKED_MESSAGE: &str = "Access to this path is blocked";

/// Body of the 401 response when no credential could be extracted.
pub const MISSING_KEY_MESSAGE: &str = "API key is missing or not provided correctly";

/// Body of the 401 response when the credential is not in the allow-list.
pub const INVALID_KEY_MESSAGE: &str = "Invalid API Key";

/// Terminal outcome of the gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Ignored,
    Blocked,
    MissingCredential,
    InvalidCredential,
    Authorized,
}

impl GateDecision {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateDecision::Ignored => "ignored",
            GateDecision::Blocked => "blocked",
            GateDecision::MissingCredential => "missing_credential",
            GateDecision::InvalidCredential => "invalid_credential",
            GateDecision::Authorized => "authorized",
        }
    }

    /// Whether the downstream service is invoked for this outcome.
    pub fn forwards(&self) -> bool {
        matches!(self, GateDecision::Ignored | GateDecision::Authorized)
    }
}

/// Compiled, read-only gate state shared by every service clone.
#[derive(Debug)]
struct GateState {
    /// Effective configuration (header name defaulted)
    config: GateConfig,
    /// Named credential header, eligible for stripping
    api_key_header: HeaderName,
    source: CredentialSource,
    allow_list: AllowList,
    ignore: PathPatterns,
    block: PathPatterns,
}

/// API key gate layer.
///
/// Cheap to clone: all state lives behind an `Arc` and is never written
/// after construction.
#[derive(Clone, Debug)]
pub struct ApiKeyGate {
    state: Arc<GateState>,
}

impl ApiKeyGate {
    /// Validate `config` and compile its path patterns.
    ///
    /// # Errors
    ///
    /// - `GateError::NoValidKeys` if the allow-list is empty
    /// - `GateError::InvalidHeaderName` if the credential header name is not
    ///   a legal HTTP header name
    ///
    /// Invalid ignore/block patterns are logged and dropped, never fatal.
    pub fn new(mut config: GateConfig) -> Result<Self, GateError> {
        let allow_list = AllowList::new(config.valid_api_keys.iter().cloned());
        if allow_list.is_empty() {
            warn!("No valid API keys provided in gate configuration");
            return Err(GateError::NoValidKeys);
        }

        if config.api_key_header.is_empty() {
            config.api_key_header = DEFAULT_API_KEY_HEADER.to_string();
        }
        let api_key_header = HeaderName::from_bytes(config.api_key_header.as_bytes())
            .map_err(|_| GateError::InvalidHeaderName(config.api_key_header.clone()))?;

        let source = if config.use_authorization {
            CredentialSource::Authorization
        } else {
            CredentialSource::Header(api_key_header.clone())
        };

        let ignore = PathPatterns::compile("ignore", &config.ignore_paths);
        let block = PathPatterns::compile("block", &config.block_paths);
        metrics::record_rejected_patterns("ignore", ignore.rejected().len() as u64);
        metrics::record_rejected_patterns("block", block.rejected().len() as u64);

        info!(
            keys = allow_list.len(),
            header = %api_key_header,
            use_authorization = config.use_authorization,
            remove_header = config.remove_header,
            ignore_patterns = ignore.len(),
            block_patterns = block.len(),
            rejected_patterns = ignore.rejected().len() + block.rejected().len(),
            "API key gate configured"
        );

        Ok(Self {
            state: Arc::new(GateState {
                config,
                api_key_header,
                source,
                allow_list,
                ignore,
                block,
            }),
        })
    }

    /// Build a gate from configuration that may be absent.
    ///
    /// # Errors
    ///
    /// Returns `GateError::MissingConfig` for `None`, otherwise as [`ApiKeyGate::new`].
    pub fn from_optional(config: Option<GateConfig>) -> Result<Self, GateError> {
        match config {
            Some(config) => Self::new(config),
            None => {
                warn!("API key gate configuration is absent");
                Err(GateError::MissingConfig)
            }
        }
    }

    /// Classify a request without side effects.
    ///
    /// Patterns see the percent-decoded path, the same path the downstream
    /// routes on.
    pub fn decide<B>(&self, req: &Request<B>) -> GateDecision {
        let state = &self.state;
        let path = decoded_path(req.uri().path());

        if state.ignore.matches_any(&path) {
            return GateDecision::Ignored;
        }

        if state.block.matches_any(&path) {
            return GateDecision::Blocked;
        }

        match extract_api_key(req.headers(), &state.source) {
            None => GateDecision::MissingCredential,
            Some(key) if state.allow_list.contains(key) => GateDecision::Authorized,
            Some(_) => GateDecision::InvalidCredential,
        }
    }

    /// Effective configuration, with the header name defaulted.
    pub fn config(&self) -> &GateConfig {
        &self.state.config
    }

    pub fn ignore_patterns(&self) -> &PathPatterns {
        &self.state.ignore
    }

    pub fn block_patterns(&self) -> &PathPatterns {
        &self.state.block
    }

    /// Header removed on the Authorized path, if stripping is enabled.
    fn header_to_strip(&self) -> Option<&HeaderName> {
        self.state
            .config
            .remove_header
            .then_some(&self.state.api_key_header)
    }

    /// Build the rejection response for a non-forwarding decision.
    fn rejection(&self, decision: GateDecision) -> Response<Body> {
        let challenge = self.state.source.challenge();
        match decision {
            GateDecision::Blocked => forbidden_response(BLOCKED_MESSAGE),
            GateDecision::InvalidCredential => {
                unauthorized_response(INVALID_KEY_MESSAGE, challenge)
            }
            _ => unauthorized_response(MISSING_KEY_MESSAGE, challenge),
        }
    }
}

impl<S> Layer<S> for ApiKeyGate {
    type Service = ApiKeyGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyGateService {
            inner,
            gate: self.clone(),
        }
    }
}

/// API key gate service wrapper.
#[derive(Clone)]
pub struct ApiKeyGateService<S> {
    inner: S,
    gate: ApiKeyGate,
}

impl<S> Service<Request<Body>> for ApiKeyGateService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let decision = self.gate.decide(&req);
        metrics::record_gate_decision(decision.as_str());

        match decision {
            GateDecision::Ignored => {
                debug!(path = %req.uri().path(), "Path ignored, skipping API key check");
            }
            GateDecision::Authorized => {
                if let Some(header) = self.gate.header_to_strip() {
                    req.headers_mut().remove(header);
                }
                debug!(path = %req.uri().path(), "API key authentication successful");
            }
            GateDecision::Blocked
            | GateDecision::MissingCredential
            | GateDecision::InvalidCredential => {
                warn!(
                    method = %req.method(),
                    path = %req.uri().path(),
                    outcome = decision.as_str(),
                    "Request rejected by API key gate"
                );
                let response = self.gate.rejection(decision);
                return Box::pin(async move { Ok(response) });
            }
        }

        // The clone may not be ready; hand the polled service to this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let started = Instant::now();

        Box::pin(async move {
            let response = inner.call(req).await?;
            metrics::record_request_duration(
                decision.as_str(),
                response.status().as_str(),
                started.elapsed().as_secs_f64(),
            );
            Ok(response)
        })
    }
}

/// Build a forbidden (403) plain-text response.
fn forbidden_response(message: &str) -> Response<Body> {
    (
        StatusCode::FORBIDDEN,
        [
            ("Content-Type", "text/plain; charset=utf-8"),
            ("X-Content-Type-Options", "nosniff"),
        ],
        format!("{message}\n"),
    )
        .into_response()
}

/// Build an unauthorized (401) plain-text response.
fn unauthorized_response(message: &str, challenge: &'static str) -> Response<Body> {
    (
        StatusCode::UNAUTHORIZED,
        [
            ("WWW-Authenticate", challenge),
            ("Content-Type", "text/plain; charset=utf-8"),
            ("X-Content-Type-Options", "nosniff"),
        ],
        format!("{message}\n"),
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::to_bytes;
    use tower::{ServiceExt, service_fn};

    const VALID_KEY: &str = "sk-valid-key-sample";

    fn sample_config() -> GateConfig {
        GateConfig {
            valid_api_keys: vec![VALID_KEY.to_string()],
            api_key_header: "X-API-Key".to_string(),
            use_authorization: false,
            ignore_paths: vec!["/ignore".to_string()],
            block_paths: vec!["/block.*".to_string()],
            remove_header: true,
        }
    }

    fn request(path: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(path);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).unwrap()
    }

    /// Run `req` through the gate in front of a downstream that counts calls
    /// and reports whether it saw `X-API-Key` and `Authorization`.
    async fn run(gate: &ApiKeyGate, req: Request<Body>) -> (Response<Body>, usize) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let downstream = service_fn(move |req: Request<Body>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let saw_key = req.headers().contains_key("x-api-key");
                let saw_auth = req.headers().contains_key("authorization");
                let response = Response::builder()
                    .status(StatusCode::OK)
                    .header("x-saw-api-key", saw_key.to_string())
                    .header("x-saw-authorization", saw_auth.to_string())
                    .body(Body::from("downstream"))
                    .unwrap();
                Ok::<_, Infallible>(response)
            }
        });

        let response = gate.layer(downstream).oneshot(req).await.unwrap();
        (response, calls.load(Ordering::SeqCst))
    }

    fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
        response.headers().get(name).unwrap().to_str().unwrap()
    }

    #[test]
    fn test_new_rejects_empty_allow_list() {
        let config = GateConfig {
            valid_api_keys: vec![],
            ..sample_config()
        };
        assert_eq!(ApiKeyGate::new(config).unwrap_err(), GateError::NoValidKeys);
    }

    #[test]
    fn test_new_rejects_allow_list_of_empty_strings() {
        let config = GateConfig {
            valid_api_keys: vec![String::new()],
            ..sample_config()
        };
        assert_eq!(ApiKeyGate::new(config).unwrap_err(), GateError::NoValidKeys);
    }

    #[test]
    fn test_from_optional_none_is_missing_config() {
        assert_eq!(
            ApiKeyGate::from_optional(None).unwrap_err(),
            GateError::MissingConfig
        );
    }

    #[test]
    fn test_from_optional_some_builds() {
        assert!(ApiKeyGate::from_optional(Some(sample_config())).is_ok());
    }

    #[test]
    fn test_new_defaults_header_name() {
        let config = GateConfig {
            api_key_header: String::new(),
            ..sample_config()
        };
        let gate = ApiKeyGate::new(config).unwrap();
        assert_eq!(gate.config().api_key_header, DEFAULT_API_KEY_HEADER);
    }

    #[test]
    fn test_new_rejects_illegal_header_name() {
        let config = GateConfig {
            api_key_header: "X API Key".to_string(),
            ..sample_config()
        };
        assert_eq!(
            ApiKeyGate::new(config).unwrap_err(),
            GateError::InvalidHeaderName("X API Key".to_string())
        );
    }

    #[test]
    fn test_new_tolerates_invalid_patterns() {
        let config = GateConfig {
            ignore_paths: vec!["(".to_string(), "/ignore".to_string()],
            block_paths: vec!["[".to_string()],
            ..sample_config()
        };
        let gate = ApiKeyGate::new(config).unwrap();

        assert_eq!(gate.ignore_patterns().len(), 1);
        assert_eq!(gate.ignore_patterns().rejected().len(), 1);
        assert!(gate.block_patterns().is_empty());
        assert_eq!(gate.decide(&request("/ignore", &[])), GateDecision::Ignored);
        assert_eq!(
            gate.decide(&request("/block1", &[])),
            GateDecision::MissingCredential
        );
    }

    #[test]
    fn test_decide_sequence() {
        let gate = ApiKeyGate::new(sample_config()).unwrap();

        assert_eq!(gate.decide(&request("/ignore", &[])), GateDecision::Ignored);
        assert_eq!(gate.decide(&request("/block1", &[])), GateDecision::Blocked);
        assert_eq!(
            gate.decide(&request("/block1", &[("X-API-Key", VALID_KEY)])),
            GateDecision::Blocked
        );
        assert_eq!(
            gate.decide(&request("/normal", &[])),
            GateDecision::MissingCredential
        );
        assert_eq!(
            gate.decide(&request("/normal", &[("X-API-Key", "invalid-key")])),
            GateDecision::InvalidCredential
        );
        assert_eq!(
            gate.decide(&request("/normal", &[("X-API-Key", VALID_KEY)])),
            GateDecision::Authorized
        );
    }

    #[test]
    fn test_ignore_takes_precedence_over_block() {
        let config = GateConfig {
            ignore_paths: vec!["^/shared".to_string()],
            block_paths: vec!["^/shared".to_string()],
            ..sample_config()
        };
        let gate = ApiKeyGate::new(config).unwrap();
        assert_eq!(gate.decide(&request("/shared/x", &[])), GateDecision::Ignored);
    }

    #[test]
    fn test_decide_ignores_query_string() {
        let gate = ApiKeyGate::new(sample_config()).unwrap();
        assert_eq!(
            gate.decide(&request("/normal?path=/ignore", &[])),
            GateDecision::MissingCredential
        );
    }

    #[test]
    fn test_percent_encoded_paths_are_classified_decoded() {
        let gate = ApiKeyGate::new(sample_config()).unwrap();
        assert_eq!(
            gate.decide(&request("/%62lock1", &[("X-API-Key", VALID_KEY)])),
            GateDecision::Blocked
        );
        assert_eq!(gate.decide(&request("/%69gnore", &[])), GateDecision::Ignored);
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(GateDecision::Ignored.as_str(), "ignored");
        assert_eq!(GateDecision::Blocked.as_str(), "blocked");
        assert_eq!(GateDecision::MissingCredential.as_str(), "missing_credential");
        assert_eq!(GateDecision::InvalidCredential.as_str(), "invalid_credential");
        assert_eq!(GateDecision::Authorized.as_str(), "authorized");
        assert!(GateDecision::Ignored.forwards());
        assert!(GateDecision::Authorized.forwards());
        assert!(!GateDecision::Blocked.forwards());
    }

    #[tokio::test]
    async fn test_ignored_path_forwards_unchanged() {
        let gate = ApiKeyGate::new(sample_config()).unwrap();
        let (response, calls) = run(&gate, request("/ignore", &[("X-API-Key", "anything")])).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls, 1);
        // Ignored requests are never stripped
        assert_eq!(header(&response, "x-saw-api-key"), "true");
    }

    #[tokio::test]
    async fn test_blocked_path_returns_403() {
        let gate = ApiKeyGate::new(sample_config()).unwrap();
        let (response, calls) = run(&gate, request("/block1", &[])).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls, 0);
        assert_eq!(header(&response, "content-type"), "text/plain; charset=utf-8");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, "Access to this path is blocked\n");
    }

    #[tokio::test]
    async fn test_valid_key_strips_header() {
        let gate = ApiKeyGate::new(sample_config()).unwrap();
        let (response, calls) = run(&gate, request("/normal", &[("X-API-Key", VALID_KEY)])).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls, 1);
        assert_eq!(header(&response, "x-saw-api-key"), "false");
    }

    #[tokio::test]
    async fn test_valid_key_kept_when_stripping_disabled() {
        let config = GateConfig {
            remove_header: false,
            ..sample_config()
        };
        let gate = ApiKeyGate::new(config).unwrap();
        let (response, calls) = run(&gate, request("/normal", &[("X-API-Key", VALID_KEY)])).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls, 1);
        assert_eq!(header(&response, "x-saw-api-key"), "true");
    }

    #[tokio::test]
    async fn test_invalid_key_returns_401() {
        let gate = ApiKeyGate::new(sample_config()).unwrap();
        let (response, calls) = run(&gate, request("/normal", &[("X-API-Key", "invalid-key")])).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls, 0);
        assert_eq!(header(&response, "www-authenticate"), "API-Key");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, "Invalid API Key\n");
    }

    #[tokio::test]
    async fn test_missing_key_returns_401() {
        let gate = ApiKeyGate::new(sample_config()).unwrap();
        let (response, calls) = run(&gate, request("/normal", &[])).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls, 0);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, "API key is missing or not provided correctly\n");
    }

    #[tokio::test]
    async fn test_authorization_mode_accepts_bearer() {
        let config = GateConfig {
            use_authorization: true,
            ..sample_config()
        };
        let gate = ApiKeyGate::new(config).unwrap();
        let auth = format!("Bearer {VALID_KEY}");
        let (response, calls) = run(&gate, request("/normal", &[("Authorization", &auth)])).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls, 1);
        // Authorization is never stripped, even with remove_header set
        assert_eq!(header(&response, "x-saw-authorization"), "true");
    }

    #[tokio::test]
    async fn test_authorization_mode_without_prefix_is_missing() {
        let config = GateConfig {
            use_authorization: true,
            ..sample_config()
        };
        let gate = ApiKeyGate::new(config).unwrap();
        let (response, calls) = run(&gate, request("/normal", &[("Authorization", VALID_KEY)])).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls, 0);
        assert_eq!(header(&response, "www-authenticate"), "Bearer");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, "API key is missing or not provided correctly\n");
    }

    #[tokio::test]
    async fn test_authorization_mode_strips_named_header_only() {
        let config = GateConfig {
            use_authorization: true,
            ..sample_config()
        };
        let gate = ApiKeyGate::new(config).unwrap();
        let auth = format!("Bearer {VALID_KEY}");
        let (response, _) = run(
            &gate,
            request("/normal", &[("Authorization", &auth), ("X-API-Key", "unused")]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-saw-api-key"), "false");
        assert_eq!(header(&response, "x-saw-authorization"), "true");
    }

    #[tokio::test]
    async fn test_authorization_mode_ignores_named_header() {
        let config = GateConfig {
            use_authorization: true,
            ..sample_config()
        };
        let gate = ApiKeyGate::new(config).unwrap();
        let (response, calls) = run(&gate, request("/normal", &[("X-API-Key", VALID_KEY)])).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_gate_is_shareable_across_tasks() {
        let gate = ApiKeyGate::new(sample_config()).unwrap();
        let mut handles = Vec::new();

        for i in 0..16 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                let key = if i % 2 == 0 { VALID_KEY } else { "nope" };
                let (response, _) = run(&gate, request("/normal", &[("X-API-Key", key)])).await;
                (i, response.status())
            }));
        }

        for handle in handles {
            let (i, status) = handle.await.unwrap();
            let expected = if i % 2 == 0 {
                StatusCode::OK
            } else {
                StatusCode::UNAUTHORIZED
            };
            assert_eq!(status, expected);
        }
    }
}
