//! Downstream echo handler.
//!
//! Stands in for the upstream service the gate protects. It reports the
//! request exactly as it arrived after the gate, which makes header
//! stripping observable from the outside:
//!
//! ```bash
//! curl -H "X-API-Key: sk-live-123" http://localhost:3000/anything
//! # {"method":"GET","path":"/anything","headers":{"host":"localhost:3000",...}}
//! ```

use std::collections::BTreeMap;

use axum::Json;
use axum::http::{HeaderMap, Method, Uri};
use tracing::{debug, instrument};

use crate::models::EchoResponse;

/// Echo the method, path and headers the downstream observed.
#[instrument(skip(headers))]
pub async fn echo(method: Method, uri: Uri, headers: HeaderMap) -> Json<EchoResponse> {
    let mut seen = BTreeMap::new();
    for (name, value) in &headers {
        if let Ok(value) = value.to_str() {
            seen.entry(name.as_str().to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    debug!(headers = seen.len(), "Echoing request");

    Json(EchoResponse {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: seen,
    })
}
