//! Fuzz testing for the gate's decision path.
//!
//! Feeds arbitrary pattern sources, paths and header values through pattern
//! compilation, path classification and credential extraction. The gate
//! must never panic: bad patterns are dropped, undecodable header values are
//! treated as absent.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_gate -- -max_total_time=60
//! ```

#![no_main]

use arbitrary::Arbitrary;
use axum::body::Body;
use axum::http::{HeaderValue, Request};
use libfuzzer_sys::fuzz_target;

use keygate::middleware::PathPatterns;
use keygate::{ApiKeyGate, GateConfig};

#[derive(Debug, Arbitrary)]
struct Input {
    pattern: String,
    path: String,
    header_value: Vec<u8>,
    use_authorization: bool,
}

fuzz_target!(|input: Input| {
    // Pattern compilation never fails as a whole
    let patterns = PathPatterns::compile("fuzz", [input.pattern.as_str()]);
    let _ = patterns.matches_any(&input.path);

    let Ok(gate) = ApiKeyGate::new(GateConfig {
        valid_api_keys: vec!["sk-fuzz".to_string()],
        use_authorization: input.use_authorization,
        ignore_paths: vec![input.pattern.clone()],
        block_paths: vec!["^/block".to_string()],
        ..GateConfig::default()
    }) else {
        return;
    };

    let Ok(mut req) = Request::builder()
        .uri(format!("/{}", input.path.trim_start_matches('/')))
        .body(Body::empty())
    else {
        return;
    };

    if let Ok(value) = HeaderValue::from_bytes(&input.header_value) {
        req.headers_mut().insert("x-api-key", value.clone());
        req.headers_mut().insert("authorization", value);
    }

    let _ = gate.decide(&req);
});
