//! Path classification against ordered regular-expression lists.
//!
//! # Matching Semantics
//!
//! Each pattern is tested with unanchored "contains a match" semantics
//! against the percent-decoded request path (query excluded):
//!
//! - `/block.*` matches `/block1` and also `/api/block`
//! - `/block.*` matches `/%62lock1`, which the upstream serves as `/block1`
//! - `^/health$` matches `/health` but not `/health/` or `/v1/health`
//!
//! Anchor patterns explicitly when a full-path match is intended.
//!
//! # Lenient Compilation
//!
//! A pattern that fails to compile is logged and dropped. The remaining
//! patterns still apply, so one typo cannot disable the whole list.

use std::borrow::Cow;

use regex::Regex;
use tracing::warn;

/// A pattern source string that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedPattern {
    /// The source string as configured
    pub source: String,
    /// Compiler error message
    pub reason: String,
}

/// Ordered list of compiled path patterns.
#[derive(Debug, Clone, Default)]
pub struct PathPatterns {
    compiled: Vec<Regex>,
    rejected: Vec<RejectedPattern>,
}

impl PathPatterns {
    /// Compile pattern sources in order, skipping any that are invalid.
    ///
    /// `list` names the list in log output (e.g. "ignore", "block").
    pub fn compile<I, S>(list: &str, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Self::default();

        for source in sources {
            let source = source.as_ref();
            match Regex::new(source) {
                Ok(re) => patterns.compiled.push(re),
                Err(e) => {
                    warn!(
                        list,
                        pattern = source,
                        error = %e,
                        "Dropping path pattern that failed to compile"
                    );
                    patterns.rejected.push(RejectedPattern {
                        source: source.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        patterns
    }

    /// Returns true if `path` contains a match for any pattern.
    #[inline]
    pub fn matches_any(&self, path: &str) -> bool {
        matches_any(path, &self.compiled)
    }

    /// Number of patterns that compiled successfully.
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Source strings of the patterns in effect, in evaluation order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.compiled.iter().map(Regex::as_str)
    }

    /// Patterns dropped at compile time.
    pub fn rejected(&self) -> &[RejectedPattern] {
        &self.rejected
    }
}

/// Test `path` against `patterns` in order, stopping at the first match.
pub fn matches_any(path: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|re| re.is_match(path))
}

/// Percent-decode a URI path for matching.
///
/// Paths whose decoded bytes are not valid UTF-8 are matched as sent.
pub fn decoded_path(path: &str) -> Cow<'_, str> {
    urlencoding::decode(path).unwrap_or(Cow::Borrowed(path))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_path() {
        assert_eq!(decoded_path("/normal"), "/normal");
        assert_eq!(decoded_path("/%62lock1"), "/block1");
        assert_eq!(decoded_path("/a%20b"), "/a b");
        // `+` is only a space in form bodies
        assert_eq!(decoded_path("/a+b"), "/a+b");
    }

    #[test]
    fn test_decoded_path_keeps_invalid_utf8_as_sent() {
        assert_eq!(decoded_path("/%ff%fe"), "/%ff%fe");
    }

    #[test]
    fn test_empty_patterns_never_match() {
        let patterns = PathPatterns::compile("ignore", Vec::<String>::new());
        assert!(patterns.is_empty());
        assert!(!patterns.matches_any("/"));
        assert!(!patterns.matches_any(""));
    }

    #[test]
    fn test_unanchored_substring_match() {
        let patterns = PathPatterns::compile("block", ["/block.*"]);
        assert!(patterns.matches_any("/block1"));
        assert!(patterns.matches_any("/api/block"));
        assert!(!patterns.matches_any("/normal"));
    }

    #[test]
    fn test_anchored_pattern_requires_full_match() {
        let patterns = PathPatterns::compile("ignore", ["^/health$"]);
        assert!(patterns.matches_any("/health"));
        assert!(!patterns.matches_any("/health/"));
        assert!(!patterns.matches_any("/v1/health"));
    }

    #[test]
    fn test_any_pattern_in_list_matches() {
        let patterns = PathPatterns::compile("ignore", ["^/public/", "\\.css$", "^/ready$"]);
        assert!(patterns.matches_any("/public/index.html"));
        assert!(patterns.matches_any("/assets/site.css"));
        assert!(patterns.matches_any("/ready"));
        assert!(!patterns.matches_any("/private/data"));
    }

    #[test]
    fn test_invalid_pattern_is_dropped_others_kept() {
        let patterns = PathPatterns::compile("block", ["/admin", "([unclosed", "/internal"]);

        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns.rejected().len(), 1);
        assert_eq!(patterns.rejected()[0].source, "([unclosed");
        assert!(!patterns.rejected()[0].reason.is_empty());

        assert!(patterns.matches_any("/admin/users"));
        assert!(patterns.matches_any("/internal"));
    }

    #[test]
    fn test_all_invalid_patterns_yield_empty_list() {
        let patterns = PathPatterns::compile("block", ["(", "[", "*"]);
        assert!(patterns.is_empty());
        assert_eq!(patterns.rejected().len(), 3);
        assert!(!patterns.matches_any("("));
    }

    #[test]
    fn test_sources_preserve_order() {
        let patterns = PathPatterns::compile("ignore", ["^/b", "(", "^/a"]);
        let sources: Vec<&str> = patterns.sources().collect();
        assert_eq!(sources, vec!["^/b", "^/a"]);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let patterns = PathPatterns::compile("ignore", ["/ignore"]);
        for _ in 0..3 {
            assert!(patterns.matches_any("/ignore"));
            assert!(!patterns.matches_any("/other"));
        }
    }

    #[test]
    fn test_free_function_matches_any() {
        let compiled = vec![Regex::new("^/x").unwrap(), Regex::new("/y$").unwrap()];
        assert!(matches_any("/x/1", &compiled));
        assert!(matches_any("/a/y", &compiled));
        assert!(!matches_any("/z", &compiled));
        assert!(!matches_any("/z", &[]));
    }
}
