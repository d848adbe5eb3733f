// src/engine/protect.rs

//! Protected-path matching
//!
//! A protected pattern is an ordered run of path segments. A candidate path
//! is protected when the pattern appears as a segment-aligned suffix of the
//! candidate itself or of any of its ancestors, so a pattern naming a
//! directory shields the entire subtree beneath it. Matching compares whole
//! segments; `config/Foo.cfg` never matches `config/FooBar.cfg`.

use std::path::Path;

/// The fixed set of protected patterns for one reconciliation run
#[derive(Debug, Clone, Default)]
pub struct ProtectedPaths {
    patterns: Vec<Vec<String>>,
}

impl ProtectedPaths {
    /// Build a matcher from pattern strings. Separators are normalized,
    /// empty patterns are dropped.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| split_segments(pattern.as_ref()))
            .filter(|segments| !segments.is_empty())
            .collect();
        Self { patterns }
    }

    /// True when no patterns are configured
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Decide whether a tree-relative candidate path is exempt from deletion
    pub fn is_protected(&self, candidate: &Path) -> bool {
        let segments = split_segments(&candidate.to_string_lossy());
        if segments.is_empty() {
            return false;
        }
        self.patterns
            .iter()
            .any(|pattern| contains_run(&segments, pattern))
    }
}

/// Split a path string into normalized segments, accepting either separator
fn split_segments(path: &str) -> Vec<String> {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(str::to_owned)
        .collect()
}

/// True when the pattern segments appear contiguously in the candidate.
/// A run that ends before the candidate's last segment means an ancestor
/// directory matched, which protects everything beneath it.
fn contains_run(segments: &[String], pattern: &[String]) -> bool {
    segments
        .windows(pattern.len())
        .any(|window| window == pattern)
}
