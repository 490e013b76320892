//! The external semantic-equivalence oracle contract.
//!
//! The oracle itself (LLM client, prompt rendering, transport) lives
//! outside this crate; the redundancy analyzer only consumes the trait.
//! Any failure or malformed verdict must resolve to "not a duplicate"
//! for that one pair.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

use crate::core::{Language, Result};

/// One function body plus the light metadata the oracle sees.
#[derive(Debug, Clone, Serialize)]
pub struct Snippet {
    pub name: String,
    pub file: PathBuf,
    pub language: Language,
    pub body: String,
}

/// The oracle's structured answer for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub are_duplicates: bool,
    pub reason: String,
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl Verdict {
    pub fn negative(reason: impl Into<String>) -> Self {
        Self {
            are_duplicates: false,
            reason: reason.into(),
            suggestion: None,
        }
    }

    /// Parse a raw oracle response. Malformed responses are negative
    /// verdicts, never errors.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw)
            .unwrap_or_else(|_| Self::negative("unparseable oracle response"))
    }
}

/// Judges whether two snippets are semantic duplicates.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn judge(&self, left: &Snippet, right: &Snippet) -> Result<Verdict>;
}

/// Verdict cache keyed by an order-insensitive hash of the two bodies.
///
/// Owned by the caller and injected, so cache scope and eviction stay
/// out of the engine.
#[derive(Default)]
pub struct VerdictCache {
    inner: Mutex<HashMap<u64, Verdict>>,
}

impl VerdictCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, left_body: &str, right_body: &str) -> Option<Verdict> {
        self.inner.lock().get(&pair_key(left_body, right_body)).cloned()
    }

    pub fn insert(&self, left_body: &str, right_body: &str, verdict: Verdict) {
        self.inner.lock().insert(pair_key(left_body, right_body), verdict);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// xxh3 over the two bodies in sorted order, so (a, b) and (b, a) hit
/// the same entry.
fn pair_key(left: &str, right: &str) -> u64 {
    let (first, second) = if left <= right { (left, right) } else { (right, left) };
    let mut hasher = Xxh3::new();
    hasher.update(first.as_bytes());
    hasher.update(&[0xff]);
    hasher.update(second.as_bytes());
    hasher.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_verdict() {
        let verdict =
            Verdict::parse(r#"{"are_duplicates": true, "reason": "same guard and product"}"#);
        assert!(verdict.are_duplicates);
        assert_eq!(verdict.reason, "same guard and product");
        assert!(verdict.suggestion.is_none());
    }

    #[test]
    fn test_malformed_verdict_is_negative() {
        assert!(!Verdict::parse("I think they are duplicates").are_duplicates);
        assert!(!Verdict::parse("{\"are_duplicates\": \"yes\"}").are_duplicates);
        assert!(!Verdict::parse("").are_duplicates);
    }

    #[test]
    fn test_cache_is_order_insensitive() {
        let cache = VerdictCache::new();
        cache.insert("body a", "body b", Verdict::negative("seen"));
        assert!(cache.get("body b", "body a").is_some());
        assert!(cache.get("body a", "body c").is_none());
        assert_eq!(cache.len(), 1);
    }
}
