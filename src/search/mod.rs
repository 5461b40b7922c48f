//! Naive memory search
//!
//! Two interchangeable strategies share one contract:
//! `search(query, namespace, limit) -> ordered hits`.
//!
//! - **Substring**: case-insensitive match against the key or the serialized
//!   value; every hit scores 1.0.
//! - **TF-IDF**: closed-vocabulary vectors compared by cosine similarity,
//!   filtered by a threshold (see [`tfidf`]).
//!
//! Both break ties with the same rule: `access_count` descending, then
//! `updated_at` descending, then `key` ascending (namespace ascending as a
//! last resort when searching across namespaces). That rule decides which
//! records survive `limit`, so it lives here in one place.

pub mod normalize;
pub mod tfidf;

use crate::error::{MemoryError, Result};
use crate::types::SearchHit;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Default number of hits returned
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Largest accepted `limit`
pub const MAX_SEARCH_LIMIT: usize = 1000;

/// Which strategy `search` uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategyKind {
    #[default]
    Substring,
    Tfidf,
}

impl fmt::Display for SearchStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategyKind::Substring => f.write_str("substring"),
            SearchStrategyKind::Tfidf => f.write_str("tfidf"),
        }
    }
}

impl FromStr for SearchStrategyKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "substring" | "like" => Ok(SearchStrategyKind::Substring),
            "tfidf" | "tf-idf" => Ok(SearchStrategyKind::Tfidf),
            other => Err(MemoryError::Validation(format!(
                "unknown search strategy '{}' (expected substring or tfidf)",
                other
            ))),
        }
    }
}

/// Reject a `limit` outside `1..=MAX_SEARCH_LIMIT`
pub fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 || limit > MAX_SEARCH_LIMIT {
        return Err(MemoryError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_SEARCH_LIMIT, limit
        )));
    }
    Ok(())
}

/// Score descending, then the shared tie-break order
pub fn compare_hits(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.access_count.cmp(&a.access_count))
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| a.key.cmp(&b.key))
        .then_with(|| a.namespace.cmp(&b.namespace))
}

/// Sort, then truncate to `limit`
pub fn rank_hits(mut hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    hits.sort_by(compare_hits);
    hits.truncate(limit);
    hits
}
