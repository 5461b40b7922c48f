//! Namespace directory
//!
//! Namespaces are not persisted on their own; they are the distinct values of
//! the `namespace` column. This module owns the rules callers depend on:
//! what a valid namespace or key looks like, and the deterministic order in
//! which namespaces are reported.
//!
//! # Ordering
//!
//! - `list_namespaces`: ascending by name.
//! - per-namespace counts (stats, `namespaces` command): descending by count,
//!   ties broken by ascending name.

use crate::error::{MemoryError, Result};
use crate::types::NamespaceCount;
use std::cmp::Ordering;

/// Reject an empty key
pub fn validate_key(key: &str) -> Result<()> {
    validate_name("key", key)
}

/// Reject an empty namespace
pub fn validate_namespace(namespace: &str) -> Result<()> {
    validate_name("namespace", namespace)
}

/// Only emptiness is rejected; whitespace, long path-like names and any
/// other characters are stored as given.
fn validate_name(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(MemoryError::Validation(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Count order: descending by count, then ascending by name
pub fn compare_counts(a: &NamespaceCount, b: &NamespaceCount) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| a.namespace.cmp(&b.namespace))
}

/// Sort counts in place by [`compare_counts`]
pub fn sort_counts(counts: &mut [NamespaceCount]) {
    counts.sort_by(compare_counts);
}

/// Namespace names in ascending order
pub fn names_in_order(counts: &[NamespaceCount]) -> Vec<String> {
    let mut names: Vec<String> = counts.iter().map(|c| c.namespace.clone()).collect();
    names.sort();
    names.dedup();
    names
}
