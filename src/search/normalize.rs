//! Text normalization shared by the TF-IDF vectorizer and the vector cache

use crate::utils::string::truncate_chars;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Everything except word characters, whitespace and the symbol allow-list
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s@#$%&*]").expect("static regex is valid"));

/// Lowercase, replace punctuation outside `@#$%&*` with spaces, collapse
/// whitespace, and cut to `max_len` characters.
pub fn normalize_text(text: &str, max_len: usize) -> String {
    let lowered = text.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lowered, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, max_len).trim_end().to_string()
}

/// Content address of already-normalized text
pub fn content_hash(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}
