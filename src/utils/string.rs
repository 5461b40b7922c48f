//! String helpers for safe UTF-8 truncation

/// Keep at most `max_chars` characters, never splitting a multi-byte character.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Display form of `s`: at most `max_chars` characters, with "..." appended
/// when anything was cut.
///
/// # Examples
/// ```
/// use deepcli_memory::utils::string::preview;
///
/// assert_eq!(preview("hello world", 5), "hello...");
/// assert_eq!(preview("hello", 10), "hello");
/// assert_eq!(preview("héllo→wörld", 6), "héllo→...");
/// ```
pub fn preview(s: &str, max_chars: usize) -> String {
    let truncated = truncate_chars(s, max_chars);
    if truncated.len() == s.len() {
        s.to_string()
    } else {
        format!("{}...", truncated)
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` so `name` is usable as a file stem
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "session".to_string()
    } else {
        truncate_chars(cleaned, 128).to_string()
    }
}
