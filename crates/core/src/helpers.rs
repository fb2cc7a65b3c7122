//! Helper functions for text normalization and column naming.

use regex::Regex;
use std::sync::LazyLock;

// Anything that is neither a word character nor whitespace.
static PUNCTUATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every run of whitespace (including newlines and tabs) into a
/// single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Remove punctuation, keeping Unicode word characters and whitespace.
pub fn strip_punctuation(text: &str) -> String {
    PUNCTUATION_RE.replace_all(text, "").into_owned()
}

/// Cleaned message text: lowercase, punctuation removed, whitespace collapsed.
pub fn clean_message(text: &str) -> String {
    normalize_whitespace(&strip_punctuation(&text.to_lowercase()))
}

/// Lowercased message text with punctuation kept and whitespace collapsed.
pub fn lowercase_with_punctuation(text: &str) -> String {
    normalize_whitespace(&text.to_lowercase())
}

/// Split text into word tokens.
///
/// Line breaks and tabs become spaces, punctuation is dropped and the rest is
/// split on whitespace. Underscores and non-ASCII letters stay inside tokens.
pub fn word_tokens(text: &str) -> Vec<String> {
    let flattened = text.trim().replace(['\n', '\r', '\t'], " ");
    strip_punctuation(&flattened)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Reduce a column name to alphanumerics and underscores.
pub fn sanitize_column_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}
