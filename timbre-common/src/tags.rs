//! Descriptor tag normalization and tokenization
//!
//! Descriptor strings arrive from the host as free-form text. The canonical
//! tokenization rule splits on runs of non-alphabetic characters; tags are
//! stored Capitalized and compared lowercase.

/// Split a descriptor string into non-empty alphabetic tokens.
///
/// Runs of anything that is not an ASCII letter act as separators, so
/// `"bright, warm-pad"` tokenizes to `["bright", "warm", "pad"]`.
pub fn tokenize(input: &str) -> Vec<String> {
    input
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize a tag to its stored form: first letter uppercase, rest lowercase.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Tokenize and capitalize in one pass (the ingest-path normalization).
pub fn normalize_tag_string(input: &str) -> Vec<String> {
    tokenize(input).iter().map(|t| capitalize(t)).collect()
}
