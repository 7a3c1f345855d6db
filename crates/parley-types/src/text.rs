//! Word-level text helpers.
//!
//! The whole pipeline reasons about text at word granularity: stable
//! prefixes, translated deltas, and spoken-word accounting all use the
//! same whitespace tokenization, so the helpers live here next to the
//! types that carry the text.

/// Splits text into words by whitespace.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    words(text).count()
}

/// The first `n` words of `text`, joined with single spaces.
///
/// Returns the whole (renormalized) text if it has fewer than `n` words.
pub fn first_words(text: &str, n: usize) -> String {
    words(text).take(n).collect::<Vec<_>>().join(" ")
}

/// Strips `prefix` from `full` as a *word* prefix, not a substring.
///
/// Returns the remaining suffix words joined with single spaces if every
/// word of `prefix` matches the corresponding word of `full`, or `None`
/// if the prefix does not hold. An empty prefix always matches.
pub fn strip_word_prefix(prefix: &str, full: &str) -> Option<String> {
    let prefix_words: Vec<&str> = words(prefix).collect();
    let full_words: Vec<&str> = words(full).collect();

    if prefix_words.len() > full_words.len() {
        return None;
    }
    if prefix_words
        .iter()
        .zip(full_words.iter())
        .any(|(p, f)| p != f)
    {
        return None;
    }

    Some(full_words[prefix_words.len()..].join(" "))
}
