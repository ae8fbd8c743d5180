//! Trigram string similarity matching PostgreSQL's pg_trgm semantics.
//!
//! The SQL engine ranks with `similarity()`; the in-memory store has to
//! rank the same way, so the two engines stay interchangeable under test.

use std::collections::HashSet;

/// Normalized similarity of two strings in [0, 1].
///
/// 1.0 for equal strings (ignoring case), 0.0 when either side produces no
/// trigrams or the trigram sets are disjoint. Used purely for ranking;
/// inclusion is decided by the substring gate, never by this score.
pub fn similarity(a: &str, b: &str) -> f64 {
    let ta = trigrams(a);
    let tb = trigrams(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let shared = ta.intersection(&tb).count();
    let total = ta.len() + tb.len() - shared;
    shared as f64 / total as f64
}

/// Trigram set of a string, pg_trgm style: lowercase, split on
/// non-alphanumerics, each word padded with two leading and one trailing
/// space before the 3-char windows are taken.
fn trigrams(input: &str) -> HashSet<[char; 3]> {
    let mut set = HashSet::new();
    let lowered = input.to_lowercase();
    for word in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut padded: Vec<char> = Vec::with_capacity(word.chars().count() + 3);
        padded.push(' ');
        padded.push(' ');
        padded.extend(word.chars());
        padded.push(' ');
        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }
    set
}
