//! Agreement between subtitle text and transcribed speech.
//!
//! The score is a bag-of-words overlap: the number of reference words that
//! occur anywhere in the candidate, divided by the longer word count. Word
//! order and candidate repetition are ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid non-word regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Overlap score in [0, 1] between `reference` and `candidate`
pub fn similarity(reference: &str, candidate: &str) -> f64 {
    if reference.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    let reference = normalize(reference);
    let candidate = normalize(candidate);

    if reference == candidate {
        return 1.0;
    }

    let reference_words: Vec<&str> = reference.split_whitespace().collect();
    let candidate_words: HashSet<&str> = candidate.split_whitespace().collect();
    let total_words = reference_words.len().max(candidate.split_whitespace().count());
    if total_words == 0 {
        return 0.0;
    }

    let common_words = reference_words
        .iter()
        .filter(|word| candidate_words.contains(*word))
        .count();

    common_words as f64 / total_words as f64
}

/// Whether `accuracy` clears `threshold`; the boundary itself does not match
pub fn is_match(accuracy: f64, threshold: f64) -> bool {
    accuracy > threshold
}

/// Lowercase, drop punctuation and symbols, collapse whitespace
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    WHITESPACE_RUN.replace_all(&stripped, " ").trim().to_string()
}
