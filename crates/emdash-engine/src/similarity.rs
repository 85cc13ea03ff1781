//! Context similarity between a live occurrence and a stored one.
//!
//! Score is the mean of four ratios in [0, 1]: word overlap before, word
//! overlap after, length similarity before, length similarity after.

use shared_types::Occurrence;
use std::collections::HashSet;

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(b).count();
    let total = a.len() + b.len() - shared;
    shared as f64 / total as f64
}

fn length_ratio(a: usize, b: usize) -> f64 {
    if a == 0 && b == 0 {
        return 1.0;
    }
    a.min(b) as f64 / a.max(b) as f64
}

/// Jaccard ratio of the lowercase word sets. Two empty texts are identical.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    jaccard(&words(a), &words(b))
}

/// Shorter length over longer length, in characters
pub fn length_similarity(a: &str, b: &str) -> f64 {
    length_ratio(a.chars().count(), b.chars().count())
}

/// Word sets and lengths of an occurrence's context, computed once so an
/// occurrence can be compared against many others without re-tokenizing.
#[derive(Debug, Clone)]
pub struct ContextProfile {
    before_words: HashSet<String>,
    after_words: HashSet<String>,
    before_len: usize,
    after_len: usize,
}

impl ContextProfile {
    pub fn of(occurrence: &Occurrence) -> Self {
        Self {
            before_words: words(&occurrence.context_before),
            after_words: words(&occurrence.context_after),
            before_len: occurrence.context_before.chars().count(),
            after_len: occurrence.context_after.chars().count(),
        }
    }

    pub fn similarity(&self, other: &ContextProfile) -> f64 {
        (jaccard(&self.before_words, &other.before_words)
            + jaccard(&self.after_words, &other.after_words)
            + length_ratio(self.before_len, other.before_len)
            + length_ratio(self.after_len, other.after_len))
            / 4.0
    }
}

pub fn context_similarity(current: &Occurrence, stored: &Occurrence) -> f64 {
    ContextProfile::of(current).similarity(&ContextProfile::of(stored))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occurrence(before: &str, after: &str) -> Occurrence {
        Occurrence {
            line_number: 1,
            column: 0,
            byte_offset: 0,
            context_before: before.to_string(),
            context_after: after.to_string(),
            sentence: String::new(),
        }
    }

    #[test]
    fn test_word_overlap() {
        assert_eq!(word_overlap("The plan", "the PLAN"), 1.0);
        assert_eq!(word_overlap("a b", "b c"), 1.0 / 3.0);
        assert_eq!(word_overlap("", ""), 1.0);
        assert_eq!(word_overlap("alpha", ""), 0.0);
    }

    #[test]
    fn test_length_similarity() {
        assert_eq!(length_similarity("abcd", "ab"), 0.5);
        assert_eq!(length_similarity("", ""), 1.0);
        assert_eq!(length_similarity("", "x"), 0.0);
    }

    #[test]
    fn test_identical_context_scores_one() {
        let a = occurrence("The plan", "our vision—is clear.");
        assert_eq!(context_similarity(&a, &a.clone()), 1.0);
    }

    #[test]
    fn test_profile_matches_direct_scoring() {
        let a = occurrence("The plan", "our vision");
        let b = occurrence("the plan for", "vision and more");
        let direct = (word_overlap("The plan", "the plan for")
            + word_overlap("our vision", "vision and more")
            + length_similarity("The plan", "the plan for")
            + length_similarity("our vision", "vision and more"))
            / 4.0;
        let profiled = ContextProfile::of(&a).similarity(&ContextProfile::of(&b));
        assert!((profiled - direct).abs() < 1e-12);
        assert!((context_similarity(&a, &b) - direct).abs() < 1e-12);
    }

    #[test]
    fn test_unrelated_context_scores_low() {
        let a = occurrence("The plan", "our vision");
        let b = occurrence("Rain fell all through the night", "and then stopped");
        assert!(context_similarity(&a, &b) < 0.3);
    }
}
