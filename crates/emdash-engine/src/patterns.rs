//! Word lists and trailing-word detection used by the heuristic fallbacks

use lazy_static::lazy_static;
use regex::Regex;

/// Coordinating conjunctions (FANBOYS)
pub const COORDINATING_CONJUNCTIONS: &[&str] = &["and", "but", "or", "nor", "for", "so", "yet"];

/// Linking verbs that usually introduce an explanation or definition
pub const LINKING_VERBS: &[&str] = &[
    "is", "are", "was", "were", "am", "be", "been", "being", "seem", "seems", "seemed", "become",
    "becomes", "became", "remain", "remains", "remained", "appear", "appears", "appeared",
];

/// Characters that end a sentence
pub const SENTENCE_TERMINALS: &[char] = &['.', '!', '?', '\u{2026}'];

/// Closing quotes and brackets allowed after a sentence terminal
pub const CLOSING_MARKS: &[char] = &['"', '\'', '\u{201D}', '\u{2019}', ')', ']'];

fn trailing_word_regex(words: &[&str]) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{})\s*$", words.join("|"))).unwrap()
}

lazy_static! {
    static ref TRAILING_CONJUNCTION: Regex = trailing_word_regex(COORDINATING_CONJUNCTIONS);
    static ref TRAILING_LINKING_VERB: Regex = trailing_word_regex(LINKING_VERBS);
}

/// True if the text ends in a coordinating conjunction ("... and")
pub fn ends_with_coordinating_conjunction(text: &str) -> bool {
    TRAILING_CONJUNCTION.is_match(text)
}

/// True if the text ends in a linking verb ("... the answer was")
pub fn ends_with_linking_verb(text: &str) -> bool {
    TRAILING_LINKING_VERB.is_match(text)
}

pub fn is_sentence_terminal(c: char) -> bool {
    SENTENCE_TERMINALS.contains(&c)
}

/// True if the sentence ends in terminal punctuation, ignoring closing quotes
pub fn is_complete_sentence(sentence: &str) -> bool {
    sentence
        .trim_end()
        .trim_end_matches(CLOSING_MARKS)
        .chars()
        .next_back()
        .is_some_and(is_sentence_terminal)
}
