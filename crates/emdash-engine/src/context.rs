//! Occurrence detection and context windows within a single line

use shared_types::{Occurrence, EM_DASH};

use crate::patterns::is_sentence_terminal;

/// Split a raw line into its content and its line ending (`"\n"`, `"\r\n"` or `""`)
pub fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

/// Find every em dash in `line` (content only, no line ending).
///
/// `line_offset` is the byte offset of the line within the document.
/// Windows hold at most `window` characters and never cross the line.
pub fn extract_occurrences(
    line: &str,
    line_number: usize,
    line_offset: usize,
    window: usize,
) -> Vec<Occurrence> {
    let chars: Vec<(usize, char)> = line.char_indices().collect();

    chars
        .iter()
        .enumerate()
        .filter(|(_, (_, c))| *c == EM_DASH)
        .map(|(column, (byte_idx, _))| {
            let before_start = column.saturating_sub(window);
            let after_end = column.saturating_add(1).saturating_add(window).min(chars.len());

            Occurrence {
                line_number,
                column,
                byte_offset: line_offset + byte_idx,
                context_before: collect(&chars[before_start..column]),
                context_after: collect(&chars[column + 1..after_end]),
                sentence: enclosing_sentence(&chars, column),
            }
        })
        .collect()
}

fn collect(chars: &[(usize, char)]) -> String {
    chars.iter().map(|(_, c)| *c).collect()
}

/// Smallest sentence around the dash at `column`: from just after the previous
/// terminal to the next terminal (inclusive), or to the line edges.
fn enclosing_sentence(chars: &[(usize, char)], column: usize) -> String {
    let start = chars[..column]
        .iter()
        .rposition(|(_, c)| is_sentence_terminal(*c))
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = chars[column + 1..]
        .iter()
        .position(|(_, c)| is_sentence_terminal(*c))
        .map(|i| column + 1 + i + 1)
        .unwrap_or(chars.len());

    collect(&chars[start..end]).trim().to_string()
}

/// Last `n` characters of `text`
pub fn tail_chars(text: &str, n: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}

/// First `n` characters of `text`
pub fn head_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}
