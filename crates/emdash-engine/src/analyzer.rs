//! Pattern Analyzer: one scored suggestion per em dash

use shared_types::{Category, Confidence, Finding, Occurrence, Suggestion};
use std::collections::HashMap;
use std::io::BufRead;
use tracing::debug;

use crate::config::EngineConfig;
use crate::confidence::{calculate_confidence, ConfidenceFactors};
use crate::context::{extract_occurrences, split_line_ending};
use crate::error::EngineError;
use crate::patterns::{
    ends_with_coordinating_conjunction, ends_with_linking_verb, is_complete_sentence,
};
use crate::rules::{Rule, RuleTable};

pub const CONJUNCTION_CONFIDENCE: f64 = 0.7;
pub const LINKING_VERB_CONFIDENCE: f64 = 0.6;
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// How an occurrence was classified before confidence refinement
enum Resolution<'r> {
    Rule(&'r Rule),
    Fallback(Suggestion),
}

impl Resolution<'_> {
    fn category(&self) -> Category {
        match self {
            Resolution::Rule(rule) => rule.category,
            Resolution::Fallback(s) => s.category,
        }
    }
}

struct Draft<'r> {
    occurrence: Occurrence,
    resolution: Resolution<'r>,
}

pub struct PatternAnalyzer<'a> {
    rules: &'a RuleTable,
    config: &'a EngineConfig,
}

impl<'a> PatternAnalyzer<'a> {
    pub fn new(rules: &'a RuleTable, config: &'a EngineConfig) -> Self {
        Self { rules, config }
    }

    /// Analyze text that is already in memory
    pub fn analyze(&self, text: &str) -> Vec<Finding> {
        let mut drafts = Vec::new();
        let mut offset = 0;

        for (index, line) in text.split_inclusive('\n').enumerate() {
            self.scan_line(line, index + 1, offset, &mut drafts);
            offset += line.len();
        }

        self.finish(drafts)
    }

    /// Analyze a stream line by line without holding the whole document.
    ///
    /// Input that is not valid UTF-8 fails with [`EngineError::Input`] naming
    /// `document_id`.
    pub fn analyze_reader<R: BufRead>(
        &self,
        document_id: &str,
        mut reader: R,
    ) -> Result<Vec<Finding>, EngineError> {
        let mut drafts = Vec::new();
        let mut offset = 0;
        let mut line_number = 0;
        let mut line = String::new();

        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .map_err(|source| EngineError::Input {
                    document: document_id.to_string(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            line_number += 1;
            self.scan_line(&line, line_number, offset, &mut drafts);
            offset += read;
        }

        Ok(self.finish(drafts))
    }

    fn scan_line(&self, line: &str, line_number: usize, offset: usize, drafts: &mut Vec<Draft<'a>>) {
        let (content, _) = split_line_ending(line);
        for occurrence in extract_occurrences(content, line_number, offset, self.config.context_window)
        {
            let resolution = self.classify(&occurrence);
            drafts.push(Draft {
                occurrence,
                resolution,
            });
        }
    }

    fn classify(&self, occurrence: &Occurrence) -> Resolution<'a> {
        match self
            .rules
            .resolve(&occurrence.context_before, &occurrence.context_after)
        {
            Some(rule) => Resolution::Rule(rule),
            None => Resolution::Fallback(fallback_suggestion(&occurrence.context_before)),
        }
    }

    /// Second pass: the consistency bonus needs category counts for the batch
    fn finish(&self, drafts: Vec<Draft<'a>>) -> Vec<Finding> {
        let batch_size = drafts.len();
        let mut per_category: HashMap<Category, usize> = HashMap::new();
        for draft in &drafts {
            *per_category.entry(draft.resolution.category()).or_insert(0) += 1;
        }

        drafts
            .into_iter()
            .map(|draft| {
                let suggestion = match draft.resolution {
                    Resolution::Rule(rule) => {
                        let same = per_category.get(&rule.category).copied().unwrap_or(1);
                        rule_suggestion(rule, &draft.occurrence, same - 1, batch_size)
                    }
                    Resolution::Fallback(suggestion) => suggestion,
                };
                debug!(
                    line = draft.occurrence.line_number,
                    column = draft.occurrence.column,
                    category = suggestion.category.slug(),
                    confidence = suggestion.confidence.value(),
                    "classified em dash"
                );
                Finding::new(draft.occurrence, suggestion)
            })
            .collect()
    }
}

fn rule_suggestion(
    rule: &Rule,
    occurrence: &Occurrence,
    same_category_others: usize,
    batch_size: usize,
) -> Suggestion {
    let factors = ConfidenceFactors {
        context_chars: occurrence.context_before.chars().count()
            + occurrence.context_after.chars().count(),
        sentence_complete: is_complete_sentence(&occurrence.sentence),
        high_specificity: rule.high_specificity,
        consistency: ConfidenceFactors::consistency_fraction(same_category_others, batch_size),
    };

    Suggestion {
        replacement: rule.replacement.clone(),
        category: rule.category,
        confidence: calculate_confidence(rule.confidence, &factors),
        rationale: rule.description.clone(),
        rule_id: Some(rule.id.clone()),
    }
}

/// Used when no rule matches. Confidences here are fixed and not refined.
pub fn fallback_suggestion(context_before: &str) -> Suggestion {
    let (replacement, category, confidence, rationale) =
        if ends_with_coordinating_conjunction(context_before) {
            (
                ", ",
                Category::CoordinatingConjunction,
                CONJUNCTION_CONFIDENCE,
                "Preceded by a coordinating conjunction",
            )
        } else if ends_with_linking_verb(context_before) {
            (
                ": ",
                Category::LinkingVerb,
                LINKING_VERB_CONFIDENCE,
                "Preceded by a linking verb introducing an explanation",
            )
        } else {
            (
                ", ",
                Category::General,
                DEFAULT_CONFIDENCE,
                "No rule matched; default comma",
            )
        };

    Suggestion {
        replacement: replacement.to_string(),
        category,
        confidence: Confidence::clamped(confidence),
        rationale: rationale.to_string(),
        rule_id: None,
    }
}
