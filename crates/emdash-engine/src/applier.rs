//! Replacement Applier: substitutes em dashes using stored suggestions

use shared_types::{
    Finding, ManualReviewEntry, Occurrence, ProcessingRun, Suggestion, EM_DASH,
};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::context::{extract_occurrences, head_chars, split_line_ending, tail_chars};
use crate::document::{read_document, write_atomic, SourceDocument};
use crate::error::{ApplyFailure, EngineError};
use crate::similarity::ContextProfile;

/// Characters of context kept in a manual-review entry
pub const REVIEW_SNIPPET_CHARS: usize = 30;

/// Modified text plus the finished run
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// Input text unchanged on a dry run
    pub text: String,
    pub run: ProcessingRun,
}

enum Decision<'f> {
    Replace(&'f Suggestion),
    Review(String),
}

pub struct ReplacementApplier<'a> {
    config: &'a EngineConfig,
}

impl<'a> ReplacementApplier<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Apply `findings` to an in-memory document.
    ///
    /// Statistics are identical whether or not `dry_run` is set; only the
    /// returned text differs.
    pub fn apply(
        &self,
        document: &SourceDocument,
        findings: &[Finding],
        confidence_threshold: f64,
        dry_run: bool,
    ) -> Result<ApplyOutcome, EngineError> {
        check_threshold(confidence_threshold)?;

        let mut run = ProcessingRun::new(&document.id, confidence_threshold, dry_run);
        run.start()?;
        let text = self.substitute(document, findings, confidence_threshold, dry_run, &mut run)?;
        run.complete()?;

        log_run(&run);
        Ok(ApplyOutcome { text, run })
    }

    /// Read `input`, apply, and write the result to `output` (or back to
    /// `input`). See [`ReplacementApplier::apply_and_write`].
    pub fn apply_file(
        &self,
        input: &Path,
        output: Option<&Path>,
        findings: &[Finding],
        confidence_threshold: f64,
        dry_run: bool,
    ) -> Result<ApplyOutcome, ApplyFailure> {
        let document = read_document(input).map_err(|error| ApplyFailure { run: None, error })?;
        self.apply_and_write(
            &document,
            output.unwrap_or(input),
            findings,
            confidence_threshold,
            dry_run,
        )
    }

    /// Apply to a document already read into memory and write the result to
    /// `destination`.
    ///
    /// Nothing is written until every line has been processed, and the write
    /// goes through a temporary file that is renamed into place. Dry runs never
    /// write. Backups are the caller's job.
    pub fn apply_and_write(
        &self,
        document: &SourceDocument,
        destination: &Path,
        findings: &[Finding],
        confidence_threshold: f64,
        dry_run: bool,
    ) -> Result<ApplyOutcome, ApplyFailure> {
        let not_started = |error| ApplyFailure { run: None, error };

        check_threshold(confidence_threshold).map_err(not_started)?;

        let mut run = ProcessingRun::new(&document.id, confidence_threshold, dry_run);
        run.start().map_err(|e| not_started(e.into()))?;

        let result = self
            .substitute(document, findings, confidence_threshold, dry_run, &mut run)
            .and_then(|text| {
                if !dry_run {
                    write_atomic(destination, &text)?;
                }
                Ok(text)
            });

        match result {
            Ok(text) => {
                run.complete().map_err(|e| not_started(e.into()))?;
                log_run(&run);
                Ok(ApplyOutcome { text, run })
            }
            Err(error) => {
                warn!("Run {} on {} failed: {}", run.id(), document.id, error);
                // the run is Running here, so this transition cannot be refused
                let _ = run.fail(error.to_string());
                Err(ApplyFailure {
                    run: Some(Box::new(run)),
                    error,
                })
            }
        }
    }

    /// Line-by-line pass. Dashes within a line are handled right to left so
    /// that a replacement of a different length never shifts a dash that is
    /// still waiting to be replaced.
    fn substitute(
        &self,
        document: &SourceDocument,
        findings: &[Finding],
        confidence_threshold: f64,
        dry_run: bool,
        run: &mut ProcessingRun,
    ) -> Result<String, EngineError> {
        let candidates = Candidates::new(findings);
        let mut output = String::with_capacity(document.text.len());
        let mut offset = 0;

        for (index, line) in document.text.split_inclusive('\n').enumerate() {
            let (content, ending) = split_line_ending(line);
            let occurrences =
                extract_occurrences(content, index + 1, offset, self.config.context_window);
            let mut mutated = content.to_string();

            for occurrence in occurrences.iter().rev() {
                match self.decide(occurrence, &candidates, confidence_threshold) {
                    Decision::Replace(suggestion) => {
                        run.record_replacement(suggestion.category)?;
                        if !dry_run {
                            let start = occurrence.byte_offset - offset;
                            mutated.replace_range(
                                start..start + EM_DASH.len_utf8(),
                                &suggestion.replacement,
                            );
                        }
                    }
                    Decision::Review(reason) => {
                        debug!(line = occurrence.line_number, %reason, "routed to manual review");
                        run.record_skip(ManualReviewEntry {
                            line_number: occurrence.line_number,
                            context_before: tail_chars(
                                &occurrence.context_before,
                                REVIEW_SNIPPET_CHARS,
                            ),
                            context_after: head_chars(
                                &occurrence.context_after,
                                REVIEW_SNIPPET_CHARS,
                            ),
                            reason,
                        })?;
                    }
                }
            }

            output.push_str(&mutated);
            output.push_str(ending);
            offset += line.len();
        }

        if dry_run {
            Ok(document.text.clone())
        } else {
            Ok(output)
        }
    }

    fn decide<'f>(
        &self,
        occurrence: &Occurrence,
        candidates: &Candidates<'f>,
        confidence_threshold: f64,
    ) -> Decision<'f> {
        let Some((best, score)) = candidates.best(occurrence, self.config.similarity_floor) else {
            return Decision::Review(format!(
                "no stored suggestion matched above similarity floor {:.2}",
                self.config.similarity_floor
            ));
        };

        let confidence = best.suggestion.confidence.value();
        debug!(
            line = occurrence.line_number,
            score,
            confidence,
            category = best.suggestion.category.slug(),
            "matched stored suggestion"
        );

        if confidence >= confidence_threshold {
            Decision::Replace(&best.suggestion)
        } else {
            Decision::Review(format!(
                "confidence {:.2} below threshold {:.2} ({})",
                confidence, confidence_threshold, best.suggestion.category
            ))
        }
    }
}

/// Stored findings with their context profiles, built once per apply
pub struct Candidates<'f> {
    entries: Vec<(&'f Finding, ContextProfile)>,
}

impl<'f> Candidates<'f> {
    pub fn new(findings: &'f [Finding]) -> Self {
        Self {
            entries: findings
                .iter()
                .map(|f| (f, ContextProfile::of(&f.occurrence)))
                .collect(),
        }
    }

    /// Highest `similarity x confidence` at or above `floor`; ties keep the
    /// earliest finding.
    pub fn best(&self, occurrence: &Occurrence, floor: f64) -> Option<(&'f Finding, f64)> {
        let current = ContextProfile::of(occurrence);
        self.entries
            .iter()
            .map(|(f, profile)| {
                let score = current.similarity(profile) * f.suggestion.confidence.value();
                (*f, score)
            })
            .filter(|(_, score)| *score >= floor)
            .fold(None, |best: Option<(&'f Finding, f64)>, (f, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((f, score)),
            })
    }
}

fn check_threshold(threshold: f64) -> Result<(), EngineError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(EngineError::InvalidThreshold(threshold))
    }
}

fn log_run(run: &ProcessingRun) {
    info!(
        "Run {} on {}: {} em dashes, {} replaced, {} for review{}",
        run.id(),
        run.document_id(),
        run.total_em_dashes(),
        run.replacements_made(),
        run.skipped_low_confidence(),
        if run.dry_run() { " (dry run)" } else { "" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::PatternAnalyzer;
    use crate::rules::RuleTable;
    use pretty_assertions::assert_eq;
    use shared_types::RunStatus;

    fn doc(text: &str) -> SourceDocument {
        SourceDocument::new("test.md", text)
    }

    fn analyze_and_apply(text: &str, threshold: f64, dry_run: bool) -> ApplyOutcome {
        let rules = RuleTable::default();
        let config = EngineConfig::default();
        let findings = PatternAnalyzer::new(&rules, &config).analyze(text);
        ReplacementApplier::new(&config)
            .apply(&doc(text), &findings, threshold, dry_run)
            .unwrap()
    }

    #[test]
    fn test_parenthetical_pair_replaced() {
        let outcome = analyze_and_apply("The plan—our vision—is clear.", 0.7, false);
        assert_eq!(outcome.text, "The plan, our vision, is clear.");
        assert_eq!(outcome.run.replacements_made(), 2);
        assert_eq!(outcome.run.by_type().get("parenthetical"), Some(&2));
        assert_eq!(outcome.run.status(), RunStatus::Completed);
    }

    #[test]
    fn test_number_heavy_context_gets_colon() {
        let outcome = analyze_and_apply("Budget—15% land, 60% construction.", 0.8, false);
        assert_eq!(outcome.text, "Budget: 15% land, 60% construction.");
    }

    #[test]
    fn test_default_comma_below_threshold_is_reviewed_not_replaced() {
        let text = "The river ran north—the valley opened wide.";
        let outcome = analyze_and_apply(text, 0.6, false);

        assert_eq!(outcome.text, text);
        assert_eq!(outcome.run.replacements_made(), 0);
        assert_eq!(outcome.run.skipped_low_confidence(), 1);

        let review = &outcome.run.manual_review()[0];
        assert_eq!(review.line_number, 1);
        assert_eq!(review.context_before, "The river ran north");
        assert_eq!(review.context_after, "the valley opened wide.");
        assert!(review.reason.contains("0.50 below threshold 0.60"));
    }

    #[test]
    fn test_no_findings_routes_everything_to_review() {
        let config = EngineConfig::default();
        let outcome = ReplacementApplier::new(&config)
            .apply(&doc("one—two\nthree—four"), &[], 0.5, false)
            .unwrap();
        assert_eq!(outcome.text, "one—two\nthree—four");
        assert_eq!(outcome.run.total_em_dashes(), 2);
        assert_eq!(outcome.run.skipped_low_confidence(), 2);
        assert!(outcome.run.manual_review()[0]
            .reason
            .contains("similarity floor"));
    }

    #[test]
    fn test_dry_run_leaves_text_and_keeps_statistics() {
        let text = "The plan—our vision—is clear.\nThe river ran north—the valley opened wide.\n";
        let wet = analyze_and_apply(text, 0.7, false);
        let dry = analyze_and_apply(text, 0.7, true);

        assert_eq!(dry.text, text);
        assert_ne!(wet.text, text);
        assert_eq!(dry.run.report(), wet.run.report());
    }

    #[test]
    fn test_line_endings_preserved() {
        let text = "Budget—15% land.\r\nNo dash.\r\n";
        let outcome = analyze_and_apply(text, 0.5, false);
        assert_eq!(outcome.text, "Budget: 15% land.\r\nNo dash.\r\n");
    }

    #[test]
    fn test_multibyte_text_around_replacements() {
        let text = "Café—crème—brûlée.";
        let outcome = analyze_and_apply(text, 0.0, false);
        assert_eq!(outcome.text, "Café, crème, brûlée.");
    }

    #[test]
    fn test_rejects_invalid_threshold() {
        let config = EngineConfig::default();
        let result = ReplacementApplier::new(&config).apply(&doc("x"), &[], 1.5, false);
        assert!(matches!(result, Err(EngineError::InvalidThreshold(_))));
    }

    #[test]
    fn test_best_candidate_prefers_exact_context() {
        let rules = RuleTable::default();
        let config = EngineConfig::default();
        let findings =
            PatternAnalyzer::new(&rules, &config).analyze("The plan—our vision—is clear.");
        let (best, score) = Candidates::new(&findings)
            .best(&findings[1].occurrence, 0.3)
            .unwrap();
        assert_eq!(best.occurrence.column, findings[1].occurrence.column);
        assert_eq!(score, findings[1].suggestion.confidence.value());
    }

    #[test]
    fn test_apply_file_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapter.md");
        std::fs::write(&path, "Budget—15% land.").unwrap();

        let rules = RuleTable::default();
        let config = EngineConfig::default();
        let findings = PatternAnalyzer::new(&rules, &config).analyze("Budget—15% land.");
        let outcome = ReplacementApplier::new(&config)
            .apply_file(&path, None, &findings, 0.8, false)
            .unwrap();

        assert_eq!(outcome.run.replacements_made(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Budget: 15% land.");
    }

    #[test]
    fn test_apply_file_dry_run_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapter.md");
        std::fs::write(&path, "Budget—15% land.").unwrap();

        let rules = RuleTable::default();
        let config = EngineConfig::default();
        let findings = PatternAnalyzer::new(&rules, &config).analyze("Budget—15% land.");
        let missing_dir = dir.path().join("missing").join("out.md");
        let outcome = ReplacementApplier::new(&config)
            .apply_file(&path, Some(&missing_dir), &findings, 0.8, true)
            .unwrap();

        assert_eq!(outcome.run.replacements_made(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Budget—15% land.");
        assert!(!missing_dir.exists());
    }

    #[test]
    fn test_apply_file_write_failure_marks_run_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapter.md");
        std::fs::write(&path, "Budget—15% land.").unwrap();
        let unwritable = dir.path().join("missing").join("out.md");

        let config = EngineConfig::default();
        let failure = ReplacementApplier::new(&config)
            .apply_file(&path, Some(&unwritable), &[], 0.8, false)
            .unwrap_err();

        assert!(matches!(failure.error, EngineError::Write { .. }));
        let run = failure.run.unwrap();
        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Budget—15% land.");
    }

    #[test]
    fn test_apply_and_write_uses_document_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.md");
        let document = SourceDocument::new("chapter.md", "Budget—15% land.");

        let rules = RuleTable::default();
        let config = EngineConfig::default();
        let findings = PatternAnalyzer::new(&rules, &config).analyze(&document.text);
        let outcome = ReplacementApplier::new(&config)
            .apply_and_write(&document, &destination, &findings, 0.8, false)
            .unwrap();

        assert_eq!(outcome.run.document_id(), "chapter.md");
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "Budget: 15% land.");
    }

    #[test]
    fn test_apply_file_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.md");
        std::fs::write(&path, [0xffu8, 0xfe, 0x00]).unwrap();

        let config = EngineConfig::default();
        let failure = ReplacementApplier::new(&config)
            .apply_file(&path, None, &[], 0.8, false)
            .unwrap_err();
        assert!(matches!(failure.error, EngineError::Input { .. }));
        assert!(failure.run.is_none());
    }
}
