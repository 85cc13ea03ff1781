//! Lifecycle record for one replacement pass over one document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TypesError;
use crate::types::Category;

/// `Pending -> Running -> {Completed, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    fn can_become(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("Unknown run status: {}", other)),
        }
    }
}

/// An occurrence left untouched for an operator to look at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualReviewEntry {
    pub line_number: usize,
    pub context_before: String,
    pub context_after: String,
    pub reason: String,
}

/// JSON-facing summary of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub total_em_dashes: usize,
    pub replacements_made: usize,
    pub skipped_low_confidence: usize,
    pub by_type: BTreeMap<String, usize>,
    pub manual_review_needed: Vec<ManualReviewEntry>,
}

/// One execution of the applier over one document.
///
/// Counters can only move while the run is `Running`; once completed or
/// failed the record is frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRun {
    id: String,
    document_id: String,
    confidence_threshold: f64,
    dry_run: bool,
    status: RunStatus,
    total_em_dashes: usize,
    replacements_made: usize,
    skipped_low_confidence: usize,
    by_type: BTreeMap<String, usize>,
    manual_review: Vec<ManualReviewEntry>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    failure: Option<String>,
}

impl ProcessingRun {
    pub fn new(document_id: &str, confidence_threshold: f64, dry_run: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            confidence_threshold,
            dry_run,
            status: RunStatus::Pending,
            total_em_dashes: 0,
            replacements_made: 0,
            skipped_low_confidence: 0,
            by_type: BTreeMap::new(),
            manual_review: Vec::new(),
            started_at: None,
            finished_at: None,
            failure: None,
        }
    }

    fn transition(&mut self, to: RunStatus) -> Result<(), TypesError> {
        if !self.status.can_become(to) {
            return Err(TypesError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), TypesError> {
        if self.status == RunStatus::Running {
            Ok(())
        } else {
            Err(TypesError::InvalidTransition {
                from: self.status,
                to: RunStatus::Running,
            })
        }
    }

    pub fn start(&mut self) -> Result<(), TypesError> {
        self.transition(RunStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Count one substitution (performed, or as-if performed in a dry run)
    pub fn record_replacement(&mut self, category: Category) -> Result<(), TypesError> {
        self.ensure_running()?;
        self.total_em_dashes += 1;
        self.replacements_made += 1;
        *self.by_type.entry(category.slug().to_string()).or_insert(0) += 1;
        Ok(())
    }

    /// Count one occurrence routed to manual review
    pub fn record_skip(&mut self, entry: ManualReviewEntry) -> Result<(), TypesError> {
        self.ensure_running()?;
        self.total_em_dashes += 1;
        self.skipped_low_confidence += 1;
        self.manual_review.push(entry);
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), TypesError> {
        if self.replacements_made + self.skipped_low_confidence != self.total_em_dashes {
            return Err(TypesError::ConservationViolated {
                total: self.total_em_dashes,
                replacements: self.replacements_made,
                skipped: self.skipped_low_confidence,
            });
        }
        self.transition(RunStatus::Completed)?;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TypesError> {
        self.transition(RunStatus::Failed)?;
        self.failure = Some(reason.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn report(&self) -> ProcessingReport {
        ProcessingReport {
            total_em_dashes: self.total_em_dashes,
            replacements_made: self.replacements_made,
            skipped_low_confidence: self.skipped_low_confidence,
            by_type: self.by_type.clone(),
            manual_review_needed: self.manual_review.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn total_em_dashes(&self) -> usize {
        self.total_em_dashes
    }

    pub fn replacements_made(&self) -> usize {
        self.replacements_made
    }

    pub fn skipped_low_confidence(&self) -> usize {
        self.skipped_low_confidence
    }

    pub fn by_type(&self) -> &BTreeMap<String, usize> {
        &self.by_type
    }

    pub fn manual_review(&self) -> &[ManualReviewEntry] {
        &self.manual_review
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn review(line_number: usize) -> ManualReviewEntry {
        ManualReviewEntry {
            line_number,
            context_before: "before".to_string(),
            context_after: "after".to_string(),
            reason: "confidence 0.50 below threshold 0.60".to_string(),
        }
    }

    #[test]
    fn test_run_lifecycle() {
        let mut run = ProcessingRun::new("chapter-01.md", 0.7, false);
        assert_eq!(run.status(), RunStatus::Pending);

        run.start().unwrap();
        run.record_replacement(Category::Parenthetical).unwrap();
        run.record_replacement(Category::Parenthetical).unwrap();
        run.record_skip(review(4)).unwrap();
        run.complete().unwrap();

        assert_eq!(run.status(), RunStatus::Completed);
        assert!(run.started_at().is_some());
        assert!(run.finished_at().is_some());

        let report = run.report();
        assert_eq!(report.total_em_dashes, 3);
        assert_eq!(report.replacements_made, 2);
        assert_eq!(report.skipped_low_confidence, 1);
        assert_eq!(report.by_type.get("parenthetical"), Some(&2));
        assert_eq!(report.manual_review_needed, vec![review(4)]);
    }

    #[test]
    fn test_counters_frozen_outside_running() {
        let mut run = ProcessingRun::new("doc", 0.8, true);
        assert!(run.record_replacement(Category::General).is_err());

        run.start().unwrap();
        run.complete().unwrap();
        assert_eq!(
            run.record_skip(review(1)),
            Err(TypesError::InvalidTransition {
                from: RunStatus::Completed,
                to: RunStatus::Running,
            })
        );
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut run = ProcessingRun::new("doc", 0.8, false);
        assert!(run.complete().is_err());
        assert!(run.fail("too early").is_err());

        run.start().unwrap();
        assert!(run.start().is_err());
        run.fail("disk full").unwrap();
        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(run.failure(), Some("disk full"));
        assert!(run.complete().is_err());
    }

    #[test]
    fn test_status_parse() {
        for status in [
            RunStatus::Pending,
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<RunStatus>(), Ok(status));
        }
        assert!(RunStatus::Completed.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn test_report_serializes_expected_fields() {
        let mut run = ProcessingRun::new("doc", 0.8, false);
        run.start().unwrap();
        run.record_replacement(Category::ClauseSeparator).unwrap();
        run.complete().unwrap();

        let json = serde_json::to_value(run.report()).unwrap();
        assert_eq!(json["total_em_dashes"], 1);
        assert_eq!(json["replacements_made"], 1);
        assert_eq!(json["skipped_low_confidence"], 0);
        assert_eq!(json["by_type"]["clause_separator"], 1);
        assert!(json["manual_review_needed"].as_array().unwrap().is_empty());
    }
}
