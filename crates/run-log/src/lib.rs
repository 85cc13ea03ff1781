//! Persistent log of em dash findings and processing runs.
//!
//! The log is a sink: the engine never depends on it, and callers treat a
//! failed write as a warning rather than a failed run.

pub mod error;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared_types::{
    Category, Confidence, Finding, Occurrence, ProcessingRun, RunStatus, Suggestion, EM_DASH,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

pub use error::LogError;

/// One row of the `processing_runs` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub document_id: String,
    pub status: RunStatus,
    pub dry_run: bool,
    pub confidence_threshold: f64,
    pub total_em_dashes: usize,
    pub replacements_made: usize,
    pub skipped_low_confidence: usize,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub failure: Option<String>,
}

type FindingRow = (
    i64,
    i64,
    i64,
    String,
    String,
    String,
    String,
    String,
    f64,
    String,
    Option<String>,
);

type RunRow = (
    String,
    String,
    String,
    bool,
    f64,
    i64,
    i64,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
);

pub struct RunLog {
    pool: SqlitePool,
}

impl RunLog {
    /// Connect to a SQLite URL (e.g. `sqlite:emdash-log.db?mode=rwc`) and
    /// create the tables if needed
    pub async fn connect(url: &str) -> Result<Self, LogError> {
        tracing::info!("Connecting to run log: {}", url);

        // an in-memory database lives only as long as its single connection
        let options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(url).await?;

        let log = Self { pool };
        log.run_migrations().await?;
        Ok(log)
    }

    pub async fn in_memory() -> Result<Self, LogError> {
        Self::connect("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<(), LogError> {
        tracing::debug!("Running run log migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS em_dash_findings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                original_text TEXT NOT NULL,
                line_number INTEGER NOT NULL,
                column_number INTEGER NOT NULL,
                byte_offset INTEGER NOT NULL,
                context_before TEXT NOT NULL,
                context_after TEXT NOT NULL,
                sentence TEXT NOT NULL,
                replacement TEXT NOT NULL,
                category TEXT NOT NULL,
                confidence REAL NOT NULL,
                rationale TEXT NOT NULL,
                rule_id TEXT,
                recorded_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_findings_document ON em_dash_findings(document_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processing_runs (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                status TEXT NOT NULL,
                dry_run INTEGER NOT NULL,
                confidence_threshold REAL NOT NULL,
                total_em_dashes INTEGER NOT NULL,
                replacements_made INTEGER NOT NULL,
                skipped_low_confidence INTEGER NOT NULL,
                by_type_json TEXT NOT NULL,
                manual_review_json TEXT NOT NULL,
                started_at TEXT,
                finished_at TEXT,
                failure TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append one analysis batch; returns the number of rows written
    pub async fn record_findings(
        &self,
        document_id: &str,
        findings: &[Finding],
    ) -> Result<usize, LogError> {
        let batch_id = Uuid::new_v4().to_string();
        let recorded_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for finding in findings {
            let (o, s) = (&finding.occurrence, &finding.suggestion);
            sqlx::query(
                r#"
                INSERT INTO em_dash_findings (
                    batch_id, document_id, original_text, line_number, column_number,
                    byte_offset, context_before, context_after, sentence, replacement,
                    category, confidence, rationale, rule_id, recorded_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&batch_id)
            .bind(document_id)
            .bind(EM_DASH.to_string())
            .bind(o.line_number as i64)
            .bind(o.column as i64)
            .bind(o.byte_offset as i64)
            .bind(&o.context_before)
            .bind(&o.context_after)
            .bind(&o.sentence)
            .bind(&s.replacement)
            .bind(s.category.slug())
            .bind(s.confidence.value())
            .bind(&s.rationale)
            .bind(s.rule_id.as_deref())
            .bind(&recorded_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            "Recorded {} findings for {} (batch {})",
            findings.len(),
            document_id,
            batch_id
        );
        Ok(findings.len())
    }

    /// Findings from the most recent batch recorded for `document_id`, in
    /// document order
    pub async fn load_findings(&self, document_id: &str) -> Result<Vec<Finding>, LogError> {
        let rows: Vec<FindingRow> = sqlx::query_as(
            r#"
            SELECT line_number, column_number, byte_offset, context_before, context_after,
                   sentence, replacement, category, confidence, rationale, rule_id
            FROM em_dash_findings
            WHERE batch_id = (
                SELECT batch_id FROM em_dash_findings
                WHERE document_id = ?
                ORDER BY id DESC LIMIT 1
            )
            ORDER BY id
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(finding_from_row).collect()
    }

    /// Store a finished run as a single row
    pub async fn record_run(&self, run: &ProcessingRun) -> Result<(), LogError> {
        let by_type = serde_json::to_string(run.by_type())?;
        let manual_review = serde_json::to_string(run.manual_review())?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO processing_runs (
                id, document_id, status, dry_run, confidence_threshold, total_em_dashes,
                replacements_made, skipped_low_confidence, by_type_json, manual_review_json,
                started_at, finished_at, failure
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run.id())
        .bind(run.document_id())
        .bind(run.status().to_string())
        .bind(run.dry_run())
        .bind(run.confidence_threshold())
        .bind(run.total_em_dashes() as i64)
        .bind(run.replacements_made() as i64)
        .bind(run.skipped_low_confidence() as i64)
        .bind(by_type)
        .bind(manual_review)
        .bind(run.started_at().map(|t| t.to_rfc3339()))
        .bind(run.finished_at().map(|t| t.to_rfc3339()))
        .bind(run.failure())
        .execute(&self.pool)
        .await?;

        tracing::debug!("Recorded run {} ({})", run.id(), run.status());
        Ok(())
    }

    /// Most recent runs first
    pub async fn recent_runs(&self, limit: u32) -> Result<Vec<RunSummary>, LogError> {
        let rows: Vec<RunRow> = sqlx::query_as(
            r#"
            SELECT id, document_id, status, dry_run, confidence_threshold, total_em_dashes,
                   replacements_made, skipped_low_confidence, started_at, finished_at, failure
            FROM processing_runs
            ORDER BY rowid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(summary_from_row).collect()
    }
}

fn count(value: i64, column: &str) -> Result<usize, LogError> {
    usize::try_from(value).map_err(|_| LogError::Corrupt(format!("negative {}: {}", column, value)))
}

fn finding_from_row(row: FindingRow) -> Result<Finding, LogError> {
    let (
        line_number,
        column,
        byte_offset,
        context_before,
        context_after,
        sentence,
        replacement,
        category,
        confidence,
        rationale,
        rule_id,
    ) = row;

    let occurrence = Occurrence {
        line_number: count(line_number, "line_number")?,
        column: count(column, "column_number")?,
        byte_offset: count(byte_offset, "byte_offset")?,
        context_before,
        context_after,
        sentence,
    };
    let suggestion = Suggestion {
        replacement,
        category: category.parse::<Category>().map_err(LogError::Corrupt)?,
        confidence: Confidence::new(confidence).map_err(|e| LogError::Corrupt(e.to_string()))?,
        rationale,
        rule_id,
    };
    Ok(Finding::new(occurrence, suggestion))
}

fn summary_from_row(row: RunRow) -> Result<RunSummary, LogError> {
    let (
        id,
        document_id,
        status,
        dry_run,
        confidence_threshold,
        total,
        replaced,
        skipped,
        started_at,
        finished_at,
        failure,
    ) = row;

    Ok(RunSummary {
        id,
        document_id,
        status: status.parse::<RunStatus>().map_err(LogError::Corrupt)?,
        dry_run,
        confidence_threshold,
        total_em_dashes: count(total, "total_em_dashes")?,
        replacements_made: count(replaced, "replacements_made")?,
        skipped_low_confidence: count(skipped, "skipped_low_confidence")?,
        started_at,
        finished_at,
        failure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared_types::ManualReviewEntry;

    fn finding(line_number: usize, before: &str, after: &str, category: Category) -> Finding {
        Finding::new(
            Occurrence {
                line_number,
                column: before.chars().count(),
                byte_offset: before.len(),
                context_before: before.to_string(),
                context_after: after.to_string(),
                sentence: format!("{}—{}", before, after),
            },
            Suggestion {
                replacement: ", ".to_string(),
                category,
                confidence: Confidence::new(0.85).unwrap(),
                rationale: "test".to_string(),
                rule_id: Some(category.slug().to_string()),
            },
        )
    }

    #[tokio::test]
    async fn test_findings_roundtrip_latest_batch() {
        let log = RunLog::in_memory().await.unwrap();
        let first = vec![finding(1, "Old", "text", Category::General)];
        let second = vec![
            finding(1, "The plan", "our vision", Category::Parenthetical),
            finding(2, "Budget", "15% land", Category::DefinitionIntroduction),
        ];

        log.record_findings("ch1.md", &first).await.unwrap();
        assert_eq!(log.record_findings("ch1.md", &second).await.unwrap(), 2);
        log.record_findings("ch2.md", &first).await.unwrap();

        assert_eq!(log.load_findings("ch1.md").await.unwrap(), second);
        assert!(log.load_findings("missing.md").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_and_list_runs() {
        let log = RunLog::in_memory().await.unwrap();

        let mut done = ProcessingRun::new("ch1.md", 0.7, false);
        done.start().unwrap();
        done.record_replacement(Category::Parenthetical).unwrap();
        done.record_skip(ManualReviewEntry {
            line_number: 3,
            context_before: "ran north".to_string(),
            context_after: "the valley".to_string(),
            reason: "confidence 0.50 below threshold 0.70 (general)".to_string(),
        })
        .unwrap();
        done.complete().unwrap();
        log.record_run(&done).await.unwrap();

        let mut failed = ProcessingRun::new("ch2.md", 0.8, false);
        failed.start().unwrap();
        failed.fail("Failed to write ch2.md").unwrap();
        log.record_run(&failed).await.unwrap();

        let runs = log.recent_runs(10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].document_id, "ch2.md");
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert_eq!(runs[0].failure.as_deref(), Some("Failed to write ch2.md"));

        assert_eq!(runs[1].status, RunStatus::Completed);
        assert_eq!(runs[1].total_em_dashes, 2);
        assert_eq!(runs[1].replacements_made, 1);
        assert_eq!(runs[1].skipped_low_confidence, 1);
        assert!(runs[1].finished_at.is_some());

        assert_eq!(log.recent_runs(1).await.unwrap().len(), 1);
    }
}
