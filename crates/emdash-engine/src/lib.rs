//! Contextual em dash analysis and replacement.
//!
//! Text flows one way: the [`PatternAnalyzer`] turns a document into scored
//! [`Finding`]s, and the [`ReplacementApplier`] substitutes them back into the
//! document, producing a [`ProcessingRun`]. Both borrow one immutable
//! [`RuleTable`] built at startup.

pub mod analyzer;
pub mod applier;
pub mod confidence;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod patterns;
pub mod report;
pub mod rules;
pub mod similarity;

pub use analyzer::PatternAnalyzer;
pub use applier::{ApplyOutcome, ReplacementApplier};
pub use config::EngineConfig;
pub use document::SourceDocument;
pub use error::{ApplyFailure, EngineError};
pub use report::{AnalysisReport, Recommendation};
pub use rules::{Rule, RuleSpec, RuleTable};
pub use shared_types::{Finding, ProcessingRun};

/// Engine entry point owning the configuration and the rule table
pub struct EmDashEngine {
    config: EngineConfig,
    rules: RuleTable,
}

impl EmDashEngine {
    pub fn new(config: EngineConfig, rules: RuleTable) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config, rules })
    }

    /// Validate `config` and load the rule table it names
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let rules = config.load_rules()?;
        Self::new(config, rules)
    }

    pub fn analyzer(&self) -> PatternAnalyzer<'_> {
        PatternAnalyzer::new(&self.rules, &self.config)
    }

    pub fn applier(&self) -> ReplacementApplier<'_> {
        ReplacementApplier::new(&self.config)
    }

    pub fn analyze(&self, text: &str) -> Vec<Finding> {
        self.analyzer().analyze(text)
    }

    pub fn report(&self, findings: &[Finding], threshold: f64) -> AnalysisReport {
        AnalysisReport::from_findings(findings, &self.config, threshold)
    }

    /// Analyze and apply in one pass over a document already in memory
    pub fn process(
        &self,
        document: &SourceDocument,
        confidence_threshold: f64,
        dry_run: bool,
    ) -> Result<(Vec<Finding>, ApplyOutcome), EngineError> {
        let findings = self.analyze(&document.text);
        let outcome =
            self.applier()
                .apply(document, &findings, confidence_threshold, dry_run)?;
        Ok((findings, outcome))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }
}

impl Default for EmDashEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            rules: RuleTable::default(),
        }
    }
}
