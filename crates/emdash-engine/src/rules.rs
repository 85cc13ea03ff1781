//! The ordered replacement rule table.
//!
//! Resolution is first-match-wins in table order, not best-score: a rule
//! placed earlier shadows any later rule whose pattern also matches. The
//! only place that walks the table is [`RuleTable::resolve`].

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use shared_types::{Category, Confidence, EM_DASH};
use std::collections::HashSet;
use std::path::Path;

use crate::error::EngineError;

/// Serializable form of a rule, as found in a rule file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    pub pattern: String,
    pub replacement: String,
    pub confidence: f64,
    pub category: Category,
    pub description: String,
    #[serde(default)]
    pub high_specificity: bool,
}

/// A compiled rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub pattern: Regex,
    pub replacement: String,
    pub confidence: Confidence,
    pub category: Category,
    pub description: String,
    pub high_specificity: bool,
}

impl Rule {
    pub fn compile(spec: RuleSpec) -> Result<Self, EngineError> {
        let pattern = RegexBuilder::new(&spec.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| EngineError::InvalidRule {
                id: spec.id.clone(),
                reason: e.to_string(),
            })?;
        let confidence =
            Confidence::new(spec.confidence).map_err(|e| EngineError::InvalidRule {
                id: spec.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id: spec.id,
            pattern,
            replacement: spec.replacement,
            confidence,
            category: spec.category,
            description: spec.description,
            high_specificity: spec.high_specificity,
        })
    }

    pub fn spec(&self) -> RuleSpec {
        RuleSpec {
            id: self.id.clone(),
            pattern: self.pattern.as_str().to_string(),
            replacement: self.replacement.clone(),
            confidence: self.confidence.value(),
            category: self.category,
            description: self.description.clone(),
            high_specificity: self.high_specificity,
        }
    }
}

fn spec(
    id: &str,
    pattern: &str,
    replacement: &str,
    confidence: f64,
    category: Category,
    description: &str,
    high_specificity: bool,
) -> RuleSpec {
    RuleSpec {
        id: id.to_string(),
        pattern: pattern.to_string(),
        replacement: replacement.to_string(),
        confidence,
        category,
        description: description.to_string(),
        high_specificity,
    }
}

/// Built-in rules in resolution order
pub fn default_specs() -> Vec<RuleSpec> {
    vec![
        spec(
            "numeric_range",
            r"\d\s*—\s*\d",
            "\u{2013}",
            0.90,
            Category::NumericRange,
            "Dash between two numbers marks a range",
            true,
        ),
        spec(
            "definition_introduction",
            r"—\s*[$€£]?\d",
            ": ",
            0.85,
            Category::DefinitionIntroduction,
            "Dash followed by figures introduces a definition or breakdown",
            true,
        ),
        spec(
            "parenthetical",
            r"—[^—.!?;:]{1,80}—",
            ", ",
            0.80,
            Category::Parenthetical,
            "Paired dashes set off a parenthetical aside",
            false,
        ),
        spec(
            "clause_separator",
            r"—\s*(however|therefore|thus|instead|otherwise|meanwhile|moreover|nevertheless|consequently|furthermore|indeed)\b",
            "; ",
            0.85,
            Category::ClauseSeparator,
            "Dash before a conjunctive adverb joins two independent clauses",
            true,
        ),
        spec(
            "list_introduction",
            r"\b(following|namely|include|includes|including|as follows)\s*—",
            ": ",
            0.80,
            Category::ListIntroduction,
            "Dash after an announcing phrase introduces a list",
            true,
        ),
        spec(
            "list_summary",
            r",[^—]*,[^—]*—\s*(all|everything|nothing|none|each|these|those|such)\b",
            ": ",
            0.75,
            Category::ListSummary,
            "Dash after a series introduces a summarizing word",
            false,
        ),
        spec(
            "interruption",
            r#"—\s*["”’']?\s*$"#,
            "...",
            0.60,
            Category::Interruption,
            "Dash at the end of a line or quotation marks broken-off speech",
            false,
        ),
    ]
}

lazy_static! {
    static ref DEFAULT_RULES: Vec<Rule> = default_specs()
        .into_iter()
        .map(|s| Rule::compile(s).unwrap())
        .collect();
}

/// Immutable, ordered rule table. Built once and shared by reference.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Compile a table from specs, keeping their order
    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(specs.len());

        for spec in specs {
            if !seen.insert(spec.id.clone()) {
                return Err(EngineError::InvalidRule {
                    id: spec.id,
                    reason: "duplicate rule id".to_string(),
                });
            }
            rules.push(Rule::compile(spec)?);
        }

        Ok(Self { rules })
    }

    /// Parse a JSON array of rule specs
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let specs: Vec<RuleSpec> = serde_json::from_str(json)
            .map_err(|e| EngineError::Config(format!("Invalid rule file: {}", e)))?;
        Self::from_specs(specs)
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Cannot read rule file {}: {}", path.display(), e))
        })?;
        let table = Self::from_json(&json)?;
        tracing::info!("Loaded {} rules from {}", table.len(), path.display());
        Ok(table)
    }

    /// Find the rule for an occurrence.
    ///
    /// Rules are tried in table order against `before + "—" + after`; the
    /// first pattern that matches wins even if a later rule would carry a
    /// higher confidence.
    pub fn resolve(&self, context_before: &str, context_after: &str) -> Option<&Rule> {
        let context = format!("{}{}{}", context_before, EM_DASH, context_after);
        self.rules.iter().find(|rule| rule.pattern.is_match(&context))
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }
}
