use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// The only structurally significant character in a document (U+2014)
pub const EM_DASH: char = '\u{2014}';

/// A confidence score guaranteed to lie in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const ONE: Confidence = Confidence(1.0);

    /// Validating constructor; NaN and values outside [0, 1] are rejected
    pub fn new(value: f64) -> Result<Self, TypesError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TypesError::ConfidenceOutOfRange(value))
        }
    }

    /// Saturating constructor. NaN maps to zero.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = TypesError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Symbolic category of a replacement rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    NumericRange,
    DefinitionIntroduction,
    Parenthetical,
    ClauseSeparator,
    ListIntroduction,
    ListSummary,
    Interruption,
    CoordinatingConjunction,
    LinkingVerb,
    General,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::NumericRange,
        Category::DefinitionIntroduction,
        Category::Parenthetical,
        Category::ClauseSeparator,
        Category::ListIntroduction,
        Category::ListSummary,
        Category::Interruption,
        Category::CoordinatingConjunction,
        Category::LinkingVerb,
        Category::General,
    ];

    /// Stable identifier used in reports and the log store
    pub fn slug(self) -> &'static str {
        match self {
            Category::NumericRange => "numeric_range",
            Category::DefinitionIntroduction => "definition_introduction",
            Category::Parenthetical => "parenthetical",
            Category::ClauseSeparator => "clause_separator",
            Category::ListIntroduction => "list_introduction",
            Category::ListSummary => "list_summary",
            Category::Interruption => "interruption",
            Category::CoordinatingConjunction => "coordinating_conjunction",
            Category::LinkingVerb => "linking_verb",
            Category::General => "general",
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Category::NumericRange => "numeric range",
            Category::DefinitionIntroduction => "definition/list introduction",
            Category::Parenthetical => "parenthetical",
            Category::ClauseSeparator => "clause separator",
            Category::ListIntroduction => "list introduction",
            Category::ListSummary => "list summary",
            Category::Interruption => "interruption",
            Category::CoordinatingConjunction => "coordinating conjunction",
            Category::LinkingVerb => "linking verb",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.slug() == s)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// One detected em dash in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// 1-based line number
    pub line_number: usize,
    /// 0-based character index of the dash within its line
    pub column: usize,
    /// Byte offset of the dash within the whole document
    pub byte_offset: usize,
    pub context_before: String,
    pub context_after: String,
    /// Smallest enclosing sentence, clipped at the line
    pub sentence: String,
}

/// A proposed replacement for one occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub replacement: String,
    pub category: Category,
    pub confidence: Confidence,
    pub rationale: String,
    /// Id of the matched rule; `None` for heuristic fallbacks
    pub rule_id: Option<String>,
}

/// An occurrence together with its suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub occurrence: Occurrence,
    pub suggestion: Suggestion,
}

impl Finding {
    pub fn new(occurrence: Occurrence, suggestion: Suggestion) -> Self {
        Self {
            occurrence,
            suggestion,
        }
    }
}
