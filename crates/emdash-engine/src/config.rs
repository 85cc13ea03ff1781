//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::rules::RuleTable;

/// Largest accepted `context_window`, in characters
pub const MAX_CONTEXT_WINDOW: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Characters captured on each side of a dash
    pub context_window: usize,
    /// Minimum similarity score for a stored suggestion to be considered
    pub similarity_floor: f64,
    /// Default threshold for applying a suggestion
    pub confidence_threshold: f64,
    /// Lower bound of the "high" confidence bucket
    pub high_confidence: f64,
    /// Lower bound of the "medium" confidence bucket
    pub medium_confidence: f64,
    /// JSON rule file replacing the built-in table
    pub rules_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_window: 50,
            similarity_floor: 0.3,
            confidence_threshold: 0.8,
            high_confidence: 0.8,
            medium_confidence: 0.6,
            rules_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_json(&json)?;

        // rule files are resolved relative to the config file
        if let (Some(rules), Some(dir)) = (config.rules_path.as_ref(), path.parent()) {
            if rules.is_relative() {
                config.rules_path = Some(dir.join(rules));
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(EngineError::Config(format!("{} must be in [0, 1], got {}", name, v)))
            }
        };
        unit("similarity_floor", self.similarity_floor)?;
        unit("confidence_threshold", self.confidence_threshold)?;
        unit("high_confidence", self.high_confidence)?;
        unit("medium_confidence", self.medium_confidence)?;

        if self.medium_confidence > self.high_confidence {
            return Err(EngineError::Config(
                "medium_confidence must not exceed high_confidence".to_string(),
            ));
        }
        if !(1..=MAX_CONTEXT_WINDOW).contains(&self.context_window) {
            return Err(EngineError::Config(format!(
                "context_window must be in [1, {}], got {}",
                MAX_CONTEXT_WINDOW, self.context_window
            )));
        }
        Ok(())
    }

    /// Build the rule table this configuration points at
    pub fn load_rules(&self) -> Result<RuleTable, EngineError> {
        match &self.rules_path {
            Some(path) => RuleTable::from_file(path),
            None => Ok(RuleTable::default()),
        }
    }
}
