//! Summary of an analysis pass

use serde::{Deserialize, Serialize};
use shared_types::Finding;
use std::collections::BTreeMap;

use crate::config::EngineConfig;

/// High-confidence share needed to proceed without review
pub const AUTOMATED_RATIO: f64 = 0.8;
/// High-confidence share needed to proceed with spot checks
pub const CAUTION_RATIO: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "proceed automated")]
    ProceedAutomated,
    #[serde(rename = "proceed with caution")]
    ProceedWithCaution,
    #[serde(rename = "manual review required")]
    ManualReviewRequired,
}

impl Recommendation {
    pub fn from_high_ratio(ratio: f64) -> Self {
        if ratio >= AUTOMATED_RATIO {
            Recommendation::ProceedAutomated
        } else if ratio >= CAUTION_RATIO {
            Recommendation::ProceedWithCaution
        } else {
            Recommendation::ManualReviewRequired
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub total_matches: usize,
    pub replacement_types: BTreeMap<String, usize>,
    pub confidence_distribution: ConfidenceDistribution,
    pub average_confidence: f64,
    pub manual_review_needed: usize,
    pub processing_recommendation: Recommendation,
}

impl AnalysisReport {
    /// Bucket and count findings. `threshold` decides what needs manual review.
    pub fn from_findings(findings: &[Finding], config: &EngineConfig, threshold: f64) -> Self {
        let mut replacement_types = BTreeMap::new();
        let mut distribution = ConfidenceDistribution::default();
        let mut manual_review_needed = 0;
        let mut sum = 0.0;

        for finding in findings {
            let confidence = finding.suggestion.confidence.value();
            *replacement_types
                .entry(finding.suggestion.category.slug().to_string())
                .or_insert(0) += 1;

            if confidence >= config.high_confidence {
                distribution.high += 1;
            } else if confidence >= config.medium_confidence {
                distribution.medium += 1;
            } else {
                distribution.low += 1;
            }
            if confidence < threshold {
                manual_review_needed += 1;
            }
            sum += confidence;
        }

        let total = findings.len();
        let (average_confidence, high_ratio) = if total == 0 {
            (0.0, 1.0)
        } else {
            (sum / total as f64, distribution.high as f64 / total as f64)
        };

        Self {
            total_matches: total,
            replacement_types,
            confidence_distribution: distribution,
            average_confidence,
            manual_review_needed,
            processing_recommendation: Recommendation::from_high_ratio(high_ratio),
        }
    }
}
