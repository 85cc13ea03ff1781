//! Confidence refinement for rule-matched suggestions

use shared_types::Confidence;

pub const CONTEXT_BONUS: f64 = 0.1;
/// Combined before/after context must exceed this many characters
pub const CONTEXT_MIN_CHARS: usize = 20;
pub const COMPLETE_SENTENCE_BONUS: f64 = 0.1;
pub const SPECIFICITY_BONUS: f64 = 0.15;
pub const MAX_CONSISTENCY_BONUS: f64 = 0.2;

/// Evidence gathered around one occurrence
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfidenceFactors {
    pub context_chars: usize,
    pub sentence_complete: bool,
    pub high_specificity: bool,
    /// Fraction of the other occurrences in the batch sharing this category
    pub consistency: f64,
}

impl ConfidenceFactors {
    /// Share of the *other* occurrences in a batch of `batch_size` that have
    /// the same category. A batch of one has no peers and scores zero.
    pub fn consistency_fraction(same_category_others: usize, batch_size: usize) -> f64 {
        if batch_size <= 1 {
            return 0.0;
        }
        same_category_others as f64 / (batch_size - 1) as f64
    }
}

/// Base confidence plus additive bonuses, clamped to [0, 1].
///
/// Rounded to four decimals so that sums such as 0.7 + 0.1 compare equal to
/// the threshold an operator typed.
pub fn calculate_confidence(base: Confidence, factors: &ConfidenceFactors) -> Confidence {
    let mut score = base.value();

    if factors.context_chars > CONTEXT_MIN_CHARS {
        score += CONTEXT_BONUS;
    }
    if factors.sentence_complete {
        score += COMPLETE_SENTENCE_BONUS;
    }
    if factors.high_specificity {
        score += SPECIFICITY_BONUS;
    }
    score += MAX_CONSISTENCY_BONUS * factors.consistency.clamp(0.0, 1.0);

    Confidence::clamped((score * 10_000.0).round() / 10_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(v: f64) -> Confidence {
        Confidence::new(v).unwrap()
    }

    #[test]
    fn test_no_factors_keeps_base() {
        let c = calculate_confidence(base(0.6), &ConfidenceFactors::default());
        assert_eq!(c.value(), 0.6);
    }

    #[test]
    fn test_bonuses_are_additive() {
        let factors = ConfidenceFactors {
            context_chars: 21,
            sentence_complete: true,
            high_specificity: false,
            consistency: 0.0,
        };
        assert_eq!(calculate_confidence(base(0.5), &factors).value(), 0.7);

        let factors = ConfidenceFactors {
            consistency: 0.5,
            ..factors
        };
        assert_eq!(calculate_confidence(base(0.5), &factors).value(), 0.8);
    }

    #[test]
    fn test_context_bonus_needs_more_than_twenty_chars() {
        let factors = ConfidenceFactors {
            context_chars: 20,
            ..Default::default()
        };
        assert_eq!(calculate_confidence(base(0.5), &factors).value(), 0.5);
    }

    #[test]
    fn test_clamped_at_one() {
        let factors = ConfidenceFactors {
            context_chars: 100,
            sentence_complete: true,
            high_specificity: true,
            consistency: 1.0,
        };
        assert_eq!(calculate_confidence(base(0.9), &factors).value(), 1.0);
    }

    #[test]
    fn test_consistency_fraction() {
        assert_eq!(ConfidenceFactors::consistency_fraction(0, 1), 0.0);
        assert_eq!(ConfidenceFactors::consistency_fraction(0, 0), 0.0);
        assert_eq!(ConfidenceFactors::consistency_fraction(1, 2), 1.0);
        assert_eq!(ConfidenceFactors::consistency_fraction(1, 3), 0.5);
    }
}
