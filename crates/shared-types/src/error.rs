use thiserror::Error;

use crate::run::RunStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypesError {
    #[error("Confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("Invalid run transition: {from} -> {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },

    #[error(
        "Run counts do not add up: {replacements} replaced + {skipped} skipped != {total} found"
    )]
    ConservationViolated {
        total: usize,
        replacements: usize,
        skipped: usize,
    },
}
