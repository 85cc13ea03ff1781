use std::path::PathBuf;

use shared_types::{ProcessingRun, TypesError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to read {document}: {source}")]
    Input {
        document: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rule '{id}': {reason}")]
    InvalidRule { id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Confidence threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    #[error(transparent)]
    Types(#[from] TypesError),
}

/// A file-level apply that did not commit.
///
/// `run` is `None` when the document could not be read (no run was
/// started), otherwise it holds the run in its `Failed` state.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ApplyFailure {
    pub run: Option<Box<ProcessingRun>>,
    #[source]
    pub error: EngineError,
}
