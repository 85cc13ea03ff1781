pub mod error;
pub mod run;
pub mod types;

pub use error::TypesError;
pub use run::{ManualReviewEntry, ProcessingReport, ProcessingRun, RunStatus};
pub use types::{Category, Confidence, Finding, Occurrence, Suggestion, EM_DASH};
