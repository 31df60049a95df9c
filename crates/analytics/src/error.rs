use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// A trade record violates one of its field constraints. No partial result is produced.
    #[error("Validation error: {0}")]
    Validation(#[from] CoreError),

    #[error("Error in calculation of '{metric}': {reason}")]
    Calculation { metric: &'static str, reason: String },
}
