use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid trade at row {index}: field '{field}' = '{value}' {reason}")]
    Validation {
        index: usize,
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Unknown trade side '{0}' (expected BUY, SELL, LONG or SHORT)")]
    UnknownSide(String),
}
