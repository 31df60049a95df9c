use configuration::error::ConfigError;
use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to open trade log '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Required column '{0}' is missing from the trade log header")]
    MissingColumn(&'static str),

    #[error("Invalid value at row {row}, column '{field}': '{value}' ({reason})")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] CoreError),

    #[error("Loader configuration error: {0}")]
    Config(#[from] ConfigError),
}
