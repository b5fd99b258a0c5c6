use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input has no header row")]
    EmptyInput,

    #[error("Non-numeric value {value:?} in column '{column}' (row {row})")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Invalid date {value:?} at row {row}: expected a valid YYMMDD date")]
    InvalidDate { row: usize, value: String },

    #[error("Unknown operation type: {0}")]
    UnknownOperation(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ScopeError>;
