use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid time range: from {from} is after to {to}")]
    InvalidTimeRange { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
}

pub type Result<T> = std::result::Result<T, QueryError>;
