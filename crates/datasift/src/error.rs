//! Error types for the datasift library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for datasift operations.
#[derive(Debug, Error)]
pub enum DatasiftError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file or no data to analyze.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Input that is readable but not acceptable (bad header, missing column, bad parameter).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// The rule interpretation service failed, timed out or answered badly.
    #[error("Interpretation service error: {0}")]
    Llm(String),

    /// Unexpected failure inside the pipeline.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Who is at fault for an error, as seen by a caller of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The supplied dataset or rules table is malformed.
    Client,
    /// The pipeline itself failed.
    Server,
}

impl DatasiftError {
    /// Classify the error for boundary reporting.
    pub fn fault(&self) -> Fault {
        match self {
            DatasiftError::Io { .. }
            | DatasiftError::Csv(_)
            | DatasiftError::EmptyData(_)
            | DatasiftError::InvalidInput(_) => Fault::Client,
            _ => Fault::Server,
        }
    }
}

/// Result type alias for datasift operations.
pub type Result<T> = std::result::Result<T, DatasiftError>;
