//! Error types for retail-etl
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use crate::stage::validate::ValidationFailure;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error types
///
/// Every stage converts its failures into one of these variants and hands
/// them to the runner inside a [`StageOutcome`](crate::stage::StageOutcome).
#[derive(Error, Debug)]
pub enum Error {
    /// File extension is not one the record store understands
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Dataset could not be read or parsed
    #[error("Error loading data: {0}")]
    Load(String),

    /// Type coercion failed on a required column
    #[error("Error cleaning data: column '{column}': {reason}")]
    Cleaning {
        /// Offending column
        column: String,
        /// Why coercion failed
        reason: String,
    },

    /// A named validation check was violated
    #[error("Validation failed: {0}")]
    Validation(ValidationFailure),

    /// Derived columns could not be computed
    #[error("Error transforming data: {0}")]
    Transformation(String),

    /// Dataset could not be persisted
    #[error("Error saving data: {0}")]
    Save(String),

    /// A stage that needs a dataset was handed none
    #[error("No dataset available for stage '{0}'")]
    MissingDataset(&'static str),

    /// Chart or HTML generation failed
    #[error("Report error: {0}")]
    Report(String),

    /// Configuration rejected before the run started
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a cleaning error for `column`.
    pub fn cleaning(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Cleaning {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
