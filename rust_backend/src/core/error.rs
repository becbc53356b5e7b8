//! Error types for pipeline operations.

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type for pipeline operations.
///
/// Data-quality problems (out-of-domain values, duplicates, nulls) are never
/// reported through this type; they end up as findings in a
/// [`ValidationReport`](crate::preprocessing::validator::ValidationReport) or
/// as steps in a [`CleaningLog`](crate::transformations::cleaning::CleaningLog).
/// Only structural conditions that abort a run are errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Schema violation: missing required columns [{}]", .0.join(", "))]
    SchemaViolation(Vec<String>),

    #[error("Invalid record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("DataFrame error: {0}")]
    DataFrameError(String),
}

impl From<polars::prelude::PolarsError> for PipelineError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        PipelineError::DataFrameError(e.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::IoError(e.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        PipelineError::ParseError(format!("CSV: {}", e))
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(e: toml::de::Error) -> Self {
        PipelineError::ConfigurationError(format!("Failed to parse config: {}", e))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::ParseError(format!("JSON: {}", e))
    }
}
