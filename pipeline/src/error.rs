//! Error types for the spill cleaning pipeline.
//!
//! - [`CsvError`] - loading and writing flat files
//! - [`ConfigError`] - pipeline configuration
//! - [`ChartError`] - figure rendering
//! - [`PipelineError`] - top-level orchestration
//!
//! Per-cell coercion problems are never errors: the stages substitute a
//! documented default (null timestamp, zero quantity, `Unknown`/`Other`
//! category) and keep going.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or writing a CSV table.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write the file.
    #[error("Failed to access file: {0}")]
    IoError(#[from] std::io::Error),

    /// Content is not tabular.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Header row is missing or blank.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(e) => CsvError::IoError(e),
            other => CsvError::ParseError(format!("{:?}", other)),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading or checking a [`crate::config::PipelineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("Config IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Config JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Structurally valid but unusable configuration.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

// =============================================================================
// Chart Errors
// =============================================================================

/// Errors while rendering figures.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Could not create the figures directory.
    #[error("Figure IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The drawing backend failed.
    #[error("Failed to render '{chart}': {message}")]
    Render { chart: String, message: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error returned by [`crate::transform::pipeline::process_file`]
/// and the report entry points. It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Chart error.
    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    /// A column the requested step cannot do without.
    #[error("Missing column: {0}")]
    MissingColumn(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for chart operations.
pub type ChartResult<T> = Result<T, ChartError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
