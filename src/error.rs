//! Error types for the brca-methylation library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum MethylError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Data acquisition failed: {0}")]
    Acquisition(String),

    #[error("Invalid beta value '{value}' at row {row}, column {col}")]
    InvalidValue {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Unknown tissue type '{0}'")]
    InvalidLabel(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Model did not converge: {0}")]
    Convergence(String),

    #[error("Survival analysis failed: {0}")]
    Survival(String),

    #[error("Plotting error: {0}")]
    Plot(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MethylError {
    /// Wrap a drawing backend failure.
    pub(crate) fn plot<E: std::fmt::Display>(err: E) -> Self {
        Self::Plot(err.to_string())
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, MethylError>;
