//! Error types for Sift Core.

use sift_abstraction::OracleFault;
use sift_dataset::DatasetError;
use thiserror::Error;

/// Core error type for Sift operations.
///
/// Oracle faults raised during a run never surface here; they are folded into
/// per-record failure reasons. `Oracle` only carries faults raised while
/// building an oracle from configuration.
#[derive(Error, Debug)]
pub enum SiftError {
    /// Invalid configuration; fatal before any oracle call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unreadable or invalid input artifacts.
    #[error("Input error: {0}")]
    Input(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Oracle construction errors
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleFault),

    /// Split and manifest errors
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Result type alias for Sift operations.
pub type Result<T> = std::result::Result<T, SiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sift_error_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: SiftError = io_err.into();
        assert!(matches!(err, SiftError::Io(_)));
    }

    #[test]
    fn test_sift_error_oracle_conversion() {
        let err: SiftError = OracleFault::Configuration("GEMINI_API_KEY not set".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Oracle error: Oracle configuration error: GEMINI_API_KEY not set"
        );
    }

    #[test]
    fn test_sift_error_dataset_conversion() {
        let err: SiftError = DatasetError::Empty.into();
        assert!(matches!(err, SiftError::Dataset(DatasetError::Empty)));
    }
}
