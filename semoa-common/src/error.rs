//! Common error types for the dataset builder

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for dataset builder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the extraction passes
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error outside the record stream
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV table read or write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Partition directory for an entity kind does not exist
    #[error("Partition directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// Frontier hand-off file missing, unreadable or of an unknown version
    #[error("Hand-off error: {0}")]
    HandOff(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
