//! Error types for semoa-extract
//!
//! Library failures arrive as [`semoa_common::Error`]; this layer adds the
//! failures that only exist once stages are orchestrated.

use thiserror::Error;

/// Pipeline stage error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Works partitions could not be listed; nothing can be handed off
    #[error("Works stage failed: {0}")]
    Works(#[source] semoa_common::Error),

    /// Frontier snapshot unusable; the whole entity stage is aborted
    #[error("Entity stage aborted: {0}")]
    HandOff(#[source] semoa_common::Error),

    /// A blocking scan task panicked or was cancelled
    #[error("Scan task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// semoa-common error
    #[error("Common error: {0}")]
    Common(#[from] semoa_common::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
