//! semoa-extract library interface
//!
//! Two-pass dataset builder: the works stage scans work records and writes
//! the frontier snapshot, the entity stage resolves the frontier against each
//! entity kind's partitions, and the check stage reports dangling keys.

pub mod cli;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod integrity;
pub mod logging;
pub mod pipeline;
pub mod resolver;
pub mod stats;
pub mod work_scanner;

pub use crate::error::{PipelineError, Result};
pub use crate::pipeline::{run, PipelineOptions, RunSummary};
