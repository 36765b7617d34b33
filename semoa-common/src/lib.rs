//! # SemOpenAlex Common Library
//!
//! Shared code for the dataset builder:
//! - Error type and result alias
//! - Configuration loading (TOML bootstrap + directory resolution)
//! - Identifier normalization and optional-field access on JSON records
//! - Partition discovery and the compressed record reader
//! - Frontier sets and the hand-off snapshot between passes
//! - Table catalogue, row types and the CSV table writer

pub mod config;
pub mod error;
pub mod fields;
pub mod frontier;
pub mod ids;
pub mod partitions;
pub mod records;
pub mod tables;

pub use error::{Error, Result};
pub use frontier::{Frontier, FrontierSnapshot};
pub use ids::normalize_id;
pub use records::{ReaderStats, RecordReader};
