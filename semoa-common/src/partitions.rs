//! Partition file discovery
//!
//! Each entity kind lives in its own directory of gzip-compressed JSON-lines
//! shards. Two snapshot generations name their shards differently:
//!
//! - date-stamped: `[updated_date_]YYYY-MM-DD_part_NNN.jsonl.gz`
//! - legacy: `part_NNN.gz` or `part_NNN.jsonl.gz`
//!
//! The naming schemes are tried in priority order and the first one that
//! matches anything wins; the two are never mixed in one scan.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Shard naming scheme of one snapshot generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionNaming {
    DateStamped,
    Legacy,
}

impl PartitionNaming {
    /// Schemes in the order they are tried
    pub const PRIORITY: [PartitionNaming; 2] =
        [PartitionNaming::DateStamped, PartitionNaming::Legacy];

    /// Check whether a bare file name belongs to this scheme
    pub fn matches(self, file_name: &str) -> bool {
        let stem = match strip_gz_suffix(file_name) {
            Some(stem) => stem,
            None => return false,
        };
        match self {
            PartitionNaming::DateStamped => {
                let stem = stem.strip_prefix("updated_date_").unwrap_or(stem);
                match stem.split_once("_part_") {
                    Some((date, part)) => is_iso_date(date) && is_digits(part),
                    None => false,
                }
            }
            PartitionNaming::Legacy => stem
                .strip_prefix("part_")
                .map(is_digits)
                .unwrap_or(false),
        }
    }
}

/// Ordered shard list for one entity kind
#[derive(Debug, Clone)]
pub struct PartitionSet {
    /// Directory that was listed
    pub dir: PathBuf,
    /// Scheme the files matched, `None` if the directory held no shards
    pub naming: Option<PartitionNaming>,
    /// Shard paths in lexicographic file-name order
    pub files: Vec<PathBuf>,
}

impl PartitionSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// List the shards of one partition directory
///
/// Only direct children are considered. A missing directory is reported as
/// [`Error::MissingDirectory`] so that callers can skip just this kind.
pub fn discover(dir: &Path) -> Result<PartitionSet> {
    if !dir.exists() {
        return Err(Error::MissingDirectory(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Error accessing entry in {}: {}", dir.display(), e);
            }
        }
    }

    for naming in PartitionNaming::PRIORITY {
        let mut matched: Vec<&String> = names.iter().filter(|n| naming.matches(n)).collect();
        if matched.is_empty() {
            continue;
        }
        matched.sort();
        tracing::debug!(
            dir = %dir.display(),
            naming = ?naming,
            files = matched.len(),
            "Partition files discovered"
        );
        return Ok(PartitionSet {
            dir: dir.to_path_buf(),
            naming: Some(naming),
            files: matched.into_iter().map(|n| dir.join(n)).collect(),
        });
    }

    tracing::warn!("No partition files found in {}", dir.display());
    Ok(PartitionSet {
        dir: dir.to_path_buf(),
        naming: None,
        files: Vec::new(),
    })
}

fn strip_gz_suffix(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(".jsonl.gz")
        .or_else(|| file_name.strip_suffix(".gz"))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `YYYY-MM-DD`, shape only
fn is_iso_date(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    matches!(parts.as_slice(), [y, m, d] if y.len() == 4 && m.len() == 2 && d.len() == 2
        && is_digits(y) && is_digits(m) && is_digits(d))
}
