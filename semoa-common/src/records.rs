//! Compressed record reader
//!
//! Turns an ordered list of gzip-compressed JSON-lines files into a lazy
//! stream of decoded records, file order first, then line order. A file may
//! hold several concatenated gzip members; all of them are read. The stream is
//! finite and single-use; build a new reader to scan again.
//!
//! **Failure policy:**
//! - a line that does not decode is skipped and counted, never raised
//! - a file that cannot be opened, or whose gzip stream breaks mid-way, is
//!   abandoned (counted as unreadable) and the reader moves to the next file

use crate::partitions::PartitionSet;
use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Reader counters, reported once the stream is drained
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderStats {
    /// Files successfully opened
    pub files_opened: usize,
    /// Files that failed to open or broke mid-stream
    pub unreadable_files: usize,
    /// Raw lines read, blank and malformed included
    pub lines_read: u64,
    /// Whitespace-only lines skipped
    pub blank_lines: u64,
    /// Lines that failed to decode as JSON
    pub malformed_lines: u64,
    /// Records handed to the consumer
    pub records: u64,
}

impl ReaderStats {
    pub fn display_string(&self) -> String {
        format!(
            "{} files ({} unreadable), {} lines, {} records, {} malformed",
            self.files_opened,
            self.unreadable_files,
            self.lines_read,
            self.records,
            self.malformed_lines
        )
    }
}

struct OpenFile {
    path: PathBuf,
    reader: BufReader<MultiGzDecoder<File>>,
    line_no: u64,
}

/// Lazy record stream over a sequence of `.gz` JSON-lines files
pub struct RecordReader {
    pending: VecDeque<PathBuf>,
    current: Option<OpenFile>,
    buf: Vec<u8>,
    stats: ReaderStats,
}

impl RecordReader {
    /// Create a reader over `files`, consumed in the given order
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            pending: files.into_iter().map(Into::into).collect(),
            current: None,
            buf: Vec::with_capacity(8 * 1024),
            stats: ReaderStats::default(),
        }
    }

    /// Create a reader over every shard of a discovered partition set
    pub fn from_partitions(set: &PartitionSet) -> Self {
        Self::new(set.files.iter().cloned())
    }

    /// File currently being read, if any
    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_ref().map(|f| f.path.as_path())
    }

    /// 1-based line number of the last line read from the current file
    pub fn current_line(&self) -> u64 {
        self.current.as_ref().map(|f| f.line_no).unwrap_or(0)
    }

    /// Files not yet opened
    pub fn files_remaining(&self) -> usize {
        self.pending.len()
    }

    /// Keep reading the current file to its end, but open no further files
    pub fn finish_after_current_file(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(
                skipped_files = self.pending.len(),
                "Reader will stop after the current file"
            );
            self.pending.clear();
        }
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    pub fn into_stats(self) -> ReaderStats {
        self.stats
    }

    fn open_next(&mut self) -> bool {
        while let Some(path) = self.pending.pop_front() {
            match File::open(&path) {
                Ok(file) => {
                    tracing::info!(file = %path.display(), "Reading partition file");
                    self.stats.files_opened += 1;
                    self.current = Some(OpenFile {
                        path,
                        reader: BufReader::new(MultiGzDecoder::new(file)),
                        line_no: 0,
                    });
                    return true;
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Cannot open partition file, skipping");
                    self.stats.unreadable_files += 1;
                }
            }
        }
        false
    }
}

impl Iterator for RecordReader {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            if self.current.is_none() && !self.open_next() {
                return None;
            }
            let file = self.current.as_mut()?;

            self.buf.clear();
            match file.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    tracing::debug!(file = %file.path.display(), lines = file.line_no, "Partition file finished");
                    self.current = None;
                }
                Ok(_) => {
                    file.line_no += 1;
                    self.stats.lines_read += 1;

                    if self.buf.iter().all(u8::is_ascii_whitespace) {
                        self.stats.blank_lines += 1;
                        continue;
                    }

                    match serde_json::from_slice::<Value>(&self.buf) {
                        Ok(record) => {
                            self.stats.records += 1;
                            return Some(record);
                        }
                        Err(e) => {
                            self.stats.malformed_lines += 1;
                            tracing::warn!(
                                file = %file.path.display(),
                                line = file.line_no,
                                error = %e,
                                "Skipping malformed line"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        file = %file.path.display(),
                        line = file.line_no,
                        error = %e,
                        "Partition stream broken, abandoning rest of file"
                    );
                    self.stats.unreadable_files += 1;
                    self.current = None;
                }
            }
        }
    }
}
