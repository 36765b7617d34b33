//! Partition fixture helpers
//!
//! Builds a data directory of gzip JSON-lines shards and an output directory
//! inside one TempDir, and reads the written CSV tables back.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use semoa_common::config::TomlConfig;
use semoa_common::tables::Table;
use semoa_extract::PipelineOptions;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Fixture {
    pub temp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp.path().join("output")
    }

    /// Write one shard of `records` under `data/<kind>/<name>`
    pub fn write_part(&self, kind: &str, name: &str, records: &[Value]) -> PathBuf {
        let lines: Vec<String> = records.iter().map(Value::to_string).collect();
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        self.write_lines(kind, name, &lines)
    }

    /// Write raw lines (malformed JSON allowed) into a shard
    pub fn write_lines(&self, kind: &str, name: &str, lines: &[&str]) -> PathBuf {
        let dir = self.data_dir().join(kind);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut gz = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::fast());
        for line in lines {
            writeln!(gz, "{}", line).unwrap();
        }
        gz.finish().unwrap();
        path
    }

    /// Pipeline options over this fixture, all stages enabled, no works cap
    pub fn options(&self) -> PipelineOptions {
        let mut config = TomlConfig::default();
        config.works.max_works = None;
        PipelineOptions::new(&config, self.data_dir(), self.output_dir())
    }

    pub fn table_path(&self, table: Table) -> PathBuf {
        table.path_in(&self.output_dir())
    }

    /// Data rows of a written table, header excluded
    pub fn rows(&self, table: Table) -> Vec<Vec<String>> {
        read_rows(&self.table_path(table))
    }

    /// One column of a written table
    pub fn column(&self, table: Table, column: &str) -> Vec<String> {
        let index = table
            .columns()
            .iter()
            .position(|c| *c == column)
            .unwrap_or_else(|| panic!("{} has no column {}", table.name(), column));
        self.rows(table).into_iter().map(|row| row[index].clone()).collect()
    }
}

pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .unwrap_or_else(|e| panic!("open {}: {}", path.display(), e));
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

/// Pair of strings, for relation rows
pub fn pair(a: &str, b: &str) -> Vec<String> {
    vec![a.to_string(), b.to_string()]
}
