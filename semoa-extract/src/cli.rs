//! Command-line arguments
//!
//! CLI values override the TOML configuration; directories additionally go
//! through the CLI > ENV > TOML > default resolution.

use crate::pipeline::PipelineOptions;
use clap::Parser;
use semoa_common::config::{FilterMode, TomlConfig};
use std::path::PathBuf;

/// Command-line arguments for semoa-extract
#[derive(Parser, Debug, Clone)]
#[command(name = "semoa-extract")]
#[command(about = "Build a cross-referenced relational dataset from partitioned bibliographic snapshots")]
#[command(version)]
pub struct Args {
    /// TOML configuration file (default: <config_dir>/semoa/config.toml)
    #[arg(short, long, env = "SEMOA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root directory with one partition directory per entity kind
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Directory for output tables, snapshot and report
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Stop the works scan after this many accepted works
    #[arg(long, conflicts_with = "unlimited")]
    pub max_works: Option<u64>,

    /// Scan every work partition, ignoring any configured cap
    #[arg(long)]
    pub unlimited: bool,

    /// Work filter: "all" or "recent-journal-articles"
    #[arg(long)]
    pub filter: Option<FilterMode>,

    /// Lowest publication year for the recent-journal-articles filter
    #[arg(long)]
    pub min_year: Option<i64>,

    #[arg(long)]
    pub skip_works: bool,

    #[arg(long)]
    pub skip_entities: bool,

    #[arg(long)]
    pub skip_check: bool,

    /// Run the entity resolvers one after another
    #[arg(long)]
    pub sequential: bool,
}

impl Args {
    /// Fold the arguments into the loaded configuration
    pub fn apply(&self, config: &mut TomlConfig) {
        if self.unlimited {
            config.works.max_works = None;
        } else if let Some(max_works) = self.max_works {
            config.works.max_works = Some(max_works);
        }
        if let Some(filter) = self.filter {
            config.works.filter = filter;
        }
        if let Some(min_year) = self.min_year {
            config.works.min_year = min_year;
        }
        if self.sequential {
            config.entities.parallel = false;
        }
    }

    /// Pipeline options for a configuration the arguments were applied to
    pub fn options(&self, config: &TomlConfig) -> PipelineOptions {
        let data_dir = config.resolve_data_dir(self.data_dir.as_deref());
        let output_dir = config.resolve_output_dir(self.output_dir.as_deref());
        PipelineOptions {
            run_works: !self.skip_works,
            run_entities: !self.skip_entities,
            run_check: !self.skip_check,
            ..PipelineOptions::new(config, data_dir, output_dir)
        }
    }
}
