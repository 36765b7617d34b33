//! Configuration loading and directory resolution
//!
//! Bootstrap configuration comes from a single TOML file. Every field is
//! optional; a missing file means "all defaults".
//!
//! # Directory resolution priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`SEMOA_DATA_DIR`, `SEMOA_OUTPUT_DIR`)
//! 3. TOML config file
//! 4. Compiled default (`data`, `output`)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the input partition root
pub const DATA_DIR_ENV: &str = "SEMOA_DATA_DIR";

/// Environment variable overriding the output table directory
pub const OUTPUT_DIR_ENV: &str = "SEMOA_OUTPUT_DIR";

/// Default accepted-works cap, matching the historical pipeline
pub const DEFAULT_MAX_WORKS: u64 = 100_000;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root directory holding one partition directory per entity kind
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Directory receiving the output tables and the hand-off snapshot
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Primary scan settings
    #[serde(default)]
    pub works: WorksConfig,

    /// Secondary scan settings
    #[serde(default)]
    pub entities: EntitiesConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Which records the primary scan accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    /// Accept every record
    #[default]
    All,
    /// `publication_year >= min_year` and type is `journal-article` or null
    RecentJournalArticles,
}

impl std::str::FromStr for FilterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(FilterMode::All),
            "recent-journal-articles" => Ok(FilterMode::RecentJournalArticles),
            other => Err(Error::Config(format!(
                "Unknown filter '{}' (expected 'all' or 'recent-journal-articles')",
                other
            ))),
        }
    }
}

/// Primary scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksConfig {
    /// Cap on accepted works; `None` scans every partition
    #[serde(default = "default_max_works")]
    pub max_works: Option<u64>,

    /// Record filter applied before any row is emitted
    #[serde(default)]
    pub filter: FilterMode,

    /// Lower publication-year bound for [`FilterMode::RecentJournalArticles`]
    #[serde(default = "default_min_year")]
    pub min_year: i64,
}

impl Default for WorksConfig {
    fn default() -> Self {
        Self {
            max_works: default_max_works(),
            filter: FilterMode::default(),
            min_year: default_min_year(),
        }
    }
}

/// Secondary scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitiesConfig {
    /// Run the five resolvers concurrently
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Optional per-kind caps on matched rows
    #[serde(default)]
    pub caps: EntityCaps,
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            caps: EntityCaps::default(),
        }
    }
}

/// Per-kind caps on emitted entity rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityCaps {
    #[serde(default)]
    pub authors: Option<u64>,
    #[serde(default)]
    pub institutions: Option<u64>,
    #[serde(default)]
    pub concepts: Option<u64>,
    #[serde(default)]
    pub sources: Option<u64>,
    #[serde(default)]
    pub publishers: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_works() -> Option<u64> {
    Some(DEFAULT_MAX_WORKS)
}

fn default_min_year() -> i64 {
    2020
}

fn default_parallel() -> bool {
    true
}

/// Platform config file location: `<config_dir>/semoa/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("semoa").join("config.toml"))
}

/// Load TOML config from `path`
///
/// A missing file is not an error: a warning is logged and defaults are
/// returned. A file that exists but does not parse is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve a directory following the CLI > ENV > TOML > default priority
pub fn resolve_directory(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
    default: &str,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    // Priority 4: Compiled default
    PathBuf::from(default)
}

impl TomlConfig {
    /// Input partition root after priority resolution
    pub fn resolve_data_dir(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_directory(cli_arg, DATA_DIR_ENV, self.data_dir.as_deref(), "data")
    }

    /// Output directory after priority resolution
    pub fn resolve_output_dir(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_directory(cli_arg, OUTPUT_DIR_ENV, self.output_dir.as_deref(), "output")
    }
}
