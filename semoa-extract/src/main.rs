//! semoa-extract - dataset builder entry point
//!
//! Runs the works, entities and check stages in order. Logging goes to
//! stderr; `RUST_LOG` overrides the configured level.

use anyhow::{bail, Context, Result};
use clap::Parser;
use semoa_common::config::{default_config_path, load_toml_config};
use semoa_extract::cli::Args;
use semoa_extract::logging;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let log_filter = logging::init();
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(default_config_path)
        .unwrap_or_else(|| PathBuf::from("semoa.toml"));
    let mut config = load_toml_config(&config_path).context("Failed to load configuration")?;
    args.apply(&mut config);
    log_filter
        .apply_config(&config.logging.level)
        .context("Failed to apply configured log level")?;

    info!("Starting semoa-extract {}", env!("CARGO_PKG_VERSION"));
    info!(
        config = %config_path.display(),
        found = config_path.exists(),
        "Configuration"
    );

    let options = args.options(&config);
    let summary = semoa_extract::run(options)
        .await
        .context("Dataset build failed")?;

    if let Some(works) = &summary.works {
        info!("Works: {}", works.stats.display_string());
    }
    for entity in &summary.entities {
        match entity.stats() {
            Some(stats) => info!("{}: {}", entity.entity.name(), stats.display_string()),
            None => info!("{}: no output", entity.entity.name()),
        }
    }

    let failed = summary.failed_entities();
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|e| e.name()).collect();
        bail!("Entity passes failed: {}", names.join(", "));
    }

    info!("Dataset build complete");
    Ok(())
}
