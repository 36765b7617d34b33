//! Tracing setup
//!
//! The subscriber is installed before the configuration is read so that
//! config loading itself is logged. Until then the filter is `RUST_LOG`, or
//! `info` when unset; afterwards the configured level replaces the default
//! unless `RUST_LOG` was given.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Level used until the configuration is loaded
pub const DEFAULT_LEVEL: &str = "info";

/// Handle to the installed level filter
pub struct LogFilter {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogFilter {
    /// Switch to the configured level; a `RUST_LOG` filter is left in place
    pub fn apply_config(&self, level: &str) -> Result<(), reload::Error> {
        if self.from_env {
            return Ok(());
        }
        self.handle.reload(EnvFilter::new(level))
    }
}

/// Reloadable filter layer, seeded from `env` or [`DEFAULT_LEVEL`]
pub fn filter_layer(env: Option<EnvFilter>) -> (reload::Layer<EnvFilter, Registry>, LogFilter) {
    let from_env = env.is_some();
    let (layer, handle) = reload::Layer::new(env.unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL)));
    (layer, LogFilter { handle, from_env })
}

/// Install the global subscriber, logging to stderr
pub fn init() -> LogFilter {
    let (filter, handle) = filter_layer(EnvFilter::try_from_default_env().ok());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}
