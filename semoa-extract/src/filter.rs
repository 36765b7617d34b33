//! Record filters for the primary scan
//!
//! The filter decides which work records survive before any row or frontier
//! entry is derived from them. It is pluggable: built-in filters cover the two
//! historical behaviours, and any `Fn(&Value) -> bool` closure also works.

use semoa_common::config::{FilterMode, WorksConfig};
use semoa_common::fields;
use serde_json::Value;

/// Predicate over raw work records
pub trait WorkFilter: Send + Sync {
    fn accept(&self, record: &Value) -> bool;

    /// Short label for logs
    fn describe(&self) -> String {
        "custom".to_string()
    }
}

impl<F> WorkFilter for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn accept(&self, record: &Value) -> bool {
        self(record)
    }
}

/// Accept every record
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl WorkFilter for AcceptAll {
    fn accept(&self, _record: &Value) -> bool {
        true
    }

    fn describe(&self) -> String {
        "all".to_string()
    }
}

/// `publication_year >= min_year` and `type` is `journal-article` or null
///
/// A record without a publication year is rejected.
#[derive(Debug, Clone, Copy)]
pub struct RecentJournalArticles {
    pub min_year: i64,
}

impl WorkFilter for RecentJournalArticles {
    fn accept(&self, record: &Value) -> bool {
        let year_ok = fields::opt_int(record, "publication_year")
            .map(|year| year >= self.min_year)
            .unwrap_or(false);
        let type_ok = match record.get("type") {
            None | Some(Value::Null) => true,
            Some(Value::String(t)) => t == "journal-article",
            Some(_) => false,
        };
        year_ok && type_ok
    }

    fn describe(&self) -> String {
        format!("publication_year >= {}, journal-article or untyped", self.min_year)
    }
}

/// Build the configured filter
pub fn from_config(config: &WorksConfig) -> Box<dyn WorkFilter> {
    match config.filter {
        FilterMode::All => Box::new(AcceptAll),
        FilterMode::RecentJournalArticles => Box::new(RecentJournalArticles {
            min_year: config.min_year,
        }),
    }
}
