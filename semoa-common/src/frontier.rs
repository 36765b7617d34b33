//! Frontier sets and the hand-off snapshot
//!
//! A frontier is the set of entity keys referenced by accepted works. The
//! primary scan fills five of them; each secondary scan filters its entity
//! files against one. The snapshot file `entity_ids.json` is the only channel
//! between the two passes.
//!
//! **Snapshot schema:**
//! - version 0: the legacy layout, just the five key lists
//! - version 1: adds `schema_version`, `run_id`, `created_at`
//!
//! Identifiers are normalized again on load; publisher names are kept as-is.

use crate::ids::normalize_id;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// Current snapshot schema version
pub const HANDOFF_SCHEMA_VERSION: u32 = 1;

/// Snapshot file name inside the output directory
pub const HANDOFF_FILE_NAME: &str = "entity_ids.json";

/// Set of entity keys that a secondary scan must resolve
///
/// Owned by exactly one component at a time. The concept resolver inserts
/// into its frontier while scanning against it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier {
    keys: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key; returns `true` if it was not present
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Keys in ascending order
    pub fn sorted(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.iter().collect();
        keys.sort_unstable();
        keys
    }

    /// Re-normalize every key as an identifier
    pub fn normalized(self) -> Self {
        self.keys
            .into_iter()
            .map(|k| normalize_id(&k).to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

impl FromIterator<String> for Frontier {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for Frontier {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

// Serialized sorted so snapshots of identical runs are byte-identical
impl Serialize for Frontier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.sorted())
    }
}

impl<'de> Deserialize<'de> for Frontier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let keys = Vec::<String>::deserialize(deserializer)?;
        Ok(keys.into_iter().collect())
    }
}

/// Serialized frontiers handed from the primary to the secondary pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontierSnapshot {
    /// Missing in legacy files, read as 0
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub run_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author_ids: Frontier,
    #[serde(default)]
    pub concept_ids: Frontier,
    #[serde(default)]
    pub institution_ids: Frontier,
    #[serde(default)]
    pub source_ids: Frontier,
    #[serde(default)]
    pub publisher_names: Frontier,
}

impl FrontierSnapshot {
    /// Empty snapshot stamped with a fresh run id and the current time
    pub fn new() -> Self {
        Self {
            schema_version: HANDOFF_SCHEMA_VERSION,
            run_id: Some(Uuid::new_v4()),
            created_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Write the snapshot as JSON, replacing `path` atomically
    pub fn write(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        tracing::info!(
            file = %path.display(),
            authors = self.author_ids.len(),
            institutions = self.institution_ids.len(),
            concepts = self.concept_ids.len(),
            sources = self.source_ids.len(),
            publishers = self.publisher_names.len(),
            "Frontier snapshot written"
        );
        Ok(())
    }

    /// Read a snapshot, re-normalizing identifiers
    ///
    /// Every failure (missing file, bad JSON, unknown version) is reported as
    /// [`Error::HandOff`]: without a snapshot there is nothing to filter on.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)
            .map_err(|e| Error::HandOff(format!("Cannot read {}: {}", path.display(), e)))?;
        let snapshot: FrontierSnapshot = serde_json::from_slice(&content)
            .map_err(|e| Error::HandOff(format!("Cannot parse {}: {}", path.display(), e)))?;

        if snapshot.schema_version > HANDOFF_SCHEMA_VERSION {
            return Err(Error::HandOff(format!(
                "{} has schema version {}, newest supported is {}",
                path.display(),
                snapshot.schema_version,
                HANDOFF_SCHEMA_VERSION
            )));
        }

        Ok(snapshot.normalized())
    }

    fn normalized(self) -> Self {
        Self {
            author_ids: self.author_ids.normalized(),
            concept_ids: self.concept_ids.normalized(),
            institution_ids: self.institution_ids.normalized(),
            source_ids: self.source_ids.normalized(),
            ..self
        }
    }
}
