//! Secondary scans: resolve frontier keys into entity rows
//!
//! One generic engine, [`EntityResolver`], walks an entity kind's partition
//! files and keeps the records whose key is in the frontier. Everything that
//! differs between kinds (key extraction, row shape, side relations) lives
//! behind [`EntityKind`]; the five kinds are in [`kinds`].
//!
//! **Live frontier:** the frontier is borrowed mutably for the whole scan and
//! a kind may insert into it from [`EntityKind::links`]. A key inserted after
//! its own record has already gone past is not resolved in this pass.

pub mod kinds;

use crate::stats::ResolveStats;
use semoa_common::config::EntityCaps;
use semoa_common::tables::{RowSink, Table, TableRow};
use semoa_common::{Frontier, FrontierSnapshot, RecordReader, Result};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

pub use kinds::{Authors, Concepts, Institutions, Publishers, Sources, Unlinked};

/// Frontiers visible to a kind's side extraction
pub struct LinkScope<'a> {
    /// Frontier being scanned; inserts take effect for later records
    pub frontier: &'a mut Frontier,
    /// Read-only frontier of the related kind (institutions for authors,
    /// publisher names for sources), empty for the others
    pub related: &'a Frontier,
}

/// Per-kind behaviour plugged into [`EntityResolver`]
pub trait EntityKind {
    type Row: TableRow + Send + 'static;
    type Link: Serialize + Send + 'static;

    /// Which entity this is
    const ENTITY: Entity;

    /// Table the links go to, `None` for kinds without side relations
    const LINK_TABLE: Option<Table>;

    /// Key tested against the frontier; `None` drops the record
    fn key(record: &Value) -> Option<String>;

    fn row(key: &str, record: &Value) -> Self::Row;

    fn links(key: &str, record: &Value, scope: &mut LinkScope<'_>) -> Vec<Self::Link>;
}

/// Runtime label for the five entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Authors,
    Institutions,
    Concepts,
    Sources,
    Publishers,
}

impl Entity {
    /// Fixed order used by the sequential entity stage
    pub const ALL: [Entity; 5] = [
        Entity::Authors,
        Entity::Institutions,
        Entity::Concepts,
        Entity::Sources,
        Entity::Publishers,
    ];

    /// Label in logs and statistics, also the partition directory name
    pub fn name(self) -> &'static str {
        match self {
            Entity::Authors => "authors",
            Entity::Institutions => "institutions",
            Entity::Concepts => "concepts",
            Entity::Sources => "sources",
            Entity::Publishers => "publishers",
        }
    }

    pub fn table(self) -> Table {
        match self {
            Entity::Authors => Table::Authors,
            Entity::Institutions => Table::Institutions,
            Entity::Concepts => Table::Concepts,
            Entity::Sources => Table::Sources,
            Entity::Publishers => Table::Publishers,
        }
    }

    pub fn cap(self, caps: &EntityCaps) -> Option<u64> {
        match self {
            Entity::Authors => caps.authors,
            Entity::Institutions => caps.institutions,
            Entity::Concepts => caps.concepts,
            Entity::Sources => caps.sources,
            Entity::Publishers => caps.publishers,
        }
    }

    /// Frontier this kind resolves against
    pub fn frontier(self, snapshot: &FrontierSnapshot) -> &Frontier {
        match self {
            Entity::Authors => &snapshot.author_ids,
            Entity::Institutions => &snapshot.institution_ids,
            Entity::Concepts => &snapshot.concept_ids,
            Entity::Sources => &snapshot.source_ids,
            Entity::Publishers => &snapshot.publisher_names,
        }
    }

    /// Frontier this kind's side relations are filtered by, if any
    pub fn related_frontier(self, snapshot: &FrontierSnapshot) -> Option<&Frontier> {
        match self {
            Entity::Authors => Some(&snapshot.institution_ids),
            Entity::Sources => Some(&snapshot.publisher_names),
            Entity::Institutions | Entity::Concepts | Entity::Publishers => None,
        }
    }
}

/// Where a resolver's rows go
pub struct EntitySinks<'a, K: EntityKind> {
    pub rows: &'a mut dyn RowSink<K::Row>,
    /// `None` discards links (the frontier is still updated)
    pub links: Option<&'a mut dyn RowSink<K::Link>>,
}

/// In-memory copy of everything a resolver emits
pub struct EntityTables<K: EntityKind> {
    pub rows: Vec<K::Row>,
    pub links: Vec<K::Link>,
}

impl<K: EntityKind> Default for EntityTables<K> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            links: Vec::new(),
        }
    }
}

impl<K: EntityKind> EntityTables<K> {
    pub fn sinks(&mut self) -> EntitySinks<'_, K> {
        EntitySinks {
            rows: &mut self.rows,
            links: Some(&mut self.links),
        }
    }
}

/// Single-pass resolver for one entity kind
pub struct EntityResolver<K: EntityKind> {
    cap: Option<u64>,
    _kind: PhantomData<K>,
}

impl<K: EntityKind> Default for EntityResolver<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityKind> EntityResolver<K> {
    pub fn new() -> Self {
        Self {
            cap: None,
            _kind: PhantomData,
        }
    }

    /// Stop emitting once this many rows have been emitted
    pub fn with_cap(mut self, cap: Option<u64>) -> Self {
        self.cap = cap;
        self
    }

    /// Consume `reader`, emitting rows for every record whose key is in
    /// `frontier`
    ///
    /// Once the cap is reached the current file is still read to its end, and
    /// matches in it are counted as suppressed, but nothing more is emitted
    /// and no further file is opened. Only sink failures are errors.
    pub fn resolve(
        &self,
        mut reader: RecordReader,
        frontier: &mut Frontier,
        related: &Frontier,
        sinks: &mut EntitySinks<'_, K>,
    ) -> Result<ResolveStats> {
        let kind = K::ENTITY.name();
        let mut stats = ResolveStats {
            kind: kind.to_string(),
            frontier_initial: frontier.len(),
            ..Default::default()
        };

        info!(
            kind,
            frontier = frontier.len(),
            related = related.len(),
            cap = ?self.cap,
            "Resolving entities"
        );

        if self.cap == Some(0) {
            stats.cap_reached = true;
        } else {
            while let Some(record) = reader.next() {
                stats.records_scanned += 1;

                if !record.is_object() {
                    stats.not_an_object += 1;
                    warn!(
                        kind,
                        file = ?reader.current_file(),
                        line = reader.current_line(),
                        "Skipping entity record that is not a JSON object"
                    );
                    continue;
                }

                let key = match K::key(&record) {
                    Some(key) => key,
                    None => {
                        stats.missing_key += 1;
                        continue;
                    }
                };
                if !frontier.contains(&key) {
                    continue;
                }
                stats.matched += 1;

                if stats.cap_reached {
                    stats.suppressed_after_cap += 1;
                    continue;
                }

                sinks.rows.push(K::row(&key, &record))?;
                stats.emitted += 1;

                let mut scope = LinkScope {
                    frontier: &mut *frontier,
                    related,
                };
                let links = K::links(&key, &record, &mut scope);
                if let Some(sink) = sinks.links.as_deref_mut() {
                    for link in links {
                        sink.push(link)?;
                        stats.links_emitted += 1;
                    }
                }

                if self.cap.is_some_and(|cap| stats.emitted >= cap) {
                    info!(
                        kind,
                        emitted = stats.emitted,
                        file = ?reader.current_file(),
                        line = reader.current_line(),
                        "Entity cap reached, finishing current file without emitting"
                    );
                    stats.cap_reached = true;
                    reader.finish_after_current_file();
                }
            }
        }

        stats.frontier_final = frontier.len();
        stats.reader = reader.into_stats();
        info!(kind, "Resolve complete: {}", stats.display_string());
        if stats.matched < stats.frontier_final as u64 {
            debug!(
                kind,
                unresolved = stats.frontier_final as u64 - stats.matched,
                "Frontier keys without a record"
            );
        }

        Ok(stats)
    }
}
