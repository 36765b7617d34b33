//! Primary scan over work records
//!
//! Filters works, emits the Works table and the four work relations, and
//! collects the frontiers the secondary scans resolve against.
//!
//! **Ordering:** records are processed strictly in reader order. The
//! accepted-works cap is order-sensitive, so the same file order always
//! yields the same subset of works.

use crate::filter::WorkFilter;
use crate::stats::ScanStats;
use semoa_common::fields;
use semoa_common::tables::{AuthorWork, RowSink, WorkCitation, WorkConcept, WorkRow, WorkSource};
use semoa_common::{FrontierSnapshot, RecordReader, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Where the scan's rows go
pub struct WorkSinks<'a> {
    pub works: &'a mut dyn RowSink<WorkRow>,
    pub author_work: &'a mut dyn RowSink<AuthorWork>,
    pub work_concept: &'a mut dyn RowSink<WorkConcept>,
    pub work_source: &'a mut dyn RowSink<WorkSource>,
    pub work_citation: &'a mut dyn RowSink<WorkCitation>,
}

/// In-memory copy of everything the primary scan emits
#[derive(Debug, Clone, Default)]
pub struct WorkTables {
    pub works: Vec<WorkRow>,
    pub author_work: Vec<AuthorWork>,
    pub work_concept: Vec<WorkConcept>,
    pub work_source: Vec<WorkSource>,
    pub work_citation: Vec<WorkCitation>,
}

impl WorkTables {
    pub fn sinks(&mut self) -> WorkSinks<'_> {
        WorkSinks {
            works: &mut self.works,
            author_work: &mut self.author_work,
            work_concept: &mut self.work_concept,
            work_source: &mut self.work_source,
            work_citation: &mut self.work_citation,
        }
    }
}

/// Result of a completed primary scan
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub frontiers: FrontierSnapshot,
    pub stats: ScanStats,
}

/// Hosting source of a work and the publisher name that came with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedSource {
    pub source_id: String,
    pub publisher: Option<String>,
}

const HOST_VENUE_PUBLISHER: &[&str] = &["publisher"];
const PRIMARY_LOCATION_PUBLISHER: &[&str] = &["host_organization_name", "publisher"];

/// Record layouts that can carry the hosting source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLayout {
    /// `host_venue { id, publisher }`
    HostVenue,
    /// `primary_location.source { id, host_organization_name | publisher }`
    PrimaryLocation,
}

impl SourceLayout {
    /// Layouts in the order they are tried; first non-null source id wins
    pub const PRIORITY: [SourceLayout; 2] = [SourceLayout::HostVenue, SourceLayout::PrimaryLocation];

    pub fn locate(self, record: &Value) -> Option<HostedSource> {
        let (location, publisher_keys) = match self {
            SourceLayout::HostVenue => (fields::path(record, &["host_venue"])?, HOST_VENUE_PUBLISHER),
            SourceLayout::PrimaryLocation => (
                fields::path(record, &["primary_location", "source"])?,
                PRIMARY_LOCATION_PUBLISHER,
            ),
        };
        let source_id = location.get("id").and_then(fields::reference)?;
        let publisher = publisher_keys
            .iter()
            .find_map(|key| fields::opt_text(location, key));
        Some(HostedSource {
            source_id,
            publisher,
        })
    }
}

/// Hosting source under the first layout that yields one
pub fn hosted_source(record: &Value) -> Option<HostedSource> {
    SourceLayout::PRIORITY
        .iter()
        .find_map(|layout| layout.locate(record))
}

/// Primary-pass scanner
pub struct WorkScanner {
    filter: Box<dyn WorkFilter>,
    max_works: Option<u64>,
}

impl WorkScanner {
    pub fn new(filter: Box<dyn WorkFilter>) -> Self {
        Self {
            filter,
            max_works: None,
        }
    }

    /// Stop once this many works have been accepted
    pub fn with_max_works(mut self, max_works: Option<u64>) -> Self {
        self.max_works = max_works;
        self
    }

    /// Consume `reader`, emitting rows into `sinks`
    ///
    /// Only sink failures are errors. Malformed lines, non-object records and
    /// records without an identifier are counted and skipped. When the cap is
    /// hit the scan stops mid-file; rows already emitted stay emitted.
    pub fn scan(&self, mut reader: RecordReader, sinks: &mut WorkSinks<'_>) -> Result<ScanOutcome> {
        let mut stats = ScanStats::default();
        let mut frontiers = FrontierSnapshot::new();

        info!(
            filter = %self.filter.describe(),
            max_works = ?self.max_works,
            "Scanning works"
        );

        if self.max_works == Some(0) {
            stats.cap_reached = true;
        } else {
            while let Some(record) = reader.next() {
                stats.records_seen += 1;

                if !record.is_object() {
                    stats.not_an_object += 1;
                    warn!(
                        file = ?reader.current_file(),
                        line = reader.current_line(),
                        "Skipping work record that is not a JSON object"
                    );
                    continue;
                }

                if !self.filter.accept(&record) {
                    stats.filtered_out += 1;
                    continue;
                }

                let work_id = match fields::id_of(&record) {
                    Some(id) => id,
                    None => {
                        stats.missing_id += 1;
                        continue;
                    }
                };

                stats.relations_emitted += emit_work(&work_id, &record, sinks, &mut frontiers)?;
                stats.accepted += 1;

                if self.max_works.is_some_and(|cap| stats.accepted >= cap) {
                    info!(
                        accepted = stats.accepted,
                        file = ?reader.current_file(),
                        line = reader.current_line(),
                        "Accepted-works cap reached, stopping scan"
                    );
                    stats.cap_reached = true;
                    break;
                }
            }
        }

        stats.reader = reader.into_stats();
        info!("Works scan complete: {}", stats.display_string());
        debug!(
            authors = frontiers.author_ids.len(),
            institutions = frontiers.institution_ids.len(),
            concepts = frontiers.concept_ids.len(),
            sources = frontiers.source_ids.len(),
            publishers = frontiers.publisher_names.len(),
            "Frontiers collected"
        );

        Ok(ScanOutcome { frontiers, stats })
    }
}

/// Emit the Work row and its relations; returns the relation row count
fn emit_work(
    work_id: &str,
    record: &Value,
    sinks: &mut WorkSinks<'_>,
    frontiers: &mut FrontierSnapshot,
) -> Result<u64> {
    let mut relations = 0u64;

    sinks.works.push(WorkRow {
        id: work_id.to_string(),
        title: fields::text(record, "title"),
        publication_year: fields::opt_int(record, "publication_year"),
        doi: fields::text(record, "doi"),
        cited_by_count: fields::count(record, "cited_by_count"),
        work_type: record.get("type").and_then(Value::as_str).map(str::to_string),
    })?;

    if let Some(hosted) = hosted_source(record) {
        sinks.work_source.push(WorkSource {
            work_id: work_id.to_string(),
            source_id: hosted.source_id.clone(),
        })?;
        relations += 1;
        frontiers.source_ids.insert(hosted.source_id);
        if let Some(publisher) = hosted.publisher {
            frontiers.publisher_names.insert(publisher);
        }
    }

    for authorship in fields::array(record, "authorships") {
        let author_id = match fields::path(authorship, &["author", "id"]).and_then(fields::reference) {
            Some(id) => id,
            None => continue,
        };
        sinks.author_work.push(AuthorWork {
            author_id: author_id.clone(),
            work_id: work_id.to_string(),
        })?;
        relations += 1;
        frontiers.author_ids.insert(author_id);

        // Institutions only count for authorships with a known author
        for institution in fields::array(authorship, "institutions") {
            if let Some(id) = institution.get("id").and_then(fields::reference) {
                frontiers.institution_ids.insert(id);
            }
        }
    }

    for concept in fields::array(record, "concepts") {
        if let Some(concept_id) = concept.get("id").and_then(fields::reference) {
            sinks.work_concept.push(WorkConcept {
                work_id: work_id.to_string(),
                concept_id: concept_id.clone(),
                score: fields::float(concept, "score"),
            })?;
            relations += 1;
            frontiers.concept_ids.insert(concept_id);
        }
    }

    for cited in fields::array(record, "referenced_works") {
        if let Some(cited_id) = fields::reference(cited) {
            sinks.work_citation.push(WorkCitation {
                citing_id: work_id.to_string(),
                cited_id,
            })?;
            relations += 1;
        }
    }

    Ok(relations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_venue_preferred() {
        let record = json!({
            "host_venue": {"id": "https://openalex.org/S1", "publisher": "Elsevier"},
            "primary_location": {"source": {"id": "S2", "host_organization_name": "Wiley"}}
        });
        assert_eq!(
            hosted_source(&record),
            Some(HostedSource {
                source_id: "S1".into(),
                publisher: Some("Elsevier".into())
            })
        );
    }

    #[test]
    fn test_primary_location_fallback() {
        // host_venue present but without a source id
        let record = json!({
            "host_venue": {"id": null, "publisher": "Ignored"},
            "primary_location": {"source": {"id": "https://openalex.org/S2", "host_organization_name": "Wiley"}}
        });
        assert_eq!(
            hosted_source(&record),
            Some(HostedSource {
                source_id: "S2".into(),
                publisher: Some("Wiley".into())
            })
        );
    }

    #[test]
    fn test_no_source() {
        assert_eq!(hosted_source(&json!({})), None);
        assert_eq!(hosted_source(&json!({"host_venue": null, "primary_location": null})), None);
        assert_eq!(
            hosted_source(&json!({"primary_location": {"source": {"id": "S3"}}})),
            Some(HostedSource {
                source_id: "S3".into(),
                publisher: None
            })
        );
    }

    #[test]
    fn test_emit_work_defaults_and_relations() {
        let record = json!({
            "id": "W9",
            "authorships": [
                {"author": {"id": "https://openalex.org/A1"}, "institutions": [{"id": "I1"}, {"id": null}]},
                {"author": {}, "institutions": [{"id": "I-orphan"}]}
            ],
            "concepts": [{"id": "C1"}, {"id": "C2", "score": 0.4}, {"score": 1.0}],
            "referenced_works": ["https://openalex.org/W100", null, ""]
        });
        let mut tables = WorkTables::default();
        let mut frontiers = FrontierSnapshot::default();
        let relations = emit_work("W9", &record, &mut tables.sinks(), &mut frontiers).unwrap();

        assert_eq!(tables.works.len(), 1);
        let work = &tables.works[0];
        assert_eq!(work.title, "");
        assert_eq!(work.publication_year, None);
        assert_eq!(work.cited_by_count, 0);
        assert_eq!(work.work_type, None);

        assert_eq!(relations, 4);
        assert_eq!(tables.author_work, vec![AuthorWork { author_id: "A1".into(), work_id: "W9".into() }]);
        assert_eq!(tables.work_concept[0].score, 0.0);
        assert_eq!(tables.work_concept[1].score, 0.4);
        assert_eq!(tables.work_citation, vec![WorkCitation { citing_id: "W9".into(), cited_id: "W100".into() }]);
        assert!(tables.work_source.is_empty());

        assert_eq!(frontiers.institution_ids.sorted(), vec!["I1"]);
        assert_eq!(frontiers.concept_ids.sorted(), vec!["C1", "C2"]);
    }
}
