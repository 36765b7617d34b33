//! Output tables: catalogue, row types and the CSV table writer
//!
//! One CSV file per entity and per relation, each with a fixed header. The
//! header is written on creation, so a table with no rows is still a valid,
//! self-describing file for the integrity check.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Every persisted table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Works,
    Authors,
    Institutions,
    Concepts,
    Sources,
    Publishers,
    AuthorWork,
    WorkConcept,
    WorkSource,
    WorkCitation,
    AuthorInstitution,
    ConceptAncestor,
    SourcePublisher,
}

impl Table {
    pub const ALL: [Table; 13] = [
        Table::Works,
        Table::Authors,
        Table::Institutions,
        Table::Concepts,
        Table::Sources,
        Table::Publishers,
        Table::AuthorWork,
        Table::WorkConcept,
        Table::WorkSource,
        Table::WorkCitation,
        Table::AuthorInstitution,
        Table::ConceptAncestor,
        Table::SourcePublisher,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Works => "works",
            Table::Authors => "authors",
            Table::Institutions => "institutions",
            Table::Concepts => "concepts",
            Table::Sources => "sources",
            Table::Publishers => "publishers",
            Table::AuthorWork => "author_work",
            Table::WorkConcept => "work_concept",
            Table::WorkSource => "work_source",
            Table::WorkCitation => "work_citation",
            Table::AuthorInstitution => "author_institution",
            Table::ConceptAncestor => "concept_ancestor",
            Table::SourcePublisher => "source_publisher",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.csv", self.name())
    }

    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Header row, in column order
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Works => &["id", "title", "publication_year", "doi", "cited_by_count", "type"],
            Table::Authors => &["id", "name", "orcid", "works_count", "cited_by_count"],
            Table::Institutions => &[
                "id",
                "display_name",
                "country_code",
                "type",
                "works_count",
                "cited_by_count",
            ],
            Table::Concepts => &["id", "display_name", "level", "works_count", "cited_by_count"],
            Table::Sources => &["id", "display_name", "issn", "works_count", "cited_by_count"],
            Table::Publishers => &["name", "works_count", "cited_by_count", "country_codes"],
            Table::AuthorWork => &["author_id", "work_id"],
            Table::WorkConcept => &["work_id", "concept_id", "score"],
            Table::WorkSource => &["work_id", "source_id"],
            Table::WorkCitation => &["citing_id", "cited_id"],
            Table::AuthorInstitution => &["author_id", "institution_id"],
            Table::ConceptAncestor => &["concept_id", "ancestor_id"],
            Table::SourcePublisher => &["source_id", "publisher_name"],
        }
    }
}

/// Row type bound to the table it is persisted in
///
/// Field order of the implementing struct must match [`Table::columns`].
pub trait TableRow: Serialize {
    const TABLE: Table;
}

macro_rules! table_row {
    ($row:ty => $table:expr) => {
        impl TableRow for $row {
            const TABLE: Table = $table;
        }
    };
}

// ============================================================================
// Entity rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRow {
    pub id: String,
    pub title: String,
    pub publication_year: Option<i64>,
    pub doi: String,
    pub cited_by_count: i64,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRow {
    pub id: String,
    pub name: String,
    pub orcid: String,
    pub works_count: i64,
    pub cited_by_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionRow {
    pub id: String,
    pub display_name: String,
    pub country_code: String,
    #[serde(rename = "type")]
    pub institution_type: String,
    pub works_count: i64,
    pub cited_by_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRow {
    pub id: String,
    pub display_name: String,
    pub level: i64,
    pub works_count: i64,
    pub cited_by_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    pub id: String,
    pub display_name: String,
    pub issn: String,
    pub works_count: i64,
    pub cited_by_count: i64,
}

/// Keyed by display name; there is no surrogate id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherRow {
    pub name: String,
    pub works_count: i64,
    pub cited_by_count: i64,
    /// Comma-joined, source order preserved
    pub country_codes: String,
}

// ============================================================================
// Relation rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorWork {
    pub author_id: String,
    pub work_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkConcept {
    pub work_id: String,
    pub concept_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSource {
    pub work_id: String,
    pub source_id: String,
}

/// `cited_id` may reference a work outside the Works table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCitation {
    pub citing_id: String,
    pub cited_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInstitution {
    pub author_id: String,
    pub institution_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptAncestor {
    pub concept_id: String,
    pub ancestor_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePublisher {
    pub source_id: String,
    pub publisher_name: String,
}

table_row!(WorkRow => Table::Works);
table_row!(AuthorRow => Table::Authors);
table_row!(InstitutionRow => Table::Institutions);
table_row!(ConceptRow => Table::Concepts);
table_row!(SourceRow => Table::Sources);
table_row!(PublisherRow => Table::Publishers);
table_row!(AuthorWork => Table::AuthorWork);
table_row!(WorkConcept => Table::WorkConcept);
table_row!(WorkSource => Table::WorkSource);
table_row!(WorkCitation => Table::WorkCitation);
table_row!(AuthorInstitution => Table::AuthorInstitution);
table_row!(ConceptAncestor => Table::ConceptAncestor);
table_row!(SourcePublisher => Table::SourcePublisher);

// ============================================================================
// Sinks
// ============================================================================

/// Destination for an ordered row sequence
pub trait RowSink<R> {
    fn push(&mut self, row: R) -> Result<()>;
}

/// In-memory sink, used by tests and by callers that post-process rows
impl<R> RowSink<R> for Vec<R> {
    fn push(&mut self, row: R) -> Result<()> {
        Vec::push(self, row);
        Ok(())
    }
}

/// Append-only CSV writer for one table
pub struct TableWriter<R: Serialize> {
    writer: csv::Writer<File>,
    table: Table,
    path: PathBuf,
    rows: u64,
    _row: PhantomData<fn(R)>,
}

impl<R: Serialize> TableWriter<R> {
    /// Create (truncate) `table`'s file in `dir` and write its header
    pub fn create(dir: &Path, table: Table) -> Result<Self> {
        let path = table.path_in(dir);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;
        writer.write_record(table.columns())?;
        Ok(Self {
            writer,
            table,
            path,
            rows: 0,
            _row: PhantomData,
        })
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush to disk; returns the number of data rows written
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        tracing::info!(
            table = self.table.name(),
            rows = self.rows,
            file = %self.path.display(),
            "Table written"
        );
        Ok(self.rows)
    }
}

impl<R: TableRow> TableWriter<R> {
    /// Create the table `R` is bound to
    pub fn for_row(dir: &Path) -> Result<Self> {
        Self::create(dir, R::TABLE)
    }
}

impl<R: Serialize> RowSink<R> for TableWriter<R> {
    fn push(&mut self, row: R) -> Result<()> {
        self.writer.serialize(&row)?;
        self.rows += 1;
        Ok(())
    }
}
