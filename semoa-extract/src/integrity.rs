//! Referential-integrity report over the written tables
//!
//! Reads the CSV output back, counts rows per table and, for every foreign-key
//! column of a relation, the distinct keys absent from the referenced entity
//! table. Two checks are advisory: citations may point outside the Works
//! table, and concept ancestors may be missing when their record preceded
//! their discovery in the concept scan.

use chrono::{DateTime, Utc};
use semoa_common::tables::Table;
use semoa_common::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Report file name inside the output directory
pub const REPORT_FILE_NAME: &str = "integrity_report.json";

/// Dangling keys kept in the report per check
const SAMPLE_SIZE: usize = 5;

/// One foreign-key column and the entity key it must reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub relation: Table,
    pub column: &'static str,
    pub target: Table,
    pub target_column: &'static str,
    /// Dangling keys are expected and do not count as violations
    pub advisory: bool,
}

const fn fk(relation: Table, column: &'static str, target: Table, target_column: &'static str) -> ForeignKey {
    ForeignKey {
        relation,
        column,
        target,
        target_column,
        advisory: false,
    }
}

const fn advisory(relation: Table, column: &'static str, target: Table, target_column: &'static str) -> ForeignKey {
    ForeignKey {
        relation,
        column,
        target,
        target_column,
        advisory: true,
    }
}

/// Every foreign key between the output tables
pub const FOREIGN_KEYS: [ForeignKey; 14] = [
    fk(Table::AuthorWork, "work_id", Table::Works, "id"),
    fk(Table::AuthorWork, "author_id", Table::Authors, "id"),
    fk(Table::WorkConcept, "work_id", Table::Works, "id"),
    fk(Table::WorkConcept, "concept_id", Table::Concepts, "id"),
    fk(Table::WorkSource, "work_id", Table::Works, "id"),
    fk(Table::WorkSource, "source_id", Table::Sources, "id"),
    fk(Table::WorkCitation, "citing_id", Table::Works, "id"),
    advisory(Table::WorkCitation, "cited_id", Table::Works, "id"),
    fk(Table::AuthorInstitution, "author_id", Table::Authors, "id"),
    fk(Table::AuthorInstitution, "institution_id", Table::Institutions, "id"),
    fk(Table::ConceptAncestor, "concept_id", Table::Concepts, "id"),
    advisory(Table::ConceptAncestor, "ancestor_id", Table::Concepts, "id"),
    fk(Table::SourcePublisher, "source_id", Table::Sources, "id"),
    fk(Table::SourcePublisher, "publisher_name", Table::Publishers, "name"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: Table,
    /// `None` when the file does not exist
    pub rows: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    #[serde(flatten)]
    pub key: ForeignKey,
    /// `false` when either table is missing
    pub checked: bool,
    /// Distinct dangling keys
    pub dangling: u64,
    pub sample: Vec<String>,
}

impl CheckResult {
    pub fn is_violation(&self) -> bool {
        self.checked && !self.key.advisory && self.dangling > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub checked_at: DateTime<Utc>,
    pub output_dir: PathBuf,
    pub tables: Vec<TableCount>,
    pub checks: Vec<CheckResult>,
}

impl IntegrityReport {
    pub fn violations(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| c.is_violation())
    }

    pub fn is_clean(&self) -> bool {
        self.violations().next().is_none()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        info!(file = %path.display(), "Integrity report written");
        Ok(())
    }
}

/// Values of one column, in file order; `None` if the table file is absent
fn read_column(dir: &Path, table: Table, column: &str) -> Result<Option<Vec<String>>> {
    let path = table.path_in(dir);
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::Reader::from_path(&path)?;
    let index = reader
        .headers()?
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| {
            Error::InvalidInput(format!("{} has no column '{}'", path.display(), column))
        })?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        values.push(record.get(index).unwrap_or_default().to_string());
    }
    Ok(Some(values))
}

fn count_rows(dir: &Path, table: Table) -> Result<Option<u64>> {
    let path = table.path_in(dir);
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::Reader::from_path(&path)?;
    let mut rows = 0u64;
    for record in reader.records() {
        record?;
        rows += 1;
    }
    Ok(Some(rows))
}

/// Build the report for the tables in `dir`
pub fn check(dir: &Path) -> Result<IntegrityReport> {
    info!(dir = %dir.display(), "Checking referential integrity");

    let mut tables = Vec::with_capacity(Table::ALL.len());
    for table in Table::ALL {
        let rows = count_rows(dir, table)?;
        if rows.is_none() {
            warn!(table = table.name(), "Table file missing");
        }
        tables.push(TableCount { table, rows });
    }

    let mut targets: HashMap<(Table, &str), Option<HashSet<String>>> = HashMap::new();
    let mut checks = Vec::with_capacity(FOREIGN_KEYS.len());

    for key in FOREIGN_KEYS {
        if !targets.contains_key(&(key.target, key.target_column)) {
            let keys = read_column(dir, key.target, key.target_column)?
                .map(|values| values.into_iter().collect::<HashSet<_>>());
            targets.insert((key.target, key.target_column), keys);
        }
        let target_keys = targets.get(&(key.target, key.target_column)).and_then(Option::as_ref);
        let values = read_column(dir, key.relation, key.column)?;

        let result = match (values, target_keys) {
            (Some(values), Some(target_keys)) => {
                let dangling: BTreeSet<String> = values
                    .into_iter()
                    .filter(|v| !target_keys.contains(v))
                    .collect();
                CheckResult {
                    key,
                    checked: true,
                    dangling: dangling.len() as u64,
                    sample: dangling.into_iter().take(SAMPLE_SIZE).collect(),
                }
            }
            _ => CheckResult {
                key,
                checked: false,
                dangling: 0,
                sample: Vec::new(),
            },
        };

        if result.is_violation() {
            warn!(
                relation = key.relation.name(),
                column = key.column,
                target = key.target.name(),
                dangling = result.dangling,
                "Dangling foreign keys"
            );
        } else if result.dangling > 0 {
            info!(
                relation = key.relation.name(),
                column = key.column,
                dangling = result.dangling,
                "Dangling keys in advisory check"
            );
        }
        checks.push(result);
    }

    Ok(IntegrityReport {
        checked_at: Utc::now(),
        output_dir: dir.to_path_buf(),
        tables,
        checks,
    })
}
