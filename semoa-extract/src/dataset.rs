//! Dataset materializer: CSV table writers for each pass
//!
//! Writers are opened only after partition discovery has succeeded, so a kind
//! whose directory is missing leaves no file behind.

use crate::resolver::{EntityKind, EntitySinks};
use crate::work_scanner::WorkSinks;
use semoa_common::tables::{
    AuthorWork, RowSink, Table, TableWriter, WorkCitation, WorkConcept, WorkRow, WorkSource,
};
use semoa_common::Result;
use serde::Serialize;
use std::path::Path;

/// Table written by a pass and how many data rows it received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WrittenTable {
    pub table: Table,
    pub rows: u64,
}

fn finish<R: Serialize>(writer: TableWriter<R>) -> Result<WrittenTable> {
    let table = writer.table();
    let rows = writer.finish()?;
    Ok(WrittenTable { table, rows })
}

/// The five tables of the primary pass
pub struct WorkOutput {
    works: TableWriter<WorkRow>,
    author_work: TableWriter<AuthorWork>,
    work_concept: TableWriter<WorkConcept>,
    work_source: TableWriter<WorkSource>,
    work_citation: TableWriter<WorkCitation>,
}

impl WorkOutput {
    pub fn create(dir: &Path) -> Result<Self> {
        Ok(Self {
            works: TableWriter::for_row(dir)?,
            author_work: TableWriter::for_row(dir)?,
            work_concept: TableWriter::for_row(dir)?,
            work_source: TableWriter::for_row(dir)?,
            work_citation: TableWriter::for_row(dir)?,
        })
    }

    pub fn sinks(&mut self) -> WorkSinks<'_> {
        WorkSinks {
            works: &mut self.works,
            author_work: &mut self.author_work,
            work_concept: &mut self.work_concept,
            work_source: &mut self.work_source,
            work_citation: &mut self.work_citation,
        }
    }

    pub fn finish(self) -> Result<Vec<WrittenTable>> {
        Ok(vec![
            finish(self.works)?,
            finish(self.author_work)?,
            finish(self.work_concept)?,
            finish(self.work_source)?,
            finish(self.work_citation)?,
        ])
    }
}

/// Entity table of one kind plus its link table, if it has one
pub struct EntityOutput<K: EntityKind> {
    rows: TableWriter<K::Row>,
    links: Option<TableWriter<K::Link>>,
}

impl<K: EntityKind> EntityOutput<K> {
    pub fn create(dir: &Path) -> Result<Self> {
        let rows = TableWriter::for_row(dir)?;
        let links = K::LINK_TABLE
            .map(|table| TableWriter::create(dir, table))
            .transpose()?;
        Ok(Self { rows, links })
    }

    pub fn sinks(&mut self) -> EntitySinks<'_, K> {
        EntitySinks {
            rows: &mut self.rows,
            links: self
                .links
                .as_mut()
                .map(|writer| writer as &mut dyn RowSink<K::Link>),
        }
    }

    pub fn finish(self) -> Result<Vec<WrittenTable>> {
        let mut written = vec![finish(self.rows)?];
        if let Some(links) = self.links {
            written.push(finish(links)?);
        }
        Ok(written)
    }
}
