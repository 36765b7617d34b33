//! Stage runner: works, entities, check
//!
//! The works stage must complete before the entity stage starts; its only
//! output the entity stage reads is the frontier snapshot file. Scans are
//! blocking file work and run on tokio's blocking pool.

use crate::dataset::{EntityOutput, WorkOutput, WrittenTable};
use crate::error::{PipelineError, Result};
use crate::filter::{self, WorkFilter};
use crate::integrity::{self, IntegrityReport, REPORT_FILE_NAME};
use crate::resolver::{
    Authors, Concepts, Entity, EntityKind, EntityResolver, Institutions, Publishers, Sources,
};
use crate::stats::{ResolveStats, ScanStats};
use crate::work_scanner::WorkScanner;
use semoa_common::config::{EntitiesConfig, TomlConfig, WorksConfig};
use semoa_common::frontier::HANDOFF_FILE_NAME;
use semoa_common::partitions::{self, PartitionSet};
use semoa_common::{Error, Frontier, FrontierSnapshot, RecordReader};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Partition directory of the work records under the data root
pub const WORKS_DIR: &str = "works";

/// Everything a run needs, already resolved from CLI, environment and TOML
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub works: WorksConfig,
    pub entities: EntitiesConfig,
    pub run_works: bool,
    pub run_entities: bool,
    pub run_check: bool,
}

impl PipelineOptions {
    /// All stages enabled, directories as given
    pub fn new(config: &TomlConfig, data_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            data_dir,
            output_dir,
            works: config.works.clone(),
            entities: config.entities.clone(),
            run_works: true,
            run_entities: true,
            run_check: true,
        }
    }

    pub fn handoff_path(&self) -> PathBuf {
        self.output_dir.join(HANDOFF_FILE_NAME)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorksSummary {
    pub partitions: usize,
    pub stats: ScanStats,
    pub tables: Vec<WrittenTable>,
    pub handoff: PathBuf,
}

/// How one entity kind's pass ended
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityStatus {
    Resolved {
        stats: ResolveStats,
        tables: Vec<WrittenTable>,
    },
    /// Partition directory absent; no output for this kind
    MissingDirectory { dir: PathBuf },
    /// I/O failure while scanning or writing; other kinds are unaffected
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitySummary {
    pub entity: Entity,
    #[serde(flatten)]
    pub status: EntityStatus,
}

impl EntitySummary {
    pub fn stats(&self) -> Option<&ResolveStats> {
        match &self.status {
            EntityStatus::Resolved { stats, .. } => Some(stats),
            _ => None,
        }
    }
}

/// Result of a full run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub works: Option<WorksSummary>,
    pub entities: Vec<EntitySummary>,
    pub integrity: Option<IntegrityReport>,
}

impl RunSummary {
    pub fn entity(&self, entity: Entity) -> Option<&EntitySummary> {
        self.entities.iter().find(|s| s.entity == entity)
    }

    pub fn failed_entities(&self) -> Vec<Entity> {
        self.entities
            .iter()
            .filter(|s| matches!(s.status, EntityStatus::Failed { .. }))
            .map(|s| s.entity)
            .collect()
    }
}

/// Run the enabled stages in order
pub async fn run(options: PipelineOptions) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    info!(
        data_dir = %options.data_dir.display(),
        output_dir = %options.output_dir.display(),
        "Starting dataset build"
    );

    if options.run_works {
        let started = Instant::now();
        let filter = filter::from_config(&options.works);
        let works = run_works_stage(&options, filter).await?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Works stage finished");
        summary.works = Some(works);
    } else {
        info!("Skipping works stage");
    }

    if options.run_entities {
        let started = Instant::now();
        summary.entities = run_entities_stage(&options).await?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Entity stage finished");
    } else {
        info!("Skipping entity stage");
    }

    if options.run_check {
        let started = Instant::now();
        let dir = options.output_dir.clone();
        let report = tokio::task::spawn_blocking(move || -> semoa_common::Result<IntegrityReport> {
            let report = integrity::check(&dir)?;
            report.write(&dir.join(REPORT_FILE_NAME))?;
            Ok(report)
        })
        .await??;
        for violation in report.violations() {
            warn!(
                relation = violation.key.relation.name(),
                column = violation.key.column,
                dangling = violation.dangling,
                "Integrity violation"
            );
        }
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            clean = report.is_clean(),
            "Check stage finished"
        );
        summary.integrity = Some(report);
    } else {
        info!("Skipping check stage");
    }

    Ok(summary)
}

/// Primary pass: scan works, write the work tables and the frontier snapshot
pub async fn run_works_stage(options: &PipelineOptions, filter: Box<dyn WorkFilter>) -> Result<WorksSummary> {
    let works_dir = options.data_dir.join(WORKS_DIR);
    let output_dir = options.output_dir.clone();
    let handoff = options.handoff_path();
    let max_works = options.works.max_works;

    tokio::task::spawn_blocking(move || -> Result<WorksSummary> {
        let set = partitions::discover(&works_dir).map_err(PipelineError::Works)?;
        if set.is_empty() {
            warn!(dir = %works_dir.display(), "No work partitions found");
        }
        std::fs::create_dir_all(&output_dir).map_err(Error::from)?;

        let mut output = WorkOutput::create(&output_dir)?;
        let outcome = WorkScanner::new(filter)
            .with_max_works(max_works)
            .scan(RecordReader::from_partitions(&set), &mut output.sinks())?;
        let tables = output.finish()?;
        outcome.frontiers.write(&handoff)?;

        Ok(WorksSummary {
            partitions: set.files.len(),
            stats: outcome.stats,
            tables,
            handoff,
        })
    })
    .await?
}

/// Work item for one resolver task; owns private frontier copies
struct ResolveJob {
    entity: Entity,
    dir: PathBuf,
    output_dir: PathBuf,
    frontier: Frontier,
    related: Frontier,
    cap: Option<u64>,
}

impl ResolveJob {
    fn run(self) -> EntitySummary {
        let entity = self.entity;
        let status = match entity {
            Entity::Authors => self.resolve::<Authors>(),
            Entity::Institutions => self.resolve::<Institutions>(),
            Entity::Concepts => self.resolve::<Concepts>(),
            Entity::Sources => self.resolve::<Sources>(),
            Entity::Publishers => self.resolve::<Publishers>(),
        };
        EntitySummary { entity, status }
    }

    fn resolve<K: EntityKind>(mut self) -> EntityStatus {
        let set = match partitions::discover(&self.dir) {
            Ok(set) => set,
            Err(Error::MissingDirectory(dir)) => {
                warn!(
                    kind = self.entity.name(),
                    dir = %dir.display(),
                    "Partition directory missing, skipping entity kind"
                );
                return EntityStatus::MissingDirectory { dir };
            }
            Err(e) => return self.failed(e),
        };
        match self.scan::<K>(&set) {
            Ok((stats, tables)) => EntityStatus::Resolved { stats, tables },
            Err(e) => self.failed(e),
        }
    }

    fn scan<K: EntityKind>(
        &mut self,
        set: &PartitionSet,
    ) -> semoa_common::Result<(ResolveStats, Vec<WrittenTable>)> {
        if set.is_empty() {
            warn!(kind = self.entity.name(), dir = %set.dir.display(), "No partitions found");
        }
        let mut output = EntityOutput::<K>::create(&self.output_dir)?;
        let stats = EntityResolver::<K>::new().with_cap(self.cap).resolve(
            RecordReader::from_partitions(set),
            &mut self.frontier,
            &self.related,
            &mut output.sinks(),
        )?;
        let tables = output.finish()?;
        Ok((stats, tables))
    }

    fn failed(&self, e: Error) -> EntityStatus {
        error!(kind = self.entity.name(), error = %e, "Entity pass failed");
        EntityStatus::Failed {
            error: e.to_string(),
        }
    }
}

/// Secondary pass: resolve every entity kind against the snapshot
///
/// An unusable snapshot aborts the stage before any table is opened.
pub async fn run_entities_stage(options: &PipelineOptions) -> Result<Vec<EntitySummary>> {
    let handoff = options.handoff_path();
    let snapshot = FrontierSnapshot::load(&handoff).map_err(PipelineError::HandOff)?;
    info!(
        file = %handoff.display(),
        schema_version = snapshot.schema_version,
        run_id = ?snapshot.run_id,
        "Frontier snapshot loaded"
    );
    std::fs::create_dir_all(&options.output_dir).map_err(Error::from)?;

    let jobs: Vec<ResolveJob> = Entity::ALL
        .into_iter()
        .map(|entity| ResolveJob {
            entity,
            dir: options.data_dir.join(entity.name()),
            output_dir: options.output_dir.clone(),
            frontier: entity.frontier(&snapshot).clone(),
            related: entity.related_frontier(&snapshot).cloned().unwrap_or_default(),
            cap: entity.cap(&options.entities.caps),
        })
        .collect();

    let mut summaries = Vec::with_capacity(jobs.len());
    if options.entities.parallel {
        let mut set = JoinSet::new();
        for job in jobs {
            set.spawn_blocking(move || job.run());
        }
        while let Some(summary) = set.join_next().await {
            summaries.push(summary?);
        }
        summaries.sort_by_key(|s| s.entity);
    } else {
        for job in jobs {
            summaries.push(tokio::task::spawn_blocking(move || job.run()).await?);
        }
    }

    for summary in &summaries {
        if let Some(stats) = summary.stats() {
            info!(kind = summary.entity.name(), "{}", stats.display_string());
        }
    }
    Ok(summaries)
}
