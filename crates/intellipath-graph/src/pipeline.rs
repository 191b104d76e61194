//! Sync orchestrator.
//!
//! One run is a strict sequence:
//!
//! ```text
//! ConnectivityCheck -> SchemaSetup -> [FullWipe] -> EntitySync x4
//!     -> (barrier) -> RelationshipSync x3 -> Analyze -> report
//! ```
//!
//! Each stage opens its own session and drops it before the next stage
//! starts. Record-level failures are counted; anything that stops a stage
//! from running at all aborts the run with a [`SyncError`]. Writes committed
//! by earlier stages stay in the store.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use intellipath_core::{EdgeKind, EntityRecord, NodeKind, RelationRecord};
use intellipath_source::{RecordSource, SourceResult};

use crate::analysis::{run_analysis, AnalysisReport};
use crate::error::SyncError;
use crate::schema::{ensure_schema, SchemaReport};
use crate::store::{GraphSession, GraphStore};
use crate::sync::{sync_entities, sync_relationships, StageStats};

/// A stage of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ConnectivityCheck,
    SchemaSetup,
    FullWipe,
    EntitySync(NodeKind),
    RelationshipSync(EdgeKind),
    Analyze,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectivityCheck => f.write_str("connectivity check"),
            Self::SchemaSetup => f.write_str("schema setup"),
            Self::FullWipe => f.write_str("full wipe"),
            Self::EntitySync(kind) => write!(f, "entity sync ({})", kind),
            Self::RelationshipSync(kind) => write!(f, "relationship sync ({})", kind),
            Self::Analyze => f.write_str("analyze"),
        }
    }
}

/// Run options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Detach-delete everything before syncing.
    pub clear_existing: bool,
    /// Upserts in flight per stage. `1` is strictly sequential.
    pub batch_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            clear_existing: false,
            batch_size: 100,
        }
    }
}

/// Aggregated result of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub schema: SchemaReport,
    pub wiped: bool,
    pub entities: BTreeMap<NodeKind, StageStats>,
    pub relationships: BTreeMap<EdgeKind, StageStats>,
    pub analysis: AnalysisReport,
    pub elapsed: Duration,
}

impl SyncReport {
    fn all_stats(&self) -> impl Iterator<Item = &StageStats> {
        self.entities.values().chain(self.relationships.values())
    }

    fn sum(&self, field: impl Fn(&StageStats) -> usize) -> usize {
        self.all_stats().map(field).sum()
    }

    pub fn errors(&self) -> usize {
        self.sum(|s| s.errors)
    }

    pub fn created(&self) -> usize {
        self.sum(|s| s.created)
    }

    pub fn updated(&self) -> usize {
        self.sum(|s| s.updated)
    }

    pub fn skipped(&self) -> usize {
        self.sum(|s| s.skipped)
    }

    pub fn missing_endpoints(&self) -> usize {
        self.sum(|s| s.missing_endpoint)
    }

    /// `true` iff no record failed. A REQUIRES cycle is reported but does not
    /// fail the run.
    pub fn is_success(&self) -> bool {
        self.errors() == 0
    }
}

async fn check_connectivity<G, R>(store: &G, source: &R) -> Result<(), SyncError>
where
    G: GraphStore,
    R: RecordSource + ?Sized,
{
    store
        .verify_connectivity()
        .await
        .map_err(|e| SyncError::Connectivity {
            collaborator: "graph store",
            message: e.to_string(),
        })?;
    source.ping().await.map_err(|e| SyncError::Connectivity {
        collaborator: "record source",
        message: e.to_string(),
    })?;
    info!("Connectivity verified");
    Ok(())
}

async fn entity_stage<G, R>(store: &G, scan: SourceResult<Vec<R>>, batch_size: usize) -> Result<StageStats, SyncError>
where
    G: GraphStore,
    R: EntityRecord,
{
    let stage = Stage::EntitySync(R::KIND);
    let records = scan.map_err(SyncError::source(stage))?;
    let session = store.open_session(stage).await.map_err(SyncError::stage(stage))?;
    Ok(sync_entities(&session, &records, batch_size).await)
}

async fn relationship_stage<G, R>(
    store: &G,
    scan: SourceResult<Vec<R>>,
    batch_size: usize,
) -> Result<StageStats, SyncError>
where
    G: GraphStore,
    R: RelationRecord,
{
    let stage = Stage::RelationshipSync(R::KIND);
    let records = scan.map_err(SyncError::source(stage))?;
    let session = store.open_session(stage).await.map_err(SyncError::stage(stage))?;
    Ok(sync_relationships(&session, &records, batch_size).await)
}

/// Run the full pipeline.
pub async fn run_sync<G, R>(store: &G, source: &R, options: &SyncOptions) -> Result<SyncReport, SyncError>
where
    G: GraphStore,
    R: RecordSource + ?Sized,
{
    let started = Instant::now();
    info!(
        clear_existing = options.clear_existing,
        batch_size = options.batch_size,
        "Starting graph sync"
    );

    check_connectivity(store, source).await?;

    let schema = {
        let session = store
            .open_session(Stage::SchemaSetup)
            .await
            .map_err(SyncError::stage(Stage::SchemaSetup))?;
        ensure_schema(&session).await
    };

    if options.clear_existing {
        warn!("Clearing existing graph data");
        let session = store
            .open_session(Stage::FullWipe)
            .await
            .map_err(SyncError::stage(Stage::FullWipe))?;
        session.wipe().await.map_err(SyncError::Wipe)?;
        info!("Graph cleared");
    }

    let batch = options.batch_size;
    let mut report = SyncReport {
        schema,
        wiped: options.clear_existing,
        ..Default::default()
    };

    report.entities.insert(
        NodeKind::Course,
        entity_stage(store, source.active_courses().await, batch).await?,
    );
    report
        .entities
        .insert(NodeKind::Major, entity_stage(store, source.majors().await, batch).await?);
    report
        .entities
        .insert(NodeKind::Skill, entity_stage(store, source.skills().await, batch).await?);
    report.entities.insert(
        NodeKind::CareerPath,
        entity_stage(store, source.career_paths().await, batch).await?,
    );
    info!("Entity phase complete");

    report.relationships.insert(
        EdgeKind::Requires,
        relationship_stage(store, source.prerequisites().await, batch).await?,
    );
    report.relationships.insert(
        EdgeKind::Teaches,
        relationship_stage(store, source.course_skills().await, batch).await?,
    );
    report.relationships.insert(
        EdgeKind::PreparesFor,
        relationship_stage(store, source.course_careers().await, batch).await?,
    );
    info!("Relationship phase complete");

    report.analysis = analyze(store).await?;
    report.elapsed = started.elapsed();

    info!(
        created = report.created(),
        updated = report.updated(),
        skipped = report.skipped(),
        missing_endpoints = report.missing_endpoints(),
        errors = report.errors(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Graph sync complete"
    );
    Ok(report)
}

async fn analyze<G: GraphStore>(store: &G) -> Result<AnalysisReport, SyncError> {
    let session = store
        .open_session(Stage::Analyze)
        .await
        .map_err(SyncError::stage(Stage::Analyze))?;
    run_analysis(&session).await.map_err(SyncError::stage(Stage::Analyze))
}

/// Recompute derived course attributes from what is already in the store.
pub async fn run_analysis_only<G: GraphStore>(store: &G) -> Result<AnalysisReport, SyncError> {
    store
        .verify_connectivity()
        .await
        .map_err(|e| SyncError::Connectivity {
            collaborator: "graph store",
            message: e.to_string(),
        })?;
    analyze(store).await
}
