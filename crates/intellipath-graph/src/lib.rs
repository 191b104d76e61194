//! # IntelliPath Graph
//!
//! Projects relational academic records into a Neo4j graph and computes
//! curriculum analytics over the prerequisite structure.
//!
//! Provides the schema guard, the generic entity and relationship
//! synchronizers, the critical path analyzer and the orchestrator that
//! sequences them into one run.

pub mod analysis;
pub mod client;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod sync;

pub use analysis::{load_requires_graph, run_analysis, AnalysisReport, CycleDetected, RequiresGraph};
pub use client::{GraphConfig, Neo4jSession, Neo4jStore};
pub use error::{GraphError, GraphResult, SyncError};
pub use memory::MemoryStore;
pub use pipeline::{run_analysis_only, run_sync, Stage, SyncOptions, SyncReport};
pub use schema::{ensure_schema, SchemaReport};
pub use store::{CourseMetrics, EdgeMerge, GraphCounts, GraphSession, GraphStore, NodeMerge};
pub use sync::{sync_entities, sync_relationships, upsert_entity, upsert_relationship, RecordOutcome, StageStats};
