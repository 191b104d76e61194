//! Graph store and run-level error types.

use thiserror::Error;

use intellipath_source::SourceError;

use crate::pipeline::Stage;

/// Errors raised by a graph store operation.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    #[error("Failed to read field '{field}': {message}")]
    Field { field: String, message: String },

    #[error("Graph store unreachable: {0}")]
    Unreachable(String),

    /// The store refused the write (constraint violation, schema conflict).
    #[error("{0}")]
    Rejected(String),
}

/// Result type for graph store operations.
pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    /// Whether the error reports a constraint or index that is already present.
    pub fn is_already_exists(&self) -> bool {
        self.to_string().to_lowercase().contains("already exists")
    }
}

/// Fatal errors that abort a sync run.
///
/// Record-level failures never show up here: they are counted in
/// [`StageStats`](crate::StageStats) instead.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Connectivity check failed for {collaborator}: {message}")]
    Connectivity {
        collaborator: &'static str,
        message: String,
    },

    #[error("Full wipe failed: {0}")]
    Wipe(#[source] GraphError),

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: GraphError,
    },

    #[error("Failed to read records for stage '{stage}': {source}")]
    Source {
        stage: Stage,
        #[source]
        source: SourceError,
    },
}

impl SyncError {
    pub(crate) fn stage(stage: Stage) -> impl FnOnce(GraphError) -> Self {
        move |source| Self::Stage { stage, source }
    }

    pub(crate) fn source(stage: Stage) -> impl FnOnce(SourceError) -> Self {
        move |source| Self::Source { stage, source }
    }
}
