//! Graph store collaborator traits.
//!
//! A [`GraphStore`] hands out one [`GraphSession`] per stage. Sessions are
//! released when dropped, so every exit path of a stage (including `?`
//! early returns) gives its session back.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use intellipath_core::{EdgeRecord, NodeRecord};

use crate::error::GraphResult;
use crate::pipeline::Stage;
use crate::schema::SchemaStatement;

/// Result of merging one node by natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMerge {
    /// Store-assigned identifier.
    pub node_id: String,
    /// `true` when the merge created the node, `false` when it updated it.
    pub created: bool,
}

/// Result of merging one edge by `(kind, source, target)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMerge {
    Created,
    Updated,
    /// One or both endpoints do not exist; nothing was written.
    MissingEndpoint,
}

/// Fan-in attributes written back to a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CourseMetrics {
    pub dependent_count: u32,
    pub is_bottleneck: bool,
}

/// Node counts per label and relationship counts per type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphCounts {
    pub nodes: BTreeMap<String, usize>,
    pub relationships: BTreeMap<String, usize>,
}

impl GraphCounts {
    pub fn total_nodes(&self) -> usize {
        self.nodes.values().sum()
    }

    pub fn total_relationships(&self) -> usize {
        self.relationships.values().sum()
    }
}

/// A graph store that can be checked for connectivity and opened in sessions.
#[async_trait]
pub trait GraphStore: Send + Sync {
    type Session: GraphSession;

    /// Round-trip a trivial query to prove the store is reachable.
    async fn verify_connectivity(&self) -> GraphResult<()>;

    /// Open a session scoped to one stage of a run.
    async fn open_session(&self, stage: Stage) -> GraphResult<Self::Session>;
}

/// Operations available inside a stage session.
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Apply one idempotent schema statement.
    async fn apply_schema(&self, statement: &SchemaStatement) -> GraphResult<()>;

    /// Detach and delete every node and relationship.
    async fn wipe(&self) -> GraphResult<()>;

    /// Find-or-create a node by `(kind, key)` and overwrite its mapped attributes.
    async fn merge_node(&self, node: &NodeRecord) -> GraphResult<NodeMerge>;

    /// Find-or-create an edge between two existing nodes and overwrite its attributes.
    ///
    /// Never creates an endpoint as a side effect.
    async fn merge_edge(&self, edge: &EdgeRecord) -> GraphResult<EdgeMerge>;

    /// Natural keys of every course node.
    async fn course_codes(&self) -> GraphResult<Vec<String>>;

    /// Every REQUIRES edge as `(course, prerequisite)`.
    async fn requires_edges(&self) -> GraphResult<Vec<(String, String)>>;

    async fn write_course_metrics(&self, code: &str, metrics: CourseMetrics) -> GraphResult<()>;

    /// Set, or with `None` remove, a course's `critical_path_depth`.
    async fn write_critical_depth(&self, code: &str, depth: Option<u32>) -> GraphResult<()>;

    async fn counts(&self) -> GraphResult<GraphCounts>;
}
