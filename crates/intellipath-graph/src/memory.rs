//! In-process graph store.
//!
//! Honours the same merge semantics as the Neo4j store (one node per
//! `(kind, key)`, one edge per `(kind, source, target)`, no implicit
//! endpoint creation) so the whole pipeline can run without a database:
//! dry runs from the CLI and the test suite both use it. Faults can be
//! injected to exercise the error paths.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use intellipath_core::{EdgeKind, EdgeRecord, NodeKind, NodeRecord, Properties, PropertyValue};

use crate::error::{GraphError, GraphResult};
use crate::pipeline::Stage;
use crate::schema::SchemaStatement;
use crate::store::{CourseMetrics, EdgeMerge, GraphCounts, GraphSession, GraphStore, NodeMerge};

/// A node as held by the memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub id: String,
    pub properties: BTreeMap<String, PropertyValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredNode {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// An edge as held by the memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEdge {
    pub properties: BTreeMap<String, PropertyValue>,
    pub created_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

/// Store contents without timestamps, for comparing two runs.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryContents {
    pub nodes: BTreeMap<(NodeKind, String), (String, BTreeMap<String, PropertyValue>)>,
    pub edges: BTreeMap<(EdgeKind, String, String), BTreeMap<String, PropertyValue>>,
}

#[derive(Default)]
struct MemoryGraph {
    nodes: BTreeMap<(NodeKind, String), StoredNode>,
    edges: BTreeMap<(EdgeKind, String, String), StoredEdge>,
    schema: BTreeSet<&'static str>,
}

#[derive(Debug, Clone, Default)]
struct Faults {
    unreachable: Option<String>,
    wipe: Option<String>,
    schema: HashMap<&'static str, String>,
    rejected_keys: HashSet<(NodeKind, String)>,
    sessions: HashSet<Stage>,
}

/// Shared in-memory graph. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    graph: Arc<Mutex<MemoryGraph>>,
    faults: Arc<Faults>,
    open_sessions: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the connectivity check with `message`.
    pub fn unreachable(mut self, message: &str) -> Self {
        Arc::make_mut(&mut self.faults).unreachable = Some(message.to_string());
        self
    }

    /// Fail the full wipe with `message`.
    pub fn with_wipe_error(mut self, message: &str) -> Self {
        Arc::make_mut(&mut self.faults).wipe = Some(message.to_string());
        self
    }

    /// Fail the named schema statement with `message`.
    pub fn with_schema_error(mut self, name: &'static str, message: &str) -> Self {
        Arc::make_mut(&mut self.faults).schema.insert(name, message.to_string());
        self
    }

    /// Reject every merge of the given node, as a constraint violation would.
    pub fn with_rejected_key(mut self, kind: NodeKind, key: &str) -> Self {
        Arc::make_mut(&mut self.faults)
            .rejected_keys
            .insert((kind, key.to_string()));
        self
    }

    /// Refuse to open a session for `stage`.
    pub fn with_session_error(mut self, stage: Stage) -> Self {
        Arc::make_mut(&mut self.faults).sessions.insert(stage);
        self
    }

    /// Sessions currently held open.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    pub async fn node(&self, kind: NodeKind, key: &str) -> Option<StoredNode> {
        self.graph.lock().await.nodes.get(&(kind, key.to_string())).cloned()
    }

    pub async fn node_count(&self, kind: NodeKind) -> usize {
        self.graph
            .lock()
            .await
            .nodes
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub async fn edge(&self, kind: EdgeKind, source: &str, target: &str) -> Option<StoredEdge> {
        self.graph
            .lock()
            .await
            .edges
            .get(&(kind, source.to_string(), target.to_string()))
            .cloned()
    }

    pub async fn edge_count(&self, kind: EdgeKind) -> usize {
        self.graph
            .lock()
            .await
            .edges
            .keys()
            .filter(|(k, _, _)| *k == kind)
            .count()
    }

    pub async fn schema_elements(&self) -> Vec<&'static str> {
        self.graph.lock().await.schema.iter().copied().collect()
    }

    pub async fn contents(&self) -> MemoryContents {
        let graph = self.graph.lock().await;
        MemoryContents {
            nodes: graph
                .nodes
                .iter()
                .map(|(key, node)| (key.clone(), (node.id.clone(), node.properties.clone())))
                .collect(),
            edges: graph
                .edges
                .iter()
                .map(|(key, edge)| (key.clone(), edge.properties.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    type Session = MemorySession;

    async fn verify_connectivity(&self) -> GraphResult<()> {
        match &self.faults.unreachable {
            Some(message) => Err(GraphError::Unreachable(message.clone())),
            None => Ok(()),
        }
    }

    async fn open_session(&self, stage: Stage) -> GraphResult<MemorySession> {
        if self.faults.sessions.contains(&stage) {
            return Err(GraphError::Unreachable(format!("no session available for {}", stage)));
        }
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        debug!(%stage, "Memory session opened");
        Ok(MemorySession {
            graph: Arc::clone(&self.graph),
            faults: Arc::clone(&self.faults),
            open_sessions: Arc::clone(&self.open_sessions),
            stage,
        })
    }
}

/// Session over a [`MemoryStore`]; releases itself on drop.
pub struct MemorySession {
    graph: Arc<Mutex<MemoryGraph>>,
    faults: Arc<Faults>,
    open_sessions: Arc<AtomicUsize>,
    stage: Stage,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        debug!(stage = %self.stage, "Memory session released");
    }
}

fn property_map(props: &Properties) -> impl Iterator<Item = (String, PropertyValue)> + '_ {
    props.iter().map(|(name, value)| (name.to_string(), value.clone()))
}

#[async_trait]
impl GraphSession for MemorySession {
    async fn apply_schema(&self, statement: &SchemaStatement) -> GraphResult<()> {
        if let Some(message) = self.faults.schema.get(statement.name) {
            return Err(GraphError::Rejected(message.clone()));
        }
        self.graph.lock().await.schema.insert(statement.name);
        Ok(())
    }

    async fn wipe(&self) -> GraphResult<()> {
        if let Some(message) = &self.faults.wipe {
            return Err(GraphError::Rejected(message.clone()));
        }
        let mut graph = self.graph.lock().await;
        graph.nodes.clear();
        graph.edges.clear();
        Ok(())
    }

    async fn merge_node(&self, node: &NodeRecord) -> GraphResult<NodeMerge> {
        let identity = (node.kind, node.key.clone());
        if self.faults.rejected_keys.contains(&identity) {
            return Err(GraphError::Rejected(format!(
                "constraint violation on {} '{}'",
                node.kind, node.key
            )));
        }

        let now = Utc::now();
        let mut graph = self.graph.lock().await;
        let created = !graph.nodes.contains_key(&identity);
        let stored = graph.nodes.entry(identity).or_insert_with(|| StoredNode {
            id: Uuid::new_v4().to_string(),
            properties: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        });
        stored
            .properties
            .insert(node.kind.key_field().to_string(), PropertyValue::from(node.key.as_str()));
        stored.properties.extend(property_map(&node.properties));
        stored.updated_at = now;

        Ok(NodeMerge {
            node_id: stored.id.clone(),
            created,
        })
    }

    async fn merge_edge(&self, edge: &EdgeRecord) -> GraphResult<EdgeMerge> {
        let mut graph = self.graph.lock().await;
        let source = (edge.kind.source_kind(), edge.source.clone());
        let target = (edge.kind.target_kind(), edge.target.clone());
        if !graph.nodes.contains_key(&source) || !graph.nodes.contains_key(&target) {
            return Ok(EdgeMerge::MissingEndpoint);
        }

        let now = Utc::now();
        let identity = (edge.kind, edge.source.clone(), edge.target.clone());
        let created = !graph.edges.contains_key(&identity);
        let stored = graph.edges.entry(identity).or_insert_with(|| StoredEdge {
            properties: BTreeMap::new(),
            created_at: now,
            synced_at: now,
        });
        stored.properties.extend(property_map(&edge.properties));
        stored.synced_at = now;

        Ok(if created { EdgeMerge::Created } else { EdgeMerge::Updated })
    }

    async fn course_codes(&self) -> GraphResult<Vec<String>> {
        Ok(self
            .graph
            .lock()
            .await
            .nodes
            .keys()
            .filter(|(kind, _)| *kind == NodeKind::Course)
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn requires_edges(&self) -> GraphResult<Vec<(String, String)>> {
        Ok(self
            .graph
            .lock()
            .await
            .edges
            .keys()
            .filter(|(kind, _, _)| *kind == EdgeKind::Requires)
            .map(|(_, source, target)| (source.clone(), target.clone()))
            .collect())
    }

    async fn write_course_metrics(&self, code: &str, metrics: CourseMetrics) -> GraphResult<()> {
        let mut graph = self.graph.lock().await;
        if let Some(node) = graph.nodes.get_mut(&(NodeKind::Course, code.to_string())) {
            node.properties.insert(
                "dependent_count".to_string(),
                PropertyValue::Int(i64::from(metrics.dependent_count)),
            );
            node.properties
                .insert("is_bottleneck".to_string(), PropertyValue::Bool(metrics.is_bottleneck));
        }
        Ok(())
    }

    async fn write_critical_depth(&self, code: &str, depth: Option<u32>) -> GraphResult<()> {
        let mut graph = self.graph.lock().await;
        if let Some(node) = graph.nodes.get_mut(&(NodeKind::Course, code.to_string())) {
            match depth {
                Some(depth) => {
                    node.properties
                        .insert("critical_path_depth".to_string(), PropertyValue::Int(i64::from(depth)));
                }
                None => {
                    node.properties.remove("critical_path_depth");
                }
            }
        }
        Ok(())
    }

    async fn counts(&self) -> GraphResult<GraphCounts> {
        let graph = self.graph.lock().await;
        let mut counts = GraphCounts::default();
        for (kind, _) in graph.nodes.keys() {
            *counts.nodes.entry(kind.label().to_string()).or_default() += 1;
        }
        for (kind, _, _) in graph.edges.keys() {
            *counts.relationships.entry(kind.rel_type().to_string()).or_default() += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: NodeKind, key: &str, props: Properties) -> NodeRecord {
        NodeRecord {
            kind,
            key: key.to_string(),
            properties: props,
        }
    }

    #[tokio::test]
    async fn test_merge_node_creates_then_updates() {
        let store = MemoryStore::new();
        let session = store.open_session(Stage::EntitySync(NodeKind::Skill)).await.unwrap();

        let first = session
            .merge_node(&node(NodeKind::Skill, "SQL", Properties::new().with("category", "data")))
            .await
            .unwrap();
        let second = session
            .merge_node(&node(NodeKind::Skill, "SQL", Properties::new().with("category", "databases")))
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.node_id, second.node_id);

        let stored = store.node(NodeKind::Skill, "SQL").await.unwrap();
        assert_eq!(stored.property("category"), Some(&PropertyValue::from("databases")));
        assert_eq!(stored.property("name"), Some(&PropertyValue::from("SQL")));
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn test_same_key_different_kind_is_distinct() {
        let store = MemoryStore::new();
        let session = store.open_session(Stage::EntitySync(NodeKind::Major)).await.unwrap();
        session.merge_node(&node(NodeKind::Major, "Data", Properties::new())).await.unwrap();
        session.merge_node(&node(NodeKind::Skill, "Data", Properties::new())).await.unwrap();

        assert_eq!(store.node_count(NodeKind::Major).await, 1);
        assert_eq!(store.node_count(NodeKind::Skill).await, 1);
    }

    #[tokio::test]
    async fn test_edge_never_creates_endpoints() {
        let store = MemoryStore::new();
        let session = store.open_session(Stage::RelationshipSync(EdgeKind::Teaches)).await.unwrap();
        session.merge_node(&node(NodeKind::Course, "CS101", Properties::new())).await.unwrap();

        let edge = EdgeRecord {
            kind: EdgeKind::Teaches,
            source: "CS101".to_string(),
            target: "Rust".to_string(),
            properties: Properties::new().with("level", "beginner"),
        };
        assert_eq!(session.merge_edge(&edge).await.unwrap(), EdgeMerge::MissingEndpoint);
        assert_eq!(store.node_count(NodeKind::Skill).await, 0);
        assert_eq!(store.edge_count(EdgeKind::Teaches).await, 0);
    }

    #[tokio::test]
    async fn test_sessions_released_on_drop() {
        let store = MemoryStore::new();
        {
            let _a = store.open_session(Stage::SchemaSetup).await.unwrap();
            let _b = store.open_session(Stage::Analyze).await.unwrap();
            assert_eq!(store.open_sessions(), 2);
        }
        assert_eq!(store.open_sessions(), 0);
    }
}
