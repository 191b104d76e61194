//! Neo4j connection client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use neo4rs::{BoltNull, BoltType, ConfigBuilder, Graph, Query, Row};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use intellipath_core::{EdgeRecord, NodeRecord, Properties, PropertyValue};

use crate::error::{GraphError, GraphResult};
use crate::pipeline::Stage;
use crate::schema::SchemaStatement;
use crate::store::{CourseMetrics, EdgeMerge, GraphCounts, GraphSession, GraphStore, NodeMerge};

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            max_connections: 16,
        }
    }
}

/// Neo4j-backed [`GraphStore`].
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Create the connection pool.
    ///
    /// neo4rs pools lazily: no bolt handshake happens until the first query,
    /// which is why the orchestrator runs [`GraphStore::verify_connectivity`]
    /// before anything else.
    pub async fn connect(config: &GraphConfig) -> GraphResult<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(config.max_connections)
            .fetch_size(500)
            .build()?;

        let graph = Graph::connect(neo4j_config).await?;
        Ok(Self { graph })
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    type Session = Neo4jSession;

    async fn verify_connectivity(&self) -> GraphResult<()> {
        let session = Neo4jSession::new(self.graph.clone(), Stage::ConnectivityCheck);
        let value: Option<i64> = session
            .query_scalar(Query::new("RETURN 1 AS test".to_string()), "test")
            .await
            .map_err(|e| GraphError::Unreachable(e.to_string()))?;

        match value {
            Some(1) => Ok(()),
            other => Err(GraphError::Unreachable(format!(
                "unexpected ping response: {:?}",
                other
            ))),
        }
    }

    async fn open_session(&self, stage: Stage) -> GraphResult<Neo4jSession> {
        Ok(Neo4jSession::new(self.graph.clone(), stage))
    }
}

/// A stage-scoped handle on the Neo4j pool.
pub struct Neo4jSession {
    graph: Graph,
    stage: Stage,
}

impl Neo4jSession {
    fn new(graph: Graph, stage: Stage) -> Self {
        debug!(%stage, "Graph session opened");
        Self { graph, stage }
    }

    /// Execute a Cypher query that returns no results.
    async fn execute(&self, query: Query) -> GraphResult<()> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a Cypher query and return results as rows.
    async fn query(&self, query: Query) -> GraphResult<Vec<Row>> {
        let mut result = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a Cypher query and return a single scalar value.
    async fn query_scalar<T: DeserializeOwned>(&self, query: Query, field: &str) -> GraphResult<Option<T>> {
        match self.query(query).await?.into_iter().next() {
            Some(row) => Ok(Some(get_field(&row, field)?)),
            None => Ok(None),
        }
    }
}

impl Drop for Neo4jSession {
    fn drop(&mut self) {
        debug!(stage = %self.stage, "Graph session released");
    }
}

fn get_field<T: DeserializeOwned>(row: &Row, field: &str) -> GraphResult<T> {
    row.get(field).map_err(|e| GraphError::Field {
        field: field.to_string(),
        message: format!("{:?}", e),
    })
}

fn to_bolt(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::Null => BoltType::Null(BoltNull),
        PropertyValue::Bool(b) => BoltType::from(*b),
        PropertyValue::Int(i) => BoltType::from(*i),
        PropertyValue::Float(f) => BoltType::from(*f),
        PropertyValue::Text(s) => BoltType::from(s.as_str()),
    }
}

/// `, {var}.name = $name` for every property, in order.
fn set_clause(var: &str, properties: &Properties) -> String {
    properties
        .iter()
        .map(|(name, _)| format!(", {var}.{name} = ${name}"))
        .collect()
}

fn bind_properties(mut query: Query, properties: &Properties) -> Query {
    for (name, value) in properties.iter() {
        query = query.param(name, to_bolt(value));
    }
    query
}

/// MERGE by natural key. `created` is decided by looking for the node before
/// the MERGE, so nodes without timestamps (written by older tools) still
/// report as updated. The aggregate keeps the statement at exactly one row.
fn merge_node_cypher(node: &NodeRecord) -> String {
    format!(
        "OPTIONAL MATCH (existing:{label} {{{key_field}: $key}})
         WITH count(existing) = 0 AS created
         MERGE (n:{label} {{{key_field}: $key}})
         ON CREATE SET n.created_at = datetime()
         SET n.updated_at = datetime(){set}
         RETURN elementId(n) AS node_id, created",
        label = node.kind.label(),
        key_field = node.kind.key_field(),
        set = set_clause("n", &node.properties),
    )
}

fn merge_node_query(node: &NodeRecord) -> Query {
    bind_properties(Query::new(merge_node_cypher(node)), &node.properties).param("key", node.key.as_str())
}

/// MATCH both endpoints, then MERGE the edge. Zero rows means an endpoint is
/// missing: grouping by `a, b` yields no row when either MATCH found nothing.
fn merge_edge_cypher(edge: &EdgeRecord) -> String {
    let source = edge.kind.source_kind();
    let target = edge.kind.target_kind();
    format!(
        "MATCH (a:{source_label} {{{source_key}: $source}})
         MATCH (b:{target_label} {{{target_key}: $target}})
         OPTIONAL MATCH (a)-[existing:{rel}]->(b)
         WITH a, b, count(existing) = 0 AS created
         MERGE (a)-[r:{rel}]->(b)
         ON CREATE SET r.created_at = datetime()
         SET r.synced_at = datetime(){set}
         RETURN created",
        source_label = source.label(),
        source_key = source.key_field(),
        target_label = target.label(),
        target_key = target.key_field(),
        rel = edge.kind.rel_type(),
        set = set_clause("r", &edge.properties),
    )
}

fn merge_edge_query(edge: &EdgeRecord) -> Query {
    bind_properties(Query::new(merge_edge_cypher(edge)), &edge.properties)
        .param("source", edge.source.as_str())
        .param("target", edge.target.as_str())
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn apply_schema(&self, statement: &SchemaStatement) -> GraphResult<()> {
        self.execute(Query::new(statement.cypher.to_string())).await
    }

    async fn wipe(&self) -> GraphResult<()> {
        self.execute(Query::new("MATCH (n) DETACH DELETE n".to_string())).await
    }

    async fn merge_node(&self, node: &NodeRecord) -> GraphResult<NodeMerge> {
        let rows = self.query(merge_node_query(node)).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| GraphError::Rejected(format!("MERGE returned no row for {} '{}'", node.kind, node.key)))?;

        Ok(NodeMerge {
            node_id: get_field(&row, "node_id")?,
            created: get_field(&row, "created")?,
        })
    }

    async fn merge_edge(&self, edge: &EdgeRecord) -> GraphResult<EdgeMerge> {
        let created: Option<bool> = self.query_scalar(merge_edge_query(edge), "created").await?;
        Ok(match created {
            None => EdgeMerge::MissingEndpoint,
            Some(true) => EdgeMerge::Created,
            Some(false) => EdgeMerge::Updated,
        })
    }

    async fn course_codes(&self) -> GraphResult<Vec<String>> {
        let rows = self
            .query(Query::new("MATCH (c:Course) RETURN c.code AS code".to_string()))
            .await?;
        rows.iter().map(|row| get_field(row, "code")).collect()
    }

    async fn requires_edges(&self) -> GraphResult<Vec<(String, String)>> {
        let rows = self
            .query(Query::new(
                "MATCH (c:Course)-[:REQUIRES]->(p:Course) RETURN c.code AS course, p.code AS prerequisite"
                    .to_string(),
            ))
            .await?;
        rows.iter()
            .map(|row| Ok((get_field(row, "course")?, get_field(row, "prerequisite")?)))
            .collect()
    }

    async fn write_course_metrics(&self, code: &str, metrics: CourseMetrics) -> GraphResult<()> {
        let query = Query::new(
            "MATCH (c:Course {code: $code})
             SET c.dependent_count = $dependent_count,
                 c.is_bottleneck = $is_bottleneck"
                .to_string(),
        )
        .param("code", code)
        .param("dependent_count", i64::from(metrics.dependent_count))
        .param("is_bottleneck", metrics.is_bottleneck);

        self.execute(query).await
    }

    async fn write_critical_depth(&self, code: &str, depth: Option<u32>) -> GraphResult<()> {
        // Setting a property to null removes it.
        let depth = depth.map_or(BoltType::Null(BoltNull), |d| BoltType::from(i64::from(d)));
        let query = Query::new(
            "MATCH (c:Course {code: $code})
             SET c.critical_path_depth = $depth"
                .to_string(),
        )
        .param("code", code)
        .param("depth", depth);

        self.execute(query).await
    }

    async fn counts(&self) -> GraphResult<GraphCounts> {
        let node_rows = self
            .query(Query::new(
                "MATCH (n) UNWIND labels(n) AS label RETURN label, count(*) AS count".to_string(),
            ))
            .await?;
        let rel_rows = self
            .query(Query::new(
                "MATCH ()-[r]->() RETURN type(r) AS rel_type, count(r) AS count".to_string(),
            ))
            .await?;

        let mut nodes = BTreeMap::new();
        for row in &node_rows {
            let count: i64 = get_field(row, "count")?;
            nodes.insert(get_field::<String>(row, "label")?, count as usize);
        }
        let mut relationships = BTreeMap::new();
        for row in &rel_rows {
            let count: i64 = get_field(row, "count")?;
            relationships.insert(get_field::<String>(row, "rel_type")?, count as usize);
        }

        Ok(GraphCounts { nodes, relationships })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intellipath_core::{EdgeKind, NodeKind};

    #[test]
    fn test_merge_node_cypher_sets_every_property() {
        let node = NodeRecord {
            kind: NodeKind::Course,
            key: "CS201".to_string(),
            properties: Properties::new().with("name", "Data Structures").with("credits", 3i64),
        };
        let cypher = merge_node_cypher(&node);

        assert!(cypher.contains("MERGE (n:Course {code: $key})"));
        assert!(cypher.contains("SET n.updated_at = datetime(), n.name = $name, n.credits = $credits"));
        assert!(cypher.contains("ON CREATE SET n.created_at = datetime()"));
    }

    #[test]
    fn test_merge_node_cypher_uses_name_key_for_skills() {
        let node = NodeRecord {
            kind: NodeKind::Skill,
            key: "SQL".to_string(),
            properties: Properties::new(),
        };
        let cypher = merge_node_cypher(&node);
        assert!(cypher.starts_with("OPTIONAL MATCH (existing:Skill {name: $key})"));
        assert!(cypher.contains("MERGE (n:Skill {name: $key})"));
    }

    #[test]
    fn test_created_does_not_depend_on_timestamps() {
        let node = NodeRecord {
            kind: NodeKind::Major,
            key: "Computer Science".to_string(),
            properties: Properties::new(),
        };
        let cypher = merge_node_cypher(&node);

        let lookup = cypher.find("WITH count(existing) = 0 AS created").unwrap();
        assert!(lookup < cypher.find("MERGE (n:Major").unwrap());
        assert!(cypher.trim_end().ends_with("RETURN elementId(n) AS node_id, created"));
        assert!(!cypher.contains("n.created_at = n.updated_at"));

        let edge = EdgeRecord {
            kind: EdgeKind::Requires,
            source: "CS201".to_string(),
            target: "CS101".to_string(),
            properties: Properties::new(),
        };
        let cypher = merge_edge_cypher(&edge);

        assert!(cypher.contains("OPTIONAL MATCH (a)-[existing:REQUIRES]->(b)"));
        assert!(cypher.contains("WITH a, b, count(existing) = 0 AS created"));
        assert!(cypher.trim_end().ends_with("RETURN created"));
        assert!(!cypher.contains("r.created_at = r.synced_at"));
    }

    #[test]
    fn test_merge_edge_cypher_matches_both_endpoints() {
        let edge = EdgeRecord {
            kind: EdgeKind::PreparesFor,
            source: "CS201".to_string(),
            target: "Data Engineer".to_string(),
            properties: Properties::new().with("importance", "core"),
        };
        let cypher = merge_edge_cypher(&edge);

        assert!(cypher.contains("MATCH (a:Course {code: $source})"));
        assert!(cypher.contains("MATCH (b:CareerPath {name: $target})"));
        assert!(cypher.contains("MERGE (a)-[r:PREPARES_FOR]->(b)"));
        assert!(cypher.contains("r.importance = $importance"));
        assert!(!cypher.contains("MERGE (a:"));
    }

    #[test]
    fn test_set_clause_empty_for_no_properties() {
        assert_eq!(set_clause("r", &Properties::new()), "");
    }
}
