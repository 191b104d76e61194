//! Critical path analysis over the REQUIRES sub-graph.
//!
//! Loads every course and REQUIRES edge from the store, computes fan-in
//! (bottlenecks) and longest-path depth in memory, then writes the derived
//! attributes back onto every course node. A cycle aborts only the depth
//! half: bottleneck values are still written, depths left by earlier runs
//! are cleared and the cycle is reported.

mod requires;

use serde::Serialize;
use tracing::{error, info};

pub use requires::{CycleDetected, RequiresGraph, BOTTLENECK_THRESHOLD};

use crate::error::GraphResult;
use crate::store::GraphSession;

/// Number of deepest courses listed in the report.
const DEEPEST_LISTED: usize = 10;

/// Outcome of one analyzer pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub courses: usize,
    pub requires_edges: usize,
    /// `(code, dependent_count)` for every bottleneck, most depended-on first.
    pub bottlenecks: Vec<(String, u32)>,
    /// `None` when depth computation was aborted by a cycle.
    pub max_depth: Option<u32>,
    /// `(code, depth)` for the deepest courses, deepest first.
    pub deepest: Vec<(String, u32)>,
    pub cycle: Option<CycleDetected>,
}

/// Read the REQUIRES adjacency out of the store.
pub async fn load_requires_graph<S: GraphSession + ?Sized>(session: &S) -> GraphResult<RequiresGraph> {
    let courses = session.course_codes().await?;
    let edges = session.requires_edges().await?;
    Ok(RequiresGraph::new(courses, edges))
}

/// Compute and write back `dependent_count`, `is_bottleneck` and
/// `critical_path_depth` for every course.
///
/// Store failures propagate; a cycle does not.
pub async fn run_analysis<S: GraphSession + ?Sized>(session: &S) -> GraphResult<AnalysisReport> {
    info!("Running critical path analysis");
    let graph = load_requires_graph(session).await?;

    let mut report = AnalysisReport {
        courses: graph.course_count(),
        requires_edges: graph.edge_count(),
        ..Default::default()
    };

    for (code, metrics) in graph.bottleneck_metrics() {
        session.write_course_metrics(&code, metrics).await?;
        if metrics.is_bottleneck {
            report.bottlenecks.push((code, metrics.dependent_count));
        }
    }
    report
        .bottlenecks
        .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    info!(bottlenecks = report.bottlenecks.len(), "Bottleneck detection complete");

    match graph.critical_depths() {
        Ok(depths) => {
            for (code, depth) in &depths {
                session.write_critical_depth(code, Some(*depth)).await?;
            }
            let mut ranked: Vec<(String, u32)> = depths.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            report.max_depth = ranked.first().map(|(_, depth)| *depth);
            ranked.truncate(DEEPEST_LISTED);
            report.deepest = ranked;
            info!(max_depth = report.max_depth.unwrap_or(0), "Critical path depths computed");
        }
        Err(cycle) => {
            error!(node = %cycle.node, via = %cycle.via, path = %cycle.cycle.join(" -> "), "{}", cycle);
            for code in graph.courses() {
                session.write_critical_depth(code, None).await?;
            }
            report.cycle = Some(cycle);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use intellipath_core::{EdgeKind, EdgeRecord, NodeKind, NodeRecord, Properties, PropertyValue};

    use crate::memory::MemoryStore;
    use crate::pipeline::Stage;
    use crate::store::GraphStore;

    async fn seed(store: &MemoryStore, courses: &[&str], requires: &[(&str, &str)]) {
        let session = store.open_session(Stage::EntitySync(NodeKind::Course)).await.unwrap();
        for code in courses {
            session
                .merge_node(&NodeRecord {
                    kind: NodeKind::Course,
                    key: code.to_string(),
                    properties: Properties::new(),
                })
                .await
                .unwrap();
        }
        for (course, prerequisite) in requires {
            session
                .merge_edge(&EdgeRecord {
                    kind: EdgeKind::Requires,
                    source: course.to_string(),
                    target: prerequisite.to_string(),
                    properties: Properties::new(),
                })
                .await
                .unwrap();
        }
    }

    async fn property(store: &MemoryStore, code: &str, name: &str) -> Option<PropertyValue> {
        store
            .node(NodeKind::Course, code)
            .await
            .and_then(|n| n.property(name).cloned())
    }

    #[tokio::test]
    async fn test_writes_metrics_for_every_course() {
        let store = MemoryStore::new();
        seed(&store, &["A", "B", "C", "D", "LONE"], &[("A", "D"), ("B", "D"), ("C", "D")]).await;
        let session = store.open_session(Stage::Analyze).await.unwrap();

        let report = run_analysis(&session).await.unwrap();

        assert_eq!(report.courses, 5);
        assert_eq!(report.requires_edges, 3);
        assert_eq!(report.bottlenecks, vec![("D".to_string(), 3)]);
        assert_eq!(report.max_depth, Some(1));
        assert_eq!(property(&store, "D", "is_bottleneck").await, Some(PropertyValue::Bool(true)));
        assert_eq!(property(&store, "LONE", "dependent_count").await, Some(PropertyValue::Int(0)));
        assert_eq!(property(&store, "LONE", "critical_path_depth").await, Some(PropertyValue::Int(0)));
        assert_eq!(property(&store, "A", "critical_path_depth").await, Some(PropertyValue::Int(1)));
    }

    #[tokio::test]
    async fn test_cycle_keeps_bottleneck_results() {
        let store = MemoryStore::new();
        seed(&store, &["A", "B", "C"], &[("A", "B"), ("B", "A"), ("C", "B")]).await;
        let session = store.open_session(Stage::Analyze).await.unwrap();

        let report = run_analysis(&session).await.unwrap();

        let cycle = report.cycle.expect("cycle reported");
        assert_eq!(cycle.cycle, vec!["A", "B", "A"]);
        assert_eq!(report.max_depth, None);
        assert!(report.deepest.is_empty());
        assert_eq!(report.bottlenecks, vec![("B".to_string(), 2)]);
        assert_eq!(property(&store, "B", "dependent_count").await, Some(PropertyValue::Int(2)));
        assert_eq!(property(&store, "A", "critical_path_depth").await, None);
    }

    #[tokio::test]
    async fn test_cycle_clears_depths_from_earlier_runs() {
        let store = MemoryStore::new();
        seed(&store, &["A", "B", "C"], &[("A", "B"), ("B", "C")]).await;
        {
            let session = store.open_session(Stage::Analyze).await.unwrap();
            run_analysis(&session).await.unwrap();
        }
        assert_eq!(property(&store, "A", "critical_path_depth").await, Some(PropertyValue::Int(2)));

        seed(&store, &[], &[("C", "A")]).await;
        let session = store.open_session(Stage::Analyze).await.unwrap();
        let report = run_analysis(&session).await.unwrap();

        assert!(report.cycle.is_some());
        for code in ["A", "B", "C"] {
            assert_eq!(property(&store, code, "critical_path_depth").await, None);
            assert_eq!(property(&store, code, "dependent_count").await, Some(PropertyValue::Int(1)));
        }
    }

    #[tokio::test]
    async fn test_deepest_list_is_capped() {
        let store = MemoryStore::new();
        let codes: Vec<String> = (0..15).map(|i| format!("C{:02}", i)).collect();
        let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = refs.windows(2).map(|w| (w[0], w[1])).collect();
        seed(&store, &refs, &edges).await;
        let session = store.open_session(Stage::Analyze).await.unwrap();

        let report = run_analysis(&session).await.unwrap();

        assert_eq!(report.deepest.len(), DEEPEST_LISTED);
        assert_eq!(report.deepest[0], ("C00".to_string(), 14));
        assert_eq!(report.max_depth, Some(14));
    }
}
