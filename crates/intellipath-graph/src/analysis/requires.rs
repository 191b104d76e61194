//! In-memory REQUIRES adjacency and the algorithms over it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;
use thiserror::Error;

use crate::store::CourseMetrics;

/// Minimum number of direct dependents that makes a course a bottleneck.
pub const BOTTLENECK_THRESHOLD: u32 = 2;

/// The REQUIRES sub-graph contains a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("REQUIRES cycle detected at '{node}' (closed by edge {via} -> {node})")]
pub struct CycleDetected {
    /// The course revisited while still in progress.
    pub node: String,
    /// Source of the edge that closed the cycle.
    pub via: String,
    /// The cycle as a path, starting and ending at `node`.
    pub cycle: Vec<String>,
}

/// Course adjacency over REQUIRES edges, keyed by course code.
///
/// `outgoing[a]` holds the courses `a` requires directly, `incoming[b]`
/// the courses that require `b`. Every course has an entry in both maps,
/// edge or no edge.
#[derive(Debug, Clone, Default)]
pub struct RequiresGraph {
    outgoing: BTreeMap<String, BTreeSet<String>>,
    incoming: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Clone, Copy)]
enum Visit {
    InProgress,
    Done(u32),
}

struct Frame<'g> {
    node: &'g str,
    children: std::vec::IntoIter<&'g str>,
    depth: u32,
}

impl RequiresGraph {
    /// Build from the full course key set and `(course, prerequisite)` pairs.
    pub fn new<C, E, K>(courses: C, edges: E) -> Self
    where
        C: IntoIterator<Item = K>,
        E: IntoIterator<Item = (K, K)>,
        K: Into<String>,
    {
        let mut graph = Self::default();
        for code in courses {
            graph.add_course(code.into());
        }
        for (course, prerequisite) in edges {
            let (course, prerequisite) = (course.into(), prerequisite.into());
            graph.add_course(course.clone());
            graph.add_course(prerequisite.clone());
            graph
                .incoming
                .entry(prerequisite.clone())
                .or_default()
                .insert(course.clone());
            graph.outgoing.entry(course).or_default().insert(prerequisite);
        }
        graph
    }

    fn add_course(&mut self, code: String) {
        self.incoming.entry(code.clone()).or_default();
        self.outgoing.entry(code).or_default();
    }

    pub fn course_count(&self) -> usize {
        self.outgoing.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(BTreeSet::len).sum()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.outgoing.contains_key(code)
    }

    /// Courses in sorted order.
    pub fn courses(&self) -> impl Iterator<Item = &str> {
        self.outgoing.keys().map(String::as_str)
    }

    fn requires(&self, code: &str) -> Vec<&str> {
        self.outgoing
            .get(code)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Number of distinct courses that directly require `code`.
    pub fn dependent_count(&self, code: &str) -> u32 {
        self.incoming.get(code).map_or(0, |deps| deps.len() as u32)
    }

    /// Fan-in metrics for every course.
    pub fn bottleneck_metrics(&self) -> BTreeMap<String, CourseMetrics> {
        self.incoming
            .iter()
            .map(|(code, dependents)| {
                let dependent_count = dependents.len() as u32;
                (
                    code.clone(),
                    CourseMetrics {
                        dependent_count,
                        is_bottleneck: dependent_count >= BOTTLENECK_THRESHOLD,
                    },
                )
            })
            .collect()
    }

    /// Longest REQUIRES path from each course to a leaf, in edges.
    ///
    /// Three-state depth-first traversal with an explicit stack: every node
    /// is finalized once, and meeting a node that is still in progress on
    /// the current path aborts with the cycle it closes.
    pub fn critical_depths(&self) -> Result<BTreeMap<String, u32>, CycleDetected> {
        let mut state: HashMap<&str, Visit> = HashMap::with_capacity(self.outgoing.len());

        for root in self.courses() {
            if state.contains_key(root) {
                continue;
            }
            state.insert(root, Visit::InProgress);
            let mut stack = vec![Frame {
                node: root,
                children: self.requires(root).into_iter(),
                depth: 0,
            }];

            loop {
                let Some(frame) = stack.last_mut() else {
                    break;
                };
                match frame.children.next() {
                    Some(child) => match state.get(child).copied() {
                        Some(Visit::Done(depth)) => frame.depth = frame.depth.max(depth + 1),
                        Some(Visit::InProgress) => return Err(cycle_error(&stack, child)),
                        None => {
                            state.insert(child, Visit::InProgress);
                            stack.push(Frame {
                                node: child,
                                children: self.requires(child).into_iter(),
                                depth: 0,
                            });
                        }
                    },
                    None => {
                        let (node, depth) = (frame.node, frame.depth);
                        stack.pop();
                        state.insert(node, Visit::Done(depth));
                        if let Some(parent) = stack.last_mut() {
                            parent.depth = parent.depth.max(depth + 1);
                        }
                    }
                }
            }
        }

        Ok(state
            .into_iter()
            .filter_map(|(code, visit)| match visit {
                Visit::Done(depth) => Some((code.to_string(), depth)),
                Visit::InProgress => None,
            })
            .collect())
    }

    /// Every course transitively required by `code`, with the hop distance
    /// of its nearest occurrence, nearest first.
    pub fn prerequisite_chain(&self, code: &str) -> Vec<(String, u32)> {
        let mut seen: HashSet<&str> = HashSet::from([code]);
        let mut queue: VecDeque<(&str, u32)> = VecDeque::from([(code, 0)]);
        let mut chain = Vec::new();

        while let Some((node, distance)) = queue.pop_front() {
            for prerequisite in self.requires(node) {
                if seen.insert(prerequisite) {
                    chain.push((prerequisite.to_string(), distance + 1));
                    queue.push_back((prerequisite, distance + 1));
                }
            }
        }
        chain
    }
}

fn cycle_error(stack: &[Frame<'_>], node: &str) -> CycleDetected {
    let start = stack.iter().position(|f| f.node == node).unwrap_or(0);
    let mut cycle: Vec<String> = stack[start..].iter().map(|f| f.node.to_string()).collect();
    cycle.push(node.to_string());

    CycleDetected {
        node: node.to_string(),
        via: stack.last().map(|f| f.node.to_string()).unwrap_or_default(),
        cycle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(courses: &[&str], edges: &[(&str, &str)]) -> RequiresGraph {
        RequiresGraph::new(courses.iter().copied(), edges.iter().copied())
    }

    #[test]
    fn test_bottleneck_fan_in() {
        let g = graph(&[], &[("A", "D"), ("B", "D"), ("C", "D"), ("A", "E")]);
        let metrics = g.bottleneck_metrics();

        assert_eq!(metrics["D"].dependent_count, 3);
        assert!(metrics["D"].is_bottleneck);
        assert_eq!(metrics["E"].dependent_count, 1);
        assert!(!metrics["E"].is_bottleneck);
        assert_eq!(metrics["A"].dependent_count, 0);
    }

    #[test]
    fn test_chain_depths() {
        let g = graph(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("C", "D")]);
        let depths = g.critical_depths().unwrap();

        assert_eq!(depths["D"], 0);
        assert_eq!(depths["C"], 1);
        assert_eq!(depths["B"], 2);
        assert_eq!(depths["A"], 3);
    }

    #[test]
    fn test_depth_takes_longest_branch() {
        // A -> B -> C and A -> C: the long way round counts.
        let g = graph(&["Z"], &[("A", "B"), ("B", "C"), ("A", "C")]);
        let depths = g.critical_depths().unwrap();

        assert_eq!(depths["A"], 2);
        assert_eq!(depths["Z"], 0);
        assert_eq!(depths.len(), 4);
    }

    #[test]
    fn test_two_node_cycle() {
        let g = graph(&[], &[("A", "B"), ("B", "A")]);
        let err = g.critical_depths().unwrap_err();

        assert_eq!(err.node, "A");
        assert_eq!(err.via, "B");
        assert_eq!(err.cycle, vec!["A", "B", "A"]);
        assert_eq!(err.to_string(), "REQUIRES cycle detected at 'A' (closed by edge B -> A)");
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let g = graph(&[], &[("A", "A")]);
        let err = g.critical_depths().unwrap_err();
        assert_eq!(err.cycle, vec!["A", "A"]);
        assert_eq!(g.dependent_count("A"), 1);
    }

    #[test]
    fn test_cycle_behind_acyclic_prefix() {
        let g = graph(&[], &[("A", "B"), ("B", "C"), ("C", "D"), ("D", "B")]);
        let err = g.critical_depths().unwrap_err();
        assert_eq!(err.cycle, vec!["B", "C", "D", "B"]);
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let codes: Vec<String> = (0..50_000).map(|i| format!("C{:05}", i)).collect();
        let edges: Vec<(String, String)> = codes.windows(2).map(|w| (w[0].clone(), w[1].clone())).collect();
        let g = RequiresGraph::new(codes.clone(), edges);

        let depths = g.critical_depths().unwrap();
        assert_eq!(depths["C00000"], 49_999);
    }

    #[test]
    fn test_prerequisite_chain_nearest_distance() {
        let g = graph(&[], &[("A", "B"), ("B", "C"), ("A", "C"), ("C", "D")]);
        let chain = g.prerequisite_chain("A");

        assert_eq!(
            chain,
            vec![
                ("B".to_string(), 1),
                ("C".to_string(), 1),
                ("D".to_string(), 2),
            ]
        );
        assert!(g.prerequisite_chain("D").is_empty());
        assert!(g.prerequisite_chain("missing").is_empty());
    }

    #[test]
    fn test_prerequisite_chain_terminates_on_cycle() {
        let g = graph(&[], &[("A", "B"), ("B", "A")]);
        assert_eq!(g.prerequisite_chain("A"), vec![("B".to_string(), 1)]);
    }
}
