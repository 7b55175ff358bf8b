//! Deterministic dependency ordering.
//!
//! A depth-first topological sort over named nodes. Dependencies always come
//! before their dependents ("leaves first"). Ties between unrelated nodes are
//! broken by declaration order, so the same input always yields the same order.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// Errors raised while ordering a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The dependency relation is not a DAG.
    #[error("dependency cycle detected: {}", .nodes.join(" -> "))]
    CycleDetected {
        /// Nodes participating in the cycle, in traversal order.
        nodes: Vec<String>,
    },

    /// A node depends on something that is not part of the graph.
    #[error("{node} depends on unknown node {dependency}")]
    UnknownNode {
        /// The node declaring the dependency.
        node: String,
        /// The missing dependency.
        dependency: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Order `nodes` so that every dependency precedes its dependents.
///
/// `dependency_fn` returns the declared dependencies of a node. Every returned
/// dependency must itself be one of `nodes`.
pub fn topological_order<N, F, I>(nodes: &[N], dependency_fn: F) -> Result<Vec<N>, GraphError>
where
    N: Clone + Eq + Hash + fmt::Display,
    F: Fn(&N) -> I,
    I: IntoIterator<Item = N>,
{
    let index: HashMap<&N, usize> = nodes.iter().enumerate().map(|(i, n)| (n, i)).collect();

    let mut edges = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut deps = Vec::new();
        for dep in dependency_fn(node) {
            match index.get(&dep) {
                Some(&i) => deps.push(i),
                None => {
                    return Err(GraphError::UnknownNode {
                        node: node.to_string(),
                        dependency: dep.to_string(),
                    })
                }
            }
        }
        edges.push(deps);
    }

    let order = sort_indices(&edges).map_err(|cycle| GraphError::CycleDetected {
        nodes: cycle.into_iter().map(|i| nodes[i].to_string()).collect(),
    })?;

    Ok(order.into_iter().map(|i| nodes[i].clone()).collect())
}

/// Sort node indices given per-node dependency lists.
///
/// On failure returns the indices forming the cycle.
fn sort_indices(edges: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut order = Vec::with_capacity(edges.len());
    let mut path = Vec::new();

    for start in 0..edges.len() {
        if marks[start] == Mark::Unvisited {
            visit(start, edges, &mut marks, &mut path, &mut order)?;
        }
    }

    Ok(order)
}

fn visit(
    node: usize,
    edges: &[Vec<usize>],
    marks: &mut [Mark],
    path: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), Vec<usize>> {
    marks[node] = Mark::InProgress;
    path.push(node);

    for &dep in &edges[node] {
        match marks[dep] {
            Mark::Done => {}
            Mark::Unvisited => visit(dep, edges, marks, path, order)?,
            Mark::InProgress => {
                // `dep` is on the current path; everything after it closes the loop.
                let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                return Err(path[start..].to_vec());
            }
        }
    }

    path.pop();
    marks[node] = Mark::Done;
    order.push(node);
    Ok(())
}

/// An explicitly built dependency graph over string-named nodes.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes in declaration order.
    nodes: Vec<String>,
    /// Node name -> position in `nodes`.
    index: HashMap<String, usize>,
    /// Declared dependencies of each node, in declaration order.
    dependencies: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if it is not already present.
    pub fn add_node(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        if let Some(&idx) = self.index.get(&name) {
            return idx;
        }
        let idx = self.nodes.len();
        self.index.insert(name.clone(), idx);
        self.nodes.push(name);
        self.dependencies.push(Vec::new());
        idx
    }

    /// Declare that `dependent` depends on `dependency`.
    pub fn add_edge(&mut self, dependent: impl Into<String>, dependency: impl Into<String>) {
        let from = self.add_node(dependent);
        let to = self.add_node(dependency);
        if !self.dependencies[from].contains(&to) {
            self.dependencies[from].push(to);
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check if a node exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Direct dependencies of a node, in declaration order.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&idx| {
                self.dependencies[idx]
                    .iter()
                    .map(|&d| self.nodes[d].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes that directly depend on `name`, in declaration order.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        let Some(&target) = self.index.get(name) else {
            return Vec::new();
        };
        self.nodes
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.dependencies[*idx].contains(&target))
            .map(|(_, n)| n.as_str())
            .collect()
    }

    /// Produce the dependencies-first order of all nodes.
    pub fn sort(&self) -> Result<Vec<String>, GraphError> {
        let order = sort_indices(&self.dependencies).map_err(|cycle| GraphError::CycleDetected {
            nodes: cycle.into_iter().map(|i| self.nodes[i].clone()).collect(),
        })?;
        Ok(order.into_iter().map(|i| self.nodes[i].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_dependencies_come_first() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("web", "auth");
        graph.add_edge("web", "core");
        graph.add_edge("auth", "core");
        graph.add_node("billing");
        graph.add_edge("billing", "auth");

        let order = graph.sort().unwrap();
        assert_eq!(order.len(), 4);
        for node in ["web", "auth", "billing"] {
            for dep in graph.dependencies_of(node) {
                assert!(position(&order, dep) < position(&order, node));
            }
        }
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let nodes = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let order = topological_order(&nodes, |_| Vec::<String>::new()).unwrap();
        assert_eq!(order, nodes);
    }

    #[test]
    fn test_sort_is_deterministic() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("one", "base");
        graph.add_edge("two", "base");
        graph.add_edge("three", "one");
        graph.add_edge("three", "two");

        let first = graph.sort().unwrap();
        for _ in 0..10 {
            assert_eq!(graph.sort().unwrap(), first);
        }
        assert_eq!(first, vec!["base", "one", "two", "three"]);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");

        match graph.sort() {
            Err(GraphError::CycleDetected { nodes }) => {
                assert_eq!(nodes, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let nodes = vec!["solo"];
        let err = topological_order(&nodes, |n| vec![*n]).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                nodes: vec!["solo".to_string()]
            }
        );
    }

    #[test]
    fn test_unknown_dependency() {
        let nodes = vec!["web"];
        let err = topological_order(&nodes, |_| vec!["ghost"]).unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode { .. }));
        assert_eq!(err.to_string(), "web depends on unknown node ghost");
    }

    #[test]
    fn test_dependents_of() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("one", "base");
        graph.add_edge("two", "base");

        assert_eq!(graph.dependents_of("base"), vec!["one", "two"]);
        assert!(graph.dependents_of("one").is_empty());
        assert!(graph.dependents_of("missing").is_empty());
    }
}
