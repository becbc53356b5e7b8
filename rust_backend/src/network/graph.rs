//! Graph types for the person / service-task network.
//!
//! Both graphs wrap a petgraph [`UnGraph`] together with a label index so
//! nodes can be looked up by name in O(1). Node indices follow first
//! appearance, which keeps every derived output in a stable order.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Read access shared by the bipartite graph and its projection.
pub trait NetworkView {
    type Node;
    type Edge;

    /// Underlying undirected topology.
    fn topology(&self) -> &UnGraph<Self::Node, Self::Edge>;

    /// Edges the graph could hold at most, the density denominator.
    fn possible_edges(&self) -> u64;

    /// Whether global clustering is meaningful for this graph.
    fn supports_clustering(&self) -> bool;

    fn node_count(&self) -> usize {
        self.topology().node_count()
    }

    fn edge_count(&self) -> usize {
        self.topology().edge_count()
    }

    /// Degrees in node order.
    fn degrees(&self) -> Vec<usize> {
        let graph = self.topology();
        graph
            .node_indices()
            .map(|n| graph.edges(n).count())
            .collect()
    }
}

/// A node of the bipartite graph. Persons and service-tasks live in separate
/// namespaces, so equal labels on both sides are different nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkNode {
    Person(String),
    Task(String),
}

impl NetworkNode {
    pub fn label(&self) -> &str {
        match self {
            NetworkNode::Person(label) | NetworkNode::Task(label) => label,
        }
    }

    pub fn is_person(&self) -> bool {
        matches!(self, NetworkNode::Person(_))
    }
}

impl fmt::Display for NetworkNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkNode::Person(label) => write!(f, "person:{}", label),
            NetworkNode::Task(label) => write!(f, "task:{}", label),
        }
    }
}

/// One person to service-task link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BipartiteEdge {
    pub person: String,
    pub service_task: String,
}

impl BipartiteEdge {
    pub fn new(person: impl Into<String>, service_task: impl Into<String>) -> Self {
        Self {
            person: person.into(),
            service_task: service_task.into(),
        }
    }
}

/// Unweighted person / service-task graph with collapsed multiplicity.
#[derive(Debug, Clone, Default)]
pub struct BipartiteGraph {
    graph: UnGraph<NetworkNode, ()>,
    persons: HashMap<String, NodeIndex>,
    tasks: HashMap<String, NodeIndex>,
}

impl BipartiteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node for a person.
    pub fn ensure_person(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.persons.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(NetworkNode::Person(name.to_string()));
        self.persons.insert(name.to_string(), idx);
        idx
    }

    /// Get or create the node for a service-task.
    pub fn ensure_task(&mut self, label: &str) -> NodeIndex {
        if let Some(&idx) = self.tasks.get(label) {
            return idx;
        }
        let idx = self.graph.add_node(NetworkNode::Task(label.to_string()));
        self.tasks.insert(label.to_string(), idx);
        idx
    }

    /// Links a person to a service-task. Returns `false` when the link
    /// already existed.
    pub fn add_link(&mut self, person: &str, service_task: &str) -> bool {
        let p = self.ensure_person(person);
        let t = self.ensure_task(service_task);
        if self.graph.find_edge(p, t).is_some() {
            return false;
        }
        self.graph.add_edge(p, t, ());
        true
    }

    pub fn person_count(&self) -> usize {
        self.persons.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn person_index(&self, name: &str) -> Option<NodeIndex> {
        self.persons.get(name).copied()
    }

    pub fn task_index(&self, label: &str) -> Option<NodeIndex> {
        self.tasks.get(label).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&NetworkNode> {
        self.graph.node_weight(idx)
    }

    /// Person node indices in first-appearance order.
    pub fn person_nodes(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&n| self.graph[n].is_person())
            .collect()
    }

    /// Service-task node indices in first-appearance order.
    pub fn task_nodes(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&n| !self.graph[n].is_person())
            .collect()
    }

    /// Neighbors of `idx` sorted by node index.
    pub fn sorted_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    /// Service-tasks linked to a person, in first-appearance order.
    pub fn tasks_of(&self, person: &str) -> Vec<&str> {
        match self.person_index(person) {
            Some(idx) => self
                .sorted_neighbors(idx)
                .into_iter()
                .map(|n| self.graph[n].label())
                .collect(),
            None => Vec::new(),
        }
    }

    /// `(person, service_task)` rows in link order.
    pub fn edge_rows(&self) -> Vec<(String, String)> {
        self.graph
            .edge_references()
            .filter_map(|e| {
                let (a, b) = (&self.graph[e.source()], &self.graph[e.target()]);
                match (a, b) {
                    (NetworkNode::Person(p), NetworkNode::Task(t))
                    | (NetworkNode::Task(t), NetworkNode::Person(p)) => {
                        Some((p.clone(), t.clone()))
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

impl NetworkView for BipartiteGraph {
    type Node = NetworkNode;
    type Edge = ();

    fn topology(&self) -> &UnGraph<NetworkNode, ()> {
        &self.graph
    }

    fn possible_edges(&self) -> u64 {
        self.person_count() as u64 * self.task_count() as u64
    }

    fn supports_clustering(&self) -> bool {
        false
    }
}

/// Weighted client-client graph. Edge weight is the number of distinct
/// service-tasks both persons share; absent edge means none.
#[derive(Debug, Clone, Default)]
pub struct ProjectedGraph {
    graph: UnGraph<String, u32>,
    index: HashMap<String, NodeIndex>,
}

impl ProjectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node for a person.
    pub fn ensure_person(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub(crate) fn connect(&mut self, a: NodeIndex, b: NodeIndex, weight: u32) {
        self.graph.update_edge(a, b, weight);
    }

    pub fn person_index(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    pub fn person(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node_weight(idx).map(String::as_str)
    }

    /// Shared-task count between two persons, `None` when they share nothing.
    pub fn weight(&self, a: &str, b: &str) -> Option<u32> {
        let (a, b) = (self.person_index(a)?, self.person_index(b)?);
        let edge = self.graph.find_edge(a, b)?;
        self.graph.edge_weight(edge).copied()
    }

    /// Sum of incident edge weights per node, in node order.
    pub fn strengths(&self) -> Vec<u64> {
        self.graph
            .node_indices()
            .map(|n| self.graph.edges(n).map(|e| u64::from(*e.weight())).sum())
            .collect()
    }

    pub fn weights(&self) -> Vec<u32> {
        self.graph.edge_weights().copied().collect()
    }

    /// `(person_a, person_b, weight)` rows, each unordered pair once with
    /// `person_a` the earlier node.
    pub fn edge_rows(&self) -> Vec<(String, String, u32)> {
        self.graph
            .edge_references()
            .map(|e| {
                let (a, b) = if e.source() <= e.target() {
                    (e.source(), e.target())
                } else {
                    (e.target(), e.source())
                };
                (self.graph[a].clone(), self.graph[b].clone(), *e.weight())
            })
            .collect()
    }
}

impl NetworkView for ProjectedGraph {
    type Node = String;
    type Edge = u32;

    fn topology(&self) -> &UnGraph<String, u32> {
        &self.graph
    }

    fn possible_edges(&self) -> u64 {
        let n = self.graph.node_count() as u64;
        n * n.saturating_sub(1) / 2
    }

    fn supports_clustering(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bipartite_namespaces_are_separate() {
        let mut g = BipartiteGraph::new();
        assert!(g.add_link("X", "X"));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.person_count(), 1);
        assert_eq!(g.task_count(), 1);
        assert_ne!(g.person_index("X"), g.task_index("X"));
    }

    #[test]
    fn test_bipartite_collapses_multiplicity() {
        let mut g = BipartiteGraph::new();
        assert!(g.add_link("ANA", "T1"));
        assert!(!g.add_link("ANA", "T1"));
        assert!(g.add_link("ANA", "T2"));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.tasks_of("ANA"), vec!["T1", "T2"]);
        assert_eq!(
            g.edge_rows(),
            vec![
                ("ANA".to_string(), "T1".to_string()),
                ("ANA".to_string(), "T2".to_string())
            ]
        );
    }

    #[test]
    fn test_possible_edges() {
        let mut g = BipartiteGraph::new();
        g.add_link("A", "X");
        g.add_link("B", "Y");
        g.add_link("C", "Y");
        assert_eq!(g.possible_edges(), 6);

        let mut p = ProjectedGraph::new();
        for name in ["A", "B", "C", "D"] {
            p.ensure_person(name);
        }
        assert_eq!(p.possible_edges(), 6);
        assert_eq!(ProjectedGraph::new().possible_edges(), 0);
    }

    #[test]
    fn test_projected_weights_and_strength() {
        let mut p = ProjectedGraph::new();
        let a = p.ensure_person("A");
        let b = p.ensure_person("B");
        let c = p.ensure_person("C");
        p.connect(a, b, 2);
        p.connect(c, a, 1);

        assert_eq!(p.weight("B", "A"), Some(2));
        assert_eq!(p.weight("B", "C"), None);
        assert_eq!(p.strengths(), vec![3, 2, 1]);
        assert_eq!(p.degrees(), vec![2, 1, 1]);
        assert_eq!(
            p.edge_rows(),
            vec![
                ("A".to_string(), "B".to_string(), 2),
                ("A".to_string(), "C".to_string(), 1)
            ]
        );
    }
}
