use petgraph::graph::NodeIndex;
use polars::prelude::StringChunked;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::NetworkSettings;
use crate::core::domain::Dataset;
use crate::core::error::PipelineResult;
use crate::network::graph::{BipartiteEdge, BipartiteGraph, ProjectedGraph};

/// Extracts the distinct `(person, service_task)` pairs of a cleaned dataset.
///
/// The service-task label joins `settings.task_columns` with
/// `settings.task_separator`. Pairs keep their first-occurrence order; rows
/// with a null person or task cell are skipped.
///
/// # Errors
///
/// [`PipelineError::MissingColumn`](crate::core::error::PipelineError::MissingColumn)
/// when the person column or a task column is absent.
pub fn create_bipartite_edges(
    dataset: &Dataset,
    settings: &NetworkSettings,
) -> PipelineResult<Vec<BipartiteEdge>> {
    let persons = dataset.require_text(&settings.person_column)?;
    let tasks = settings
        .task_columns
        .iter()
        .map(|c| dataset.require_text(c))
        .collect::<PipelineResult<Vec<&StringChunked>>>()?;

    let mut seen: HashSet<BipartiteEdge> = HashSet::new();
    let mut edges = Vec::new();
    for row in 0..dataset.height() {
        let Some(person) = persons.get(row) else {
            continue;
        };
        let parts: Option<Vec<&str>> = tasks.iter().map(|ca| ca.get(row)).collect();
        let Some(parts) = parts else {
            continue;
        };

        let edge = BipartiteEdge::new(person, parts.join(&settings.task_separator));
        if seen.insert(edge.clone()) {
            edges.push(edge);
        }
    }

    Ok(edges)
}

/// Builds the bipartite graph; nodes are created in edge order.
pub fn create_bipartite_graph(edges: &[BipartiteEdge]) -> BipartiteGraph {
    let mut graph = BipartiteGraph::new();
    for edge in edges {
        graph.add_link(&edge.person, &edge.service_task);
    }
    graph
}

/// Projects the bipartite graph onto its persons.
///
/// Each service-task contributes one shared task to every pair of its
/// persons, so the work is proportional to the sum of squared task sizes
/// rather than to all person pairs. Every person becomes a node, including
/// those who share nothing.
pub fn project_client_client(bipartite: &BipartiteGraph) -> ProjectedGraph {
    let mut projected = ProjectedGraph::new();
    let mut mapping: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    for person in bipartite.person_nodes() {
        if let Some(node) = bipartite.node(person) {
            mapping.insert(person, projected.ensure_person(node.label()));
        }
    }

    let mut pair_counts: BTreeMap<(NodeIndex, NodeIndex), u32> = BTreeMap::new();
    for task in bipartite.task_nodes() {
        let members: Vec<NodeIndex> = bipartite
            .sorted_neighbors(task)
            .into_iter()
            .filter_map(|p| mapping.get(&p).copied())
            .collect();
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                let key = if a < b { (a, b) } else { (b, a) };
                *pair_counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    for ((a, b), count) in pair_counts {
        projected.connect(a, b, count);
    }
    projected
}
