//! Structural metrics over the bipartite graph and its projection.
//!
//! Degenerate inputs never produce NaN: a metric whose denominator is zero
//! is reported as [`Measure::Undefined`], and a metric that has no meaning
//! for a graph kind as [`Measure::NotApplicable`].

use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::algorithms::distributions::compute_stats;
use crate::logging::LogSink;
use crate::network::graph::{BipartiteGraph, NetworkView, ProjectedGraph};

const COMPONENT: &str = "metrics";

/// A numeric metric that may be undefined for the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Measure {
    Value(f64),
    Undefined,
    NotApplicable,
}

impl Measure {
    /// `Value(numerator / denominator)`, or `Undefined` for a zero denominator.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Measure::Undefined
        } else {
            Measure::Value(numerator / denominator)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Measure::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Measure::Value(_))
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Value(v) => write!(f, "{}", v),
            Measure::Undefined => f.write_str("undefined"),
            Measure::NotApplicable => f.write_str("not_applicable"),
        }
    }
}

impl From<Option<f64>> for Measure {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Measure::Undefined, Measure::Value)
    }
}

/// Size, density, degree, connectivity and clustering of one graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: Measure,
    pub degree_mean: Measure,
    pub degree_min: Measure,
    pub degree_max: Measure,
    pub isolated_count: usize,
    pub isolated_fraction: Measure,
    pub component_count: usize,
    pub lcc_size: usize,
    pub lcc_fraction: Measure,
    pub clustering_global: Measure,
}

impl BasicMetrics {
    /// `(metric, value)` pairs in export order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("node_count", self.node_count.to_string()),
            ("edge_count", self.edge_count.to_string()),
            ("density", self.density.to_string()),
            ("degree_mean", self.degree_mean.to_string()),
            ("degree_min", self.degree_min.to_string()),
            ("degree_max", self.degree_max.to_string()),
            ("isolated_count", self.isolated_count.to_string()),
            ("isolated_fraction", self.isolated_fraction.to_string()),
            ("component_count", self.component_count.to_string()),
            ("lcc_size", self.lcc_size.to_string()),
            ("lcc_fraction", self.lcc_fraction.to_string()),
            ("clustering_global", self.clustering_global.to_string()),
        ]
    }
}

/// Strength and weight statistics of the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedMetrics {
    pub strength_mean: Measure,
    pub strength_min: Measure,
    pub strength_max: Measure,
    pub strength_std: Measure,
    pub total_weight: u64,
    pub mean_edge_weight: Measure,
}

impl WeightedMetrics {
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("strength_mean", self.strength_mean.to_string()),
            ("strength_min", self.strength_min.to_string()),
            ("strength_max", self.strength_max.to_string()),
            ("strength_std", self.strength_std.to_string()),
            ("total_weight", self.total_weight.to_string()),
            ("mean_edge_weight", self.mean_edge_weight.to_string()),
        ]
    }
}

/// Metrics of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub bipartite: BasicMetrics,
    pub projection: BasicMetrics,
    pub weighted: WeightedMetrics,
}

impl MetricsSummary {
    /// Flattened `(metric, value)` rows with `bipartite.`, `projection.` and
    /// `weighted.` prefixes, in a fixed order.
    pub fn rows(&self) -> Vec<(String, String)> {
        let sections = [
            ("bipartite", self.bipartite.rows()),
            ("projection", self.projection.rows()),
            ("weighted", self.weighted.rows()),
        ];
        sections
            .into_iter()
            .flat_map(|(prefix, rows)| {
                rows.into_iter()
                    .map(move |(key, value)| (format!("{}.{}", prefix, key), value))
            })
            .collect()
    }

    /// Rows keyed by metric name.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.rows().into_iter().collect()
    }
}

/// Sizes of the connected components, via union-find over the edges.
fn component_sizes<G: NetworkView>(graph: &G) -> Vec<usize> {
    let topology = graph.topology();
    let mut sets = UnionFind::<usize>::new(topology.node_count());
    for edge in topology.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }

    let mut sizes: BTreeMap<usize, usize> = BTreeMap::new();
    for label in sets.into_labeling() {
        *sizes.entry(label).or_insert(0) += 1;
    }
    sizes.into_values().collect()
}

/// Global clustering coefficient: closed triples over connected triples.
fn transitivity<G: NetworkView>(graph: &G) -> Measure {
    let topology = graph.topology();
    if topology.node_count() == 0 {
        return Measure::Undefined;
    }

    let adjacency: Vec<Vec<usize>> = topology
        .node_indices()
        .map(|n| {
            let mut neighbors: Vec<usize> = topology
                .neighbors(n)
                .map(|m| m.index())
                .filter(|&m| m != n.index())
                .collect();
            neighbors.sort_unstable();
            neighbors.dedup();
            neighbors
        })
        .collect();
    let edges: HashSet<(usize, usize)> = adjacency
        .iter()
        .enumerate()
        .flat_map(|(u, ns)| ns.iter().map(move |&v| (u, v)))
        .collect();

    let mut triples: u64 = 0;
    let mut closed: u64 = 0;
    for neighbors in &adjacency {
        let k = neighbors.len() as u64;
        triples += k * k.saturating_sub(1) / 2;
        for (i, &v) in neighbors.iter().enumerate() {
            for &w in &neighbors[i + 1..] {
                if edges.contains(&(v, w)) {
                    closed += 1;
                }
            }
        }
    }

    if triples == 0 {
        Measure::Value(0.0)
    } else {
        Measure::Value(closed as f64 / triples as f64)
    }
}

/// Size, density, degree, connectivity and clustering of `graph`.
///
/// Density uses the graph's own possible-edge count (persons x tasks for the
/// bipartite graph, n(n-1)/2 for the projection). Clustering is computed
/// only where [`NetworkView::supports_clustering`] holds.
pub fn compute_basic_metrics<G: NetworkView>(graph: &G) -> BasicMetrics {
    let node_count = graph.node_count();
    let edge_count = graph.edge_count();

    let degrees: Vec<f64> = graph.degrees().into_iter().map(|d| d as f64).collect();
    let degree_stats = compute_stats(&degrees);
    let isolated_count = degrees.iter().filter(|&&d| d == 0.0).count();

    let sizes = component_sizes(graph);
    let component_count = sizes.len();
    let lcc_size = sizes.iter().copied().max().unwrap_or(0);

    let clustering_global = if graph.supports_clustering() {
        transitivity(graph)
    } else {
        Measure::NotApplicable
    };

    BasicMetrics {
        node_count,
        edge_count,
        density: Measure::ratio(edge_count as f64, graph.possible_edges() as f64),
        degree_mean: degree_stats.map(|s| s.mean).into(),
        degree_min: degree_stats.map(|s| s.min).into(),
        degree_max: degree_stats.map(|s| s.max).into(),
        isolated_count,
        isolated_fraction: Measure::ratio(isolated_count as f64, node_count as f64),
        component_count,
        lcc_size,
        lcc_fraction: Measure::ratio(lcc_size as f64, node_count as f64),
        clustering_global,
    }
}

/// Strength statistics and edge-weight totals of the projection.
pub fn compute_weighted_metrics(projected: &ProjectedGraph) -> WeightedMetrics {
    let strengths: Vec<f64> = projected.strengths().into_iter().map(|s| s as f64).collect();
    let stats = compute_stats(&strengths);
    let weights = projected.weights();
    let total_weight: u64 = weights.iter().map(|&w| u64::from(w)).sum();

    WeightedMetrics {
        strength_mean: stats.map(|s| s.mean).into(),
        strength_min: stats.map(|s| s.min).into(),
        strength_max: stats.map(|s| s.max).into(),
        strength_std: stats.map(|s| s.std_dev).into(),
        total_weight,
        mean_edge_weight: Measure::ratio(total_weight as f64, weights.len() as f64),
    }
}

/// Computes every metric of a run and logs the headline numbers.
pub fn compute_metrics_summary(
    bipartite: &BipartiteGraph,
    projected: &ProjectedGraph,
    sink: &mut dyn LogSink,
) -> MetricsSummary {
    let summary = MetricsSummary {
        bipartite: compute_basic_metrics(bipartite),
        projection: compute_basic_metrics(projected),
        weighted: compute_weighted_metrics(projected),
    };

    for (name, metrics) in [("bipartite", &summary.bipartite), ("projection", &summary.projection)] {
        sink.info(
            COMPONENT,
            format!(
                "{}: N={}, E={}, density={}, components={}, lcc={}",
                name,
                metrics.node_count,
                metrics.edge_count,
                metrics.density,
                metrics.component_count,
                metrics.lcc_size
            ),
        );
    }
    sink.info(
        COMPONENT,
        format!(
            "weighted: mean strength={}, total weight={}",
            summary.weighted.strength_mean, summary.weighted.total_weight
        ),
    );

    summary
}
