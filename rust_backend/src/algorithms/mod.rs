//! Network metrics and descriptive summaries.
//!
//! # Components
//!
//! - [`metrics`]: Size, density, degree, connectivity, clustering and strength metrics
//! - [`distributions`]: Summary statistics, degree / strength histograms and per-year counts
//!
//! # Example
//!
//! ```
//! use service_network::algorithms::{compute_basic_metrics, Measure};
//! use service_network::network::{create_bipartite_graph, project_client_client, BipartiteEdge};
//!
//! let edges = vec![BipartiteEdge::new("A", "X"), BipartiteEdge::new("B", "X")];
//! let bipartite = create_bipartite_graph(&edges);
//! let projected = project_client_client(&bipartite);
//!
//! let metrics = compute_basic_metrics(&projected);
//! assert_eq!(metrics.density, Measure::Value(1.0));
//! ```

pub mod distributions;
pub mod metrics;

pub use distributions::{
    category_counts_by_year, compute_distribution_summary, compute_stats, degree_histogram,
    strength_histogram, CategoryCounts, DistributionStats, DistributionSummary,
};
pub use metrics::{
    compute_basic_metrics, compute_metrics_summary, compute_weighted_metrics, BasicMetrics,
    Measure, MetricsSummary, WeightedMetrics,
};
