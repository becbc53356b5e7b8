//! Person / service-task network construction.
//!
//! - [`graph`]: [`BipartiteGraph`], [`ProjectedGraph`] and the [`NetworkView`] trait
//! - [`builder`]: edge extraction, graph construction and client-client projection

pub mod builder;
pub mod graph;

pub use builder::{create_bipartite_edges, create_bipartite_graph, project_client_client};
pub use graph::{BipartiteEdge, BipartiteGraph, NetworkNode, NetworkView, ProjectedGraph};
