use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::SummarySettings;
use crate::core::domain::{parse_integer, Dataset};
use crate::core::error::PipelineResult;
use crate::logging::LogSink;
use crate::network::graph::{BipartiteGraph, NetworkView, ProjectedGraph};

const COMPONENT: &str = "distributions";

/// Summary statistics over a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

/// Compute mean, median, std dev, min, max and sum.
/// Returns `None` for an empty input.
pub fn compute_stats(values: &[f64]) -> Option<DistributionStats> {
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / count as f64;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    };

    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / count as f64;

    Some(DistributionStats {
        count,
        mean,
        median,
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[count - 1],
        sum,
    })
}

/// degree -> number of nodes with that degree
pub fn degree_histogram<G: NetworkView>(graph: &G) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for degree in graph.degrees() {
        *histogram.entry(degree).or_insert(0) += 1;
    }
    histogram
}

/// strength -> number of persons with that strength
pub fn strength_histogram(projected: &ProjectedGraph) -> BTreeMap<u64, usize> {
    let mut histogram = BTreeMap::new();
    for strength in projected.strengths() {
        *histogram.entry(strength).or_insert(0) += 1;
    }
    histogram
}

/// Crosstab of a categorical column per year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    /// year -> value -> rows
    pub counts: BTreeMap<i64, BTreeMap<String, usize>>,
    /// Rows left out for a null value or a null / non-integer year.
    pub skipped_rows: usize,
}

impl CategoryCounts {
    pub fn total(&self) -> usize {
        self.counts.values().flat_map(|m| m.values()).sum()
    }

    /// Every value seen in any year, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut all: Vec<&str> = self
            .counts
            .values()
            .flat_map(|m| m.keys().map(String::as_str))
            .collect();
        all.sort_unstable();
        all.dedup();
        all
    }
}

/// Counts rows per (year, value) for `column`.
pub fn category_counts_by_year(
    dataset: &Dataset,
    column: &str,
    year_column: &str,
) -> PipelineResult<CategoryCounts> {
    let values = dataset.require_text(column)?;
    let years = dataset.require_text(year_column)?;

    let mut result = CategoryCounts::default();
    for (year, value) in years.into_iter().zip(values) {
        match (year.and_then(parse_integer), value) {
            (Some(year), Some(value)) => {
                *result
                    .counts
                    .entry(year)
                    .or_default()
                    .entry(value.to_string())
                    .or_insert(0) += 1;
            }
            _ => result.skipped_rows += 1,
        }
    }
    Ok(result)
}

/// Plot-ready summaries of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub degree_bipartite: BTreeMap<usize, usize>,
    pub degree_projection: BTreeMap<usize, usize>,
    pub strength_projection: BTreeMap<u64, usize>,
    /// column -> per-year counts
    pub category_counts: BTreeMap<String, CategoryCounts>,
}

/// Histograms of both graphs plus per-year counts of every configured
/// category column. Category columns missing from `dataset` (or a missing
/// year column) are skipped with a warning.
pub fn compute_distribution_summary(
    dataset: &Dataset,
    bipartite: &BipartiteGraph,
    projected: &ProjectedGraph,
    settings: &SummarySettings,
    sink: &mut dyn LogSink,
) -> PipelineResult<DistributionSummary> {
    let mut summary = DistributionSummary {
        degree_bipartite: degree_histogram(bipartite),
        degree_projection: degree_histogram(projected),
        strength_projection: strength_histogram(projected),
        category_counts: BTreeMap::new(),
    };

    for column in &settings.category_columns {
        if !dataset.has_column(column) || !dataset.has_column(&settings.year_column) {
            sink.warning(
                COMPONENT,
                format!(
                    "Skipping per-year counts of {}: column or {} missing",
                    column, settings.year_column
                ),
            );
            continue;
        }
        let counts = category_counts_by_year(dataset, column, &settings.year_column)?;
        sink.info(
            COMPONENT,
            format!(
                "{} per {}: {} rows over {} years ({} skipped)",
                column,
                settings.year_column,
                counts.total(),
                counts.counts.len(),
                counts.skipped_rows
            ),
        );
        summary.category_counts.insert(column.clone(), counts);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::builder::{create_bipartite_graph, project_client_client};
    use crate::logging::{LogLevel, RunLog};
    use crate::network::graph::BipartiteEdge;

    #[test]
    fn test_compute_stats() {
        let stats = compute_stats(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.sum, 15.0);
        assert!((stats.std_dev - std::f64::consts::SQRT_2).abs() < 0.001);
    }

    #[test]
    fn test_compute_stats_empty() {
        assert!(compute_stats(&[]).is_none());
    }

    #[test]
    fn test_histograms() {
        let edges: Vec<BipartiteEdge> = [("A", "X"), ("A", "Y"), ("B", "X"), ("B", "Y"), ("C", "X")]
            .iter()
            .map(|(p, t)| BipartiteEdge::new(*p, *t))
            .collect();
        let bipartite = create_bipartite_graph(&edges);
        let projected = project_client_client(&bipartite);

        let degrees = degree_histogram(&bipartite);
        assert_eq!(degrees.get(&1), Some(&1));
        assert_eq!(degrees.get(&2), Some(&3));
        assert_eq!(degrees.get(&3), Some(&1));

        let strengths = strength_histogram(&projected);
        assert_eq!(strengths.get(&3), Some(&2));
        assert_eq!(strengths.get(&2), Some(&1));
    }

    #[test]
    fn test_category_counts_by_year() {
        let ds = Dataset::from_rows(
            vec!["AÑO".to_string(), "MODALIDAD".to_string()],
            vec![
                vec![Some("2021".to_string()), Some("VIRTUAL".to_string())],
                vec![Some("2021".to_string()), Some("VIRTUAL".to_string())],
                vec![Some("2022".to_string()), Some("PRESENCIAL".to_string())],
                vec![Some("n/a".to_string()), Some("VIRTUAL".to_string())],
                vec![Some("2022".to_string()), None],
            ],
        )
        .unwrap();

        let counts = category_counts_by_year(&ds, "MODALIDAD", "AÑO").unwrap();

        assert_eq!(counts.counts[&2021]["VIRTUAL"], 2);
        assert_eq!(counts.counts[&2022]["PRESENCIAL"], 1);
        assert_eq!(counts.skipped_rows, 2);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.categories(), vec!["PRESENCIAL", "VIRTUAL"]);
    }

    #[test]
    fn test_distribution_summary_skips_missing_category_columns() {
        let edges = vec![BipartiteEdge::new("A", "X"), BipartiteEdge::new("B", "X")];
        let bipartite = create_bipartite_graph(&edges);
        let projected = project_client_client(&bipartite);
        let ds = Dataset::from_rows(
            vec!["AÑO".to_string(), "MODALIDAD".to_string()],
            vec![
                vec![Some("2021".to_string()), Some("VIRTUAL".to_string())],
                vec![Some("2022".to_string()), Some("VIRTUAL".to_string())],
            ],
        )
        .unwrap();
        let mut log = RunLog::silent();

        let summary = compute_distribution_summary(
            &ds,
            &bipartite,
            &projected,
            &SummarySettings::default(),
            &mut log,
        )
        .unwrap();

        assert_eq!(summary.degree_bipartite.get(&1), Some(&2));
        assert_eq!(summary.degree_bipartite.get(&2), Some(&1));
        assert_eq!(summary.degree_projection.get(&1), Some(&2));
        assert_eq!(summary.strength_projection.get(&1), Some(&2));
        assert_eq!(summary.category_counts["MODALIDAD"].total(), 2);
        assert!(!summary.category_counts.contains_key("COMPLEJIDAD"));
        assert_eq!(log.count(LogLevel::Warning), 1);
    }
}
