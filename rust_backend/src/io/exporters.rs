//! Artifact writers.
//!
//! Every writer creates missing parent directories and produces
//! byte-identical output for identical inputs.

use csv::WriterBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::algorithms::distributions::CategoryCounts;
use crate::algorithms::metrics::MetricsSummary;
use crate::core::error::{PipelineError, PipelineResult};
use crate::logging::RunLog;
use crate::network::graph::{BipartiteGraph, ProjectedGraph};
use crate::preprocessing::validator::ValidationReport;
use crate::transformations::cleaning::CleaningLog;

fn ensure_parent(path: &Path) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_csv<I, R>(path: &Path, header: &[&str], rows: I) -> PipelineResult<()>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    ensure_parent(path)?;
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the cleaning steps as CSV and the Markdown report.
pub fn export_cleaning_log(log: &CleaningLog, path_csv: &Path, path_markdown: &Path) -> PipelineResult<()> {
    ensure_parent(path_csv)?;
    fs::write(path_csv, log.to_csv_string()?)?;
    ensure_parent(path_markdown)?;
    fs::write(path_markdown, log.to_markdown())?;
    Ok(())
}

/// Writes `metric,value` rows.
pub fn export_metrics_summary(summary: &MetricsSummary, path_csv: &Path) -> PipelineResult<()> {
    write_csv(
        path_csv,
        &["metric", "value"],
        summary.rows().into_iter().map(|(k, v)| [k, v]),
    )
}

/// Writes the bipartite edge list (`person,service_task`) and the weighted
/// projection (`person_a,person_b,weight`).
pub fn export_network_data(
    bipartite: &BipartiteGraph,
    projected: &ProjectedGraph,
    path_bipartite: &Path,
    path_projection: &Path,
) -> PipelineResult<()> {
    write_csv(
        path_bipartite,
        &["person", "service_task"],
        bipartite.edge_rows().into_iter().map(|(p, t)| [p, t]),
    )?;
    write_csv(
        path_projection,
        &["person_a", "person_b", "weight"],
        projected
            .edge_rows()
            .into_iter()
            .map(|(a, b, w)| [a, b, w.to_string()]),
    )
}

/// Writes a histogram as `<key>,<count>` rows in key order.
pub fn export_histogram<K: ToString>(
    histogram: &BTreeMap<K, usize>,
    header: [&str; 2],
    path_csv: &Path,
) -> PipelineResult<()> {
    write_csv(
        path_csv,
        &header,
        histogram.iter().map(|(k, n)| [k.to_string(), n.to_string()]),
    )
}

/// Writes `column,year,value,rows` for every counted column.
pub fn export_category_counts(
    counts: &BTreeMap<String, CategoryCounts>,
    path_csv: &Path,
) -> PipelineResult<()> {
    let rows = counts.iter().flat_map(|(column, by_year)| {
        by_year.counts.iter().flat_map(move |(year, values)| {
            values.iter().map(move |(value, n)| {
                [column.clone(), year.to_string(), value.clone(), n.to_string()]
            })
        })
    });
    write_csv(path_csv, &["column", "year", "value", "rows"], rows)
}

/// Writes pre- and post-cleaning reports side by side.
pub fn export_validation_reports(
    pre: &ValidationReport,
    post: &ValidationReport,
    path_json: &Path,
) -> PipelineResult<()> {
    #[derive(Serialize)]
    struct Reports<'a> {
        pre_cleaning: &'a ValidationReport,
        post_cleaning: &'a ValidationReport,
    }

    ensure_parent(path_json)?;
    let json = serde_json::to_string_pretty(&Reports {
        pre_cleaning: pre,
        post_cleaning: post,
    })?;
    fs::write(path_json, json)?;
    Ok(())
}

/// Writes the run log as text, one record per line.
pub fn export_run_log(log: &RunLog, path: &Path) -> PipelineResult<()> {
    ensure_parent(path)?;
    fs::write(path, log.to_text()).map_err(|e| {
        PipelineError::IoError(format!("Failed to write run log {}: {}", path.display(), e))
    })
}
