use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::algorithms::distributions::{compute_distribution_summary, DistributionSummary};
use crate::algorithms::metrics::{compute_metrics_summary, MetricsSummary};
use crate::config::{PipelineConfig, SchemaPolicy};
use crate::core::domain::{Dataset, TabularRecord, STANDARD_COLUMNS};
use crate::core::error::{PipelineError, PipelineResult};
use crate::io::exporters;
use crate::io::loaders::{find_data_file, profile_dataset, DatasetLoader};
use crate::logging::{log_section, LogSink, RunLog};
use crate::network::builder::{create_bipartite_edges, create_bipartite_graph, project_client_client};
use crate::network::graph::{BipartiteEdge, BipartiteGraph, NetworkView, ProjectedGraph};
use crate::parsing::csv_parser::write_dataset_csv;
use crate::preprocessing::validator::{full_validation, FindingCategory, Severity, ValidationReport};
use crate::transformations::cleaning::{clean_data_pipeline, CleaningLog};

const COMPONENT: &str = "pipeline";

/// Everything one run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    pub pre_validation: ValidationReport,
    pub cleaned: Dataset,
    pub cleaning_log: CleaningLog,
    pub post_validation: ValidationReport,
    /// Typed rows of the cleaned data; empty when a standard column is absent.
    pub records: Vec<TabularRecord>,
    pub edges: Vec<BipartiteEdge>,
    pub bipartite: BipartiteGraph,
    pub projection: ProjectedGraph,
    pub metrics: MetricsSummary,
    pub distributions: DistributionSummary,
    /// SHA-256 of the input file, when the run started from one.
    pub input_checksum: Option<String>,
}

/// Validation, cleaning, network construction and metrics for one dataset.
pub struct EtlPipeline {
    config: PipelineConfig,
}

impl EtlPipeline {
    /// Create a pipeline, checking the configuration once.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on an in-memory dataset
    ///
    /// # Arguments
    /// * `dataset` - Raw event dataset
    /// * `sink` - Destination of the run log records
    ///
    /// # Returns
    /// PipelineOutput with reports, cleaned data, graphs and metrics
    ///
    /// # Errors
    /// [`PipelineError::SchemaViolation`] when required columns are missing
    /// and the schema policy is `abort`; [`PipelineError::InvalidRecord`] when
    /// a cleaned row does not fit the typed record; structural errors from
    /// the network stage. Each is logged at ERROR first.
    pub fn run(&self, dataset: Dataset, sink: &mut dyn LogSink) -> PipelineResult<PipelineOutput> {
        // Step 1: Validate raw data
        log_section(sink, COMPONENT, "VALIDATION (RAW DATA)");
        profile_dataset(&dataset)?.log_to(sink, COMPONENT);
        let pre_validation = full_validation(&dataset, &self.config, sink)?;
        self.check_schema(&pre_validation, sink)?;

        // Step 2: Clean
        let (cleaned, cleaning_log) = clean_data_pipeline(dataset, &self.config, sink)?;

        // Step 3: Validate cleaned data
        log_section(sink, COMPONENT, "VALIDATION (CLEANED DATA)");
        let post_validation = full_validation(&cleaned, &self.config, sink)?;
        let records = typed_records(&cleaned, sink)?;

        // Step 4: Build networks
        log_section(sink, COMPONENT, "NETWORK CONSTRUCTION");
        let edges = create_bipartite_edges(&cleaned, &self.config.network).map_err(|e| {
            sink.error(COMPONENT, e.to_string());
            e
        })?;
        let bipartite = create_bipartite_graph(&edges);
        sink.info(
            COMPONENT,
            format!(
                "Bipartite graph: {} nodes ({} persons, {} service-tasks), {} edges",
                bipartite.node_count(),
                bipartite.person_count(),
                bipartite.task_count(),
                bipartite.edge_count()
            ),
        );
        let projection = project_client_client(&bipartite);
        sink.info(
            COMPONENT,
            format!(
                "Client-client projection: {} nodes, {} edges",
                projection.node_count(),
                projection.edge_count()
            ),
        );

        // Step 5: Metrics
        log_section(sink, COMPONENT, "METRICS");
        let metrics = compute_metrics_summary(&bipartite, &projection, sink);

        // Step 6: Distributions
        log_section(sink, COMPONENT, "DISTRIBUTIONS");
        let distributions = compute_distribution_summary(
            &cleaned,
            &bipartite,
            &projection,
            &self.config.summary,
            sink,
        )
        .map_err(|e| {
            sink.error(COMPONENT, e.to_string());
            e
        })?;

        Ok(PipelineOutput {
            pre_validation,
            cleaned,
            cleaning_log,
            post_validation,
            records,
            edges,
            bipartite,
            projection,
            metrics,
            distributions,
            input_checksum: None,
        })
    }

    /// Load a CSV or JSON file, then run every stage.
    pub fn run_from_file(&self, path: &Path, sink: &mut dyn LogSink) -> Result<PipelineOutput> {
        let loaded = match DatasetLoader::load_from_file(path) {
            Ok(loaded) => loaded,
            Err(e) => {
                sink.error(COMPONENT, format!("Failed to load {}: {:#}", path.display(), e));
                return Err(e);
            }
        };
        sink.info(
            COMPONENT,
            format!(
                "Loaded {} ({} rows, sha256 {})",
                path.display(),
                loaded.num_rows,
                loaded.checksum
            ),
        );

        let mut output = self
            .run(loaded.dataset, sink)
            .with_context(|| format!("Pipeline failed for {}", path.display()))?;
        output.input_checksum = Some(loaded.checksum);
        Ok(output)
    }

    /// Write every artifact of `output` under `root`.
    ///
    /// Data artifacts go to the processed directory, reports to the reports
    /// directory. Returns the written paths in write order. A write failure
    /// is logged at ERROR and ends the export.
    pub fn export(
        &self,
        output: &PipelineOutput,
        root: &Path,
        sink: &mut dyn LogSink,
    ) -> PipelineResult<Vec<PathBuf>> {
        let written = self.write_artifacts(output, root).map_err(|e| {
            sink.error(COMPONENT, format!("Failed to write artifacts: {}", e));
            e
        })?;
        for path in &written {
            sink.info(COMPONENT, format!("Wrote {}", path.display()));
        }
        Ok(written)
    }

    fn write_artifacts(&self, output: &PipelineOutput, root: &Path) -> PipelineResult<Vec<PathBuf>> {
        let outputs = &self.config.outputs;
        let cleaned = self.config.processed_path(root, &outputs.cleaned_csv);
        let edges = self.config.processed_path(root, &outputs.edges_bipartite);
        let projection = self.config.processed_path(root, &outputs.projection_weighted);
        let log_csv = self.config.report_path(root, &outputs.cleaning_log_csv);
        let log_md = self.config.report_path(root, &outputs.cleaning_log_md);
        let metrics = self.config.report_path(root, &outputs.metrics_summary);
        let validation = self.config.report_path(root, &outputs.validation_json);
        let degree_bipartite = self.config.report_path(root, &outputs.degree_histogram_bipartite);
        let degree_projection = self.config.report_path(root, &outputs.degree_histogram_projection);
        let strength = self.config.report_path(root, &outputs.strength_histogram);
        let categories = self.config.report_path(root, &outputs.category_counts);
        let distributions = &output.distributions;

        write_dataset_csv(&output.cleaned, &cleaned)?;
        exporters::export_network_data(&output.bipartite, &output.projection, &edges, &projection)?;
        exporters::export_cleaning_log(&output.cleaning_log, &log_csv, &log_md)?;
        exporters::export_metrics_summary(&output.metrics, &metrics)?;
        exporters::export_validation_reports(
            &output.pre_validation,
            &output.post_validation,
            &validation,
        )?;
        exporters::export_histogram(
            &distributions.degree_bipartite,
            ["degree", "nodes"],
            &degree_bipartite,
        )?;
        exporters::export_histogram(
            &distributions.degree_projection,
            ["degree", "nodes"],
            &degree_projection,
        )?;
        exporters::export_histogram(
            &distributions.strength_projection,
            ["strength", "persons"],
            &strength,
        )?;
        exporters::export_category_counts(&distributions.category_counts, &categories)?;

        Ok(vec![
            cleaned,
            edges,
            projection,
            log_csv,
            log_md,
            metrics,
            validation,
            degree_bipartite,
            degree_projection,
            strength,
            categories,
        ])
    }

    /// Full batch run under `root`: locate the input (unless given), run
    /// every stage and export the artifacts.
    ///
    /// The run log is written to the reports directory whether the run
    /// succeeds or fails; every failure is logged at ERROR before that.
    pub fn execute(
        &self,
        root: &Path,
        input: Option<&Path>,
        run_log: &mut RunLog,
    ) -> Result<(PipelineOutput, Vec<PathBuf>)> {
        let result = self.execute_stages(root, input, run_log);
        let log_path = self.config.report_path(root, &self.config.outputs.etl_log);
        exporters::export_run_log(run_log, &log_path)?;
        result
    }

    fn execute_stages(
        &self,
        root: &Path,
        input: Option<&Path>,
        sink: &mut dyn LogSink,
    ) -> Result<(PipelineOutput, Vec<PathBuf>)> {
        let input = match input {
            Some(path) => path.to_path_buf(),
            None => {
                let raw_dir = root.join(&self.config.paths.data_raw);
                find_data_file(&raw_dir, None, sink).map_err(|e| {
                    sink.error(COMPONENT, format!("{:#}", e));
                    e
                })?
            }
        };
        let output = self.run_from_file(&input, sink)?;
        let written = self.export(&output, root, sink)?;
        Ok((output, written))
    }

    /// Applies the schema policy to the raw-data report.
    fn check_schema(&self, report: &ValidationReport, sink: &mut dyn LogSink) -> PipelineResult<()> {
        let missing: Vec<String> = report
            .by_category(FindingCategory::Schema)
            .filter(|f| f.severity == Severity::Error)
            .filter_map(|f| f.column.clone())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        match self.config.schema_policy {
            SchemaPolicy::Abort => {
                let err = PipelineError::SchemaViolation(missing);
                sink.error(COMPONENT, err.to_string());
                Err(err)
            }
            SchemaPolicy::Warn => {
                sink.warning(
                    COMPONENT,
                    format!("Continuing without required columns: {}", missing.join(", ")),
                );
                Ok(())
            }
        }
    }
}

/// Typed view of the cleaned rows when every standard column is present.
fn typed_records(cleaned: &Dataset, sink: &mut dyn LogSink) -> PipelineResult<Vec<TabularRecord>> {
    if !STANDARD_COLUMNS.iter().all(|c| cleaned.has_column(c)) {
        sink.warning(
            COMPONENT,
            "Standard columns incomplete; skipping typed records".to_string(),
        );
        return Ok(Vec::new());
    }
    let records = cleaned.records().map_err(|e| {
        sink.error(COMPONENT, e.to_string());
        e
    })?;
    sink.info(COMPONENT, format!("Typed records: {}", records.len()));
    Ok(records)
}

/// Runs the pipeline on `dataset` with the given configuration.
pub fn run_pipeline(
    dataset: Dataset,
    config: PipelineConfig,
    sink: &mut dyn LogSink,
) -> PipelineResult<PipelineOutput> {
    let pipeline = EtlPipeline::new(config).map_err(|e| {
        sink.error(COMPONENT, e.to_string());
        e
    })?;
    pipeline.run(dataset, sink)
}
