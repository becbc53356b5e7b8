use csv::WriterBuilder;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::config::{NullPolicy, PipelineConfig};
use crate::core::domain::{Dataset, DatasetStats};
use crate::core::error::{PipelineError, PipelineResult};
use crate::logging::{log_section, LogSink};
use crate::transformations::filtering::filter_by_domain;
use crate::transformations::normalization::{canonicalize_integer_columns, normalize_columns};

const COMPONENT: &str = "cleaning";

pub const STEP_NORMALIZE: &str = "normalize_text";
pub const STEP_FILTER_DOMAINS: &str = "filter_domains";
pub const STEP_REMOVE_DUPLICATES: &str = "remove_duplicates";
pub const STEP_MISSING_VALUES: &str = "handle_missing_values";

/// One cleaning operation with its before/after row counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStep {
    pub name: String,
    pub rows_before: usize,
    pub rows_after: usize,
    /// Rows removed plus values changed by the step.
    pub affected: usize,
    pub detail: String,
}

impl CleaningStep {
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Audit trail of one cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningLog {
    steps: Vec<CleaningStep>,
    before: DatasetStats,
    after: DatasetStats,
}

impl CleaningLog {
    /// Starts an empty log for a dataset with the given statistics.
    pub fn new(before: DatasetStats) -> Self {
        Self {
            steps: Vec::new(),
            before,
            after: before,
        }
    }

    pub fn record_step(
        &mut self,
        name: &str,
        rows_before: usize,
        rows_after: usize,
        affected: usize,
        detail: String,
    ) {
        self.steps.push(CleaningStep {
            name: name.to_string(),
            rows_before,
            rows_after,
            affected,
            detail,
        });
    }

    /// Closes the log with the statistics of the cleaned dataset.
    pub fn finish(&mut self, after: DatasetStats) {
        self.after = after;
    }

    pub fn steps(&self) -> &[CleaningStep] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&CleaningStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn before(&self) -> &DatasetStats {
        &self.before
    }

    pub fn after(&self) -> &DatasetStats {
        &self.after
    }

    pub fn rows_removed(&self) -> usize {
        self.before.rows.saturating_sub(self.after.rows)
    }

    /// `step_name,rows_before,rows_after,detail`, one line per step.
    pub fn to_csv_string(&self) -> PipelineResult<String> {
        let mut wtr = WriterBuilder::new().from_writer(Vec::new());
        wtr.write_record(["step_name", "rows_before", "rows_after", "detail"])?;
        for step in &self.steps {
            wtr.write_record([
                step.name.clone(),
                step.rows_before.to_string(),
                step.rows_after.to_string(),
                step.detail.clone(),
            ])?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| PipelineError::IoError(format!("Failed to flush CSV buffer: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| PipelineError::ParseError(format!("CSV output is not UTF-8: {}", e)))
    }

    /// Human-readable report: before stats, numbered operations, after stats.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Cleaning log\n");
        write_stats(&mut out, "Before", &self.before);

        let _ = writeln!(out, "## Operations\n");
        for (i, step) in self.steps.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. **{}**: {} -> {} rows ({})",
                i + 1,
                step.name,
                step.rows_before,
                step.rows_after,
                step.detail
            );
        }
        out.push('\n');

        write_stats(&mut out, "After", &self.after);
        let _ = writeln!(out, "**Rows removed:** {}", self.rows_removed());
        out
    }
}

fn write_stats(out: &mut String, title: &str, stats: &DatasetStats) {
    let _ = writeln!(out, "## {}\n", title);
    let _ = writeln!(out, "- Rows: {}", stats.rows);
    let _ = writeln!(out, "- Columns: {}", stats.columns);
    let _ = writeln!(out, "- Duplicate rows: {}", stats.duplicate_rows);
    let _ = writeln!(out, "- Null cells: {}\n", stats.null_cells);
}

/// Outcome of [`remove_duplicates`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    pub removed: usize,
    /// Key columns absent from the dataset, left out of the key.
    pub missing_keys: Vec<String>,
}

/// Removes rows that repeat an earlier key tuple, keeping the first
/// occurrence in row order.
///
/// # Errors
///
/// [`PipelineError::MissingColumn`] when none of the key columns exists.
pub fn remove_duplicates(dataset: &mut Dataset, key_columns: &[String]) -> PipelineResult<DedupOutcome> {
    let mut outcome = DedupOutcome::default();
    let mut present = Vec::with_capacity(key_columns.len());
    for column in key_columns {
        if dataset.has_column(column) {
            present.push(column.clone());
        } else {
            outcome.missing_keys.push(column.clone());
        }
    }
    if present.is_empty() {
        return Err(PipelineError::MissingColumn(key_columns.join(", ")));
    }

    outcome.removed = dataset.unique_first(&present)?;
    Ok(outcome)
}

/// Outcome of [`handle_missing_values`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissingValuesOutcome {
    pub filled: usize,
    pub removed: usize,
}

/// Resolves nulls in the expected columns according to `config.null_policy`.
///
/// With [`NullPolicy::Fill`], nulls in non-key columns that have a configured
/// fill value are filled first; rows that still hold a null are dropped.
pub fn handle_missing_values(
    dataset: &mut Dataset,
    config: &PipelineConfig,
) -> PipelineResult<MissingValuesOutcome> {
    let mut outcome = MissingValuesOutcome::default();

    if config.null_policy == NullPolicy::Fill {
        for (column, value) in config.resolved_fill_values() {
            let Some(values) = dataset.text(&column) else {
                continue;
            };
            let nulls = values.null_count();
            if nulls == 0 {
                continue;
            }
            let filled: StringChunked = values
                .into_iter()
                .map(|v| Some(v.unwrap_or(value.as_str())))
                .collect();
            dataset.replace_text(&column, filled)?;
            outcome.filled += nulls;
        }
    }

    let mut mask: Option<BooleanChunked> = None;
    for column in &config.expected_columns {
        let Some(values) = dataset.text(column) else {
            continue;
        };
        let present = values.is_not_null();
        mask = Some(match mask {
            Some(mask) => &mask & &present,
            None => present,
        });
    }
    if let Some(mask) = mask {
        outcome.removed = dataset.filter(&mask)?;
    }
    Ok(outcome)
}

/// Runs the cleaning stages in fixed order: text normalization, domain
/// filtering, deduplication and null handling.
///
/// Each stage appends exactly one [`CleaningStep`]. Running the pipeline on
/// its own output removes and modifies nothing.
///
/// # Arguments
/// * `dataset` - Raw dataset, consumed and cleaned in place
/// * `config` - Checked pipeline configuration
/// * `sink` - Destination of the stage log records
///
/// # Returns
/// The cleaned dataset with its [`CleaningLog`].
pub fn clean_data_pipeline(
    mut dataset: Dataset,
    config: &PipelineConfig,
    sink: &mut dyn LogSink,
) -> PipelineResult<(Dataset, CleaningLog)> {
    log_section(sink, COMPONENT, "CLEANING");
    let mut log = CleaningLog::new(dataset.stats()?);
    sink.info(
        COMPONENT,
        format!(
            "Starting with {} rows x {} columns",
            dataset.height(),
            dataset.width()
        ),
    );

    // 1. Text normalization
    let rows = dataset.height();
    let text = normalize_columns(&mut dataset, &config.text_columns())?;
    for column in &text.skipped_columns {
        sink.warning(
            COMPONENT,
            format!("Text column {} not found, skipped", column),
        );
    }
    let modified =
        text.modified_cells + canonicalize_integer_columns(&mut dataset, &config.integer_columns)?;
    let detail = format!("{} values modified", modified);
    sink.info(COMPONENT, format!("Normalization: {}", detail));
    log.record_step(STEP_NORMALIZE, rows, dataset.height(), modified, detail);

    // 2. Domain filtering
    let rows = dataset.height();
    let null_passthrough: BTreeSet<String> = match config.null_policy {
        NullPolicy::Fill => config.resolved_fill_values().into_keys().collect(),
        NullPolicy::Drop => BTreeSet::new(),
    };
    let domain = filter_by_domain(&mut dataset, &config.domains, &null_passthrough)?;
    for column in &domain.skipped_columns {
        sink.warning(
            COMPONENT,
            format!("Domain column {} not found, skipped", column),
        );
    }
    for (column, values) in &domain.offending_values {
        let listed: Vec<String> = values
            .iter()
            .map(|(value, count)| format!("{} ({})", value, count))
            .collect();
        sink.warning(
            COMPONENT,
            format!("Column {}: removed out-of-domain values {}", column, listed.join(", ")),
        );
    }
    let detail = format!("{} removed", domain.removed);
    sink.info(COMPONENT, format!("Domain filtering: {}", detail));
    log.record_step(STEP_FILTER_DOMAINS, rows, dataset.height(), domain.removed, detail);

    // 3. Deduplication
    let rows = dataset.height();
    let dedup = remove_duplicates(&mut dataset, &config.key_columns).map_err(|e| {
        sink.error(COMPONENT, e.to_string());
        e
    })?;
    if !dedup.missing_keys.is_empty() {
        sink.warning(
            COMPONENT,
            format!(
                "Key columns not found, left out of the key: {}",
                dedup.missing_keys.join(", ")
            ),
        );
    }
    let detail = format!("{} removed", dedup.removed);
    sink.info(COMPONENT, format!("Deduplication: {}", detail));
    log.record_step(STEP_REMOVE_DUPLICATES, rows, dataset.height(), dedup.removed, detail);

    // 4. Null handling
    let rows = dataset.height();
    let missing = handle_missing_values(&mut dataset, config)?;
    let detail = match config.null_policy {
        NullPolicy::Drop => format!("{} removed", missing.removed),
        NullPolicy::Fill => format!("{} filled, {} removed", missing.filled, missing.removed),
    };
    sink.info(COMPONENT, format!("Missing values: {}", detail));
    log.record_step(
        STEP_MISSING_VALUES,
        rows,
        dataset.height(),
        missing.filled + missing.removed,
        detail,
    );

    log.finish(dataset.stats()?);
    sink.info(
        COMPONENT,
        format!(
            "Finished with {} rows ({} removed)",
            dataset.height(),
            log.rows_removed()
        ),
    );

    Ok((dataset, log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::Cell;
    use crate::logging::{LogLevel, RunLog};

    fn row(values: [&str; 6]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    fn events(rows: Vec<[&str; 6]>) -> Dataset {
        let columns = crate::core::domain::STANDARD_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        Dataset::from_rows(columns, rows.into_iter().map(row).collect()).unwrap()
    }

    #[test]
    fn test_remove_duplicates_keeps_first_occurrence() {
        let mut ds = Dataset::from_rows(
            vec!["K".to_string(), "V".to_string()],
            vec![
                vec![Some("a".to_string()), Some("1".to_string())],
                vec![Some("b".to_string()), Some("2".to_string())],
                vec![Some("a".to_string()), Some("3".to_string())],
                vec![None, Some("4".to_string())],
                vec![None, Some("5".to_string())],
            ],
        )
        .unwrap();

        let outcome = remove_duplicates(&mut ds, &["K".to_string()]).unwrap();

        assert_eq!(outcome.removed, 2);
        let kept: Vec<&str> = (0..ds.height()).filter_map(|r| ds.cell(r, "V")).collect();
        assert_eq!(kept, vec!["1", "2", "4"]);
    }

    #[test]
    fn test_remove_duplicates_without_any_key_column() {
        let mut ds = Dataset::new(vec!["V".to_string()]).unwrap();
        let err = remove_duplicates(&mut ds, &["K".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(_)));
    }

    #[test]
    fn test_handle_missing_values_drop() {
        let mut ds = events(vec![
            ["ANA", "ASESORIA", "REVISION", "2021", "VIRTUAL", "BAJA"],
            ["LUIS", "ASESORIA", "REVISION", "2021", "VIRTUAL", ""],
        ]);
        let outcome = handle_missing_values(&mut ds, &PipelineConfig::default()).unwrap();
        assert_eq!(outcome, MissingValuesOutcome { filled: 0, removed: 1 });
        assert_eq!(ds.height(), 1);
    }

    #[test]
    fn test_handle_missing_values_fill_skips_key_columns() {
        let mut ds = events(vec![
            ["ANA", "ASESORIA", "REVISION", "2021", "VIRTUAL", ""],
            ["LUIS", "ASESORIA", "REVISION", "2021", "", "ALTA"],
        ]);
        let mut config = PipelineConfig::default();
        config.null_policy = NullPolicy::Fill;
        config.fill_values.insert("COMPLEJIDAD".to_string(), "media".to_string());
        config.fill_values.insert("MODALIDAD".to_string(), "VIRTUAL".to_string());

        let outcome = handle_missing_values(&mut ds, &config).unwrap();

        assert_eq!(outcome, MissingValuesOutcome { filled: 1, removed: 1 });
        assert_eq!(ds.cell(0, "COMPLEJIDAD"), Some("MEDIA"));
    }

    #[test]
    fn test_fill_policy_fills_nulls_in_domain_columns() {
        let ds = events(vec![
            ["ANA", "ASESORIA", "REVISION", "2021", "VIRTUAL", "BAJA"],
            ["LUIS", "ASESORIA", "REVISION", "2021", "PRESENCIAL", ""],
            ["EVA", "ASESORIA", "REVISION", "2021", "", "ALTA"],
        ]);
        let mut config =
            PipelineConfig::from_toml_str(include_str!("../../config/pipeline.toml")).unwrap();
        config.null_policy = NullPolicy::Fill;
        let mut sink = RunLog::silent();

        let (cleaned, log) = clean_data_pipeline(ds, &config, &mut sink).unwrap();

        assert_eq!(log.step(STEP_FILTER_DOMAINS).unwrap().detail, "1 removed");
        assert_eq!(log.step(STEP_MISSING_VALUES).unwrap().detail, "1 filled, 0 removed");
        assert_eq!(cleaned.height(), 2);
        assert_eq!(cleaned.cell(1, "COMPLEJIDAD"), Some("MEDIA"));
    }

    #[test]
    fn test_pipeline_steps_and_details() {
        let ds = events(vec![
            ["ana", "Asesoría", "Revisión", "2021", "virtual", "baja"],
            ["ANA", "ASESORIA", "REVISION", "2021", "VIRTUAL", "ALTA"],
            ["LUIS", "TRAMITE", "REGISTRO", "2022.0", "HIBRIDA", "ALTA"],
            ["EVA", "TRAMITE", "REGISTRO", "2022", "PRESENCIAL", "MEDIA"],
            ["", "TRAMITE", "REGISTRO", "2022", "PRESENCIAL", "MEDIA"],
        ]);
        let mut sink = RunLog::silent();

        let (cleaned, log) = clean_data_pipeline(ds, &PipelineConfig::default(), &mut sink).unwrap();

        let names: Vec<&str> = log.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![STEP_NORMALIZE, STEP_FILTER_DOMAINS, STEP_REMOVE_DUPLICATES, STEP_MISSING_VALUES]
        );
        assert_eq!(log.step(STEP_NORMALIZE).unwrap().detail, "6 values modified");
        assert_eq!(log.step(STEP_FILTER_DOMAINS).unwrap().detail, "1 removed");
        assert_eq!(log.step(STEP_REMOVE_DUPLICATES).unwrap().detail, "1 removed");
        assert_eq!(log.step(STEP_MISSING_VALUES).unwrap().detail, "1 removed");
        assert_eq!(cleaned.height(), 2);
        assert_eq!(log.before().rows, 5);
        assert_eq!(log.after().rows, 2);
        assert_eq!(log.rows_removed(), 3);
        assert_eq!(sink.count(LogLevel::Warning), 1);
    }

    #[test]
    fn test_pipeline_is_idempotent() {
        let ds = events(vec![
            ["ana ", "Asesoría", "Revisión", "2021", "virtual", "baja"],
            ["ANA", "ASESORIA", "REVISION", "2021", "VIRTUAL", "BAJA"],
            ["LUIS", "TRAMITE", "", "2022", "PRESENCIAL", "ALTA"],
        ]);
        let config = PipelineConfig::default();
        let mut sink = RunLog::silent();

        let (once, _) = clean_data_pipeline(ds, &config, &mut sink).unwrap();
        let (twice, log) = clean_data_pipeline(once.clone(), &config, &mut sink).unwrap();

        assert_eq!(once, twice);
        assert!(log.steps().iter().all(|s| s.affected == 0));
    }

    #[test]
    fn test_cleaning_log_exports() {
        let mut log = CleaningLog::new(DatasetStats {
            rows: 10,
            columns: 6,
            duplicate_rows: 2,
            null_cells: 0,
        });
        log.record_step(STEP_REMOVE_DUPLICATES, 10, 8, 2, "2 removed".to_string());
        log.finish(DatasetStats {
            rows: 8,
            columns: 6,
            duplicate_rows: 0,
            null_cells: 0,
        });

        let csv = log.to_csv_string().unwrap();
        assert_eq!(
            csv,
            "step_name,rows_before,rows_after,detail\nremove_duplicates,10,8,2 removed\n"
        );

        let md = log.to_markdown();
        assert!(md.contains("## Before"));
        assert!(md.contains("1. **remove_duplicates**: 10 -> 8 rows (2 removed)"));
        assert!(md.contains("**Rows removed:** 2"));
    }
}
