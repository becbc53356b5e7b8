use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::domain::{Cell, Dataset};
use crate::core::error::PipelineResult;
use crate::logging::LogSink;
use crate::parsing::csv_parser;

const COMPONENT: &str = "io";

/// Extensions recognised by [`find_data_file`], in preference order.
pub const DATA_EXTENSIONS: [&str; 2] = ["csv", "json"];

/// Represents the source type of event data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatasetSourceType {
    Csv,
    Json,
}

/// Result of loading an event dataset
#[derive(Debug)]
pub struct DatasetLoadResult {
    pub dataset: Dataset,
    pub source_type: DatasetSourceType,
    pub num_rows: usize,
    /// SHA-256 of the raw input, hex encoded.
    pub checksum: String,
}

impl DatasetLoadResult {
    pub fn new(dataset: Dataset, source_type: DatasetSourceType, checksum: String) -> Self {
        let num_rows = dataset.height();
        Self {
            dataset,
            source_type,
            num_rows,
            checksum,
        }
    }
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn checksum_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Unified interface for loading event data from CSV or JSON
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load event data from a file (auto-detects CSV or JSON)
    pub fn load_from_file(path: &Path) -> Result<DatasetLoadResult> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .context("File has no extension")?;

        match extension.to_lowercase().as_str() {
            "csv" => Self::load_from_csv(path),
            "json" => Self::load_from_json(path),
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    /// Load event data from a CSV file with a header row
    pub fn load_from_csv(csv_path: &Path) -> Result<DatasetLoadResult> {
        let bytes = fs::read(csv_path)
            .with_context(|| format!("Failed to read {}", csv_path.display()))?;
        let checksum = checksum_hex(&bytes);
        let dataset =
            csv_parser::parse_dataset_bytes(bytes).context("Failed to parse CSV file")?;

        Ok(DatasetLoadResult::new(
            dataset,
            DatasetSourceType::Csv,
            checksum,
        ))
    }

    /// Load event data from a JSON file holding an array of flat objects
    pub fn load_from_json(json_path: &Path) -> Result<DatasetLoadResult> {
        let content = fs::read_to_string(json_path)
            .with_context(|| format!("Failed to read {}", json_path.display()))?;
        let mut result = Self::load_from_json_str(&content).context("Failed to parse JSON file")?;
        result.checksum = checksum_hex(content.as_bytes());
        Ok(result)
    }

    /// Load event data from a JSON string.
    ///
    /// Columns are the keys of the first object; later objects missing a key
    /// get a null. Numbers and booleans are kept as text.
    pub fn load_from_json_str(json_str: &str) -> Result<DatasetLoadResult> {
        let records: Vec<serde_json::Map<String, Value>> =
            serde_json::from_str(json_str).context("Expected an array of objects")?;

        let columns: Vec<String> = records
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default();

        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if let Some(extra) = record.keys().find(|k| !columns.contains(k)) {
                anyhow::bail!("Record {} has unexpected field '{}'", i, extra);
            }
            let row: Vec<Cell> = columns
                .iter()
                .map(|c| record.get(c).and_then(json_cell))
                .collect();
            rows.push(row);
        }
        let dataset = Dataset::from_rows(columns, rows)?;

        Ok(DatasetLoadResult::new(
            dataset,
            DatasetSourceType::Json,
            checksum_hex(json_str.as_bytes()),
        ))
    }
}

fn json_cell(value: &Value) -> Cell {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Finds the input file in `data_dir`.
///
/// Candidates are files with a [`DATA_EXTENSIONS`] extension whose name
/// contains `pattern` (when given). They are sorted by name so the choice is
/// stable; when several match, the first is used and a warning is logged.
pub fn find_data_file(
    data_dir: &Path,
    pattern: Option<&str>,
    sink: &mut dyn LogSink,
) -> Result<PathBuf> {
    if !data_dir.is_dir() {
        anyhow::bail!("Directory not found: {}", data_dir.display());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(data_dir)
        .with_context(|| format!("Failed to list {}", data_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| DATA_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        })
        .filter(|path| match pattern {
            Some(p) => path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(p)),
            None => true,
        })
        .collect();
    files.sort();

    let Some(first) = files.first().cloned() else {
        anyhow::bail!(
            "No data files found in {} with extensions {:?}",
            data_dir.display(),
            DATA_EXTENSIONS
        );
    };

    if files.len() > 1 {
        sink.warning(
            COMPONENT,
            format!(
                "Multiple data files found in {}. Using: {}",
                data_dir.display(),
                first.display()
            ),
        );
    } else {
        sink.info(COMPONENT, format!("Data file detected: {}", first.display()));
    }
    Ok(first)
}

/// Per-column null profile of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub null_count: usize,
    pub null_pct: f64,
    pub distinct_values: usize,
}

/// Shape and null profile of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
    pub duplicate_rows: usize,
}

impl DatasetProfile {
    pub fn log_to(&self, sink: &mut dyn LogSink, component: &str) {
        sink.info(component, format!("  Rows: {}", self.rows));
        sink.info(component, format!("  Columns: {}", self.columns.len()));
        sink.info(component, format!("  Duplicate rows: {}", self.duplicate_rows));
        for column in &self.columns {
            sink.info(
                component,
                format!(
                    "    - {}: {} distinct (nulls: {}, {:.1}%)",
                    column.name, column.distinct_values, column.null_count, column.null_pct
                ),
            );
        }
    }
}

pub fn profile_dataset(dataset: &Dataset) -> PipelineResult<DatasetProfile> {
    let rows = dataset.height();
    let columns = dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let null_count = dataset.null_count(idx);
            let distinct: BTreeSet<&str> = dataset
                .text(name)
                .map(|values| values.into_iter().flatten().collect())
                .unwrap_or_default();
            ColumnProfile {
                name: name.clone(),
                null_count,
                null_pct: if rows > 0 {
                    null_count as f64 / rows as f64 * 100.0
                } else {
                    0.0
                },
                distinct_values: distinct.len(),
            }
        })
        .collect();

    Ok(DatasetProfile {
        rows,
        columns,
        duplicate_rows: dataset.stats()?.duplicate_rows,
    })
}
