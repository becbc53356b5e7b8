use csv::{ReaderBuilder, WriterBuilder};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::core::domain::Dataset;
use crate::core::error::{PipelineError, PipelineResult};

/// Parse a CSV file with a header row into a [`Dataset`]
pub fn parse_dataset_csv(csv_path: &Path) -> PipelineResult<Dataset> {
    let bytes = fs::read(csv_path).map_err(|e| {
        PipelineError::IoError(format!("Failed to open {}: {}", csv_path.display(), e))
    })?;
    parse_dataset_bytes(bytes)
}

/// Parse CSV text with a header row into a [`Dataset`]
pub fn parse_dataset_csv_str(content: &str) -> PipelineResult<Dataset> {
    parse_dataset_bytes(content.as_bytes().to_vec())
}

/// Parse CSV bytes with a header row.
///
/// Every column is read as UTF-8 (no type inference). Header names are
/// trimmed (and a leading byte-order mark dropped). Empty or whitespace-only
/// fields become nulls; every other field is kept verbatim so the
/// normalization stage can account for what it changes.
pub fn parse_dataset_bytes(bytes: Vec<u8>) -> PipelineResult<Dataset> {
    check_structure(&bytes)?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    Dataset::from_frame(df)
}

/// Rejects repeated headers (the frame reader would rename them) and rows
/// whose field count differs from the header.
fn check_structure(bytes: &[u8]) -> PipelineResult<()> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let mut seen = HashSet::new();
    for header in rdr.headers()?.iter() {
        let name = header.trim_start_matches('\u{feff}').trim();
        if !seen.insert(name.to_string()) {
            return Err(PipelineError::ParseError(format!(
                "Duplicate column header: {}",
                name
            )));
        }
    }
    for record in rdr.records() {
        record?;
    }
    Ok(())
}

/// Render a [`Dataset`] as CSV text (nulls as empty fields)
pub fn dataset_to_csv_string(dataset: &Dataset) -> PipelineResult<String> {
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    wtr.write_record(dataset.columns())?;
    for row in dataset.rows() {
        wtr.write_record(row.iter().map(|c| c.unwrap_or("")))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| PipelineError::IoError(format!("Failed to flush CSV buffer: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| PipelineError::ParseError(format!("CSV output is not UTF-8: {}", e)))
}

/// Write a [`Dataset`] to a CSV file, creating parent directories
pub fn write_dataset_csv(dataset: &Dataset, csv_path: &Path) -> PipelineResult<()> {
    if let Some(parent) = csv_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(csv_path, dataset_to_csv_string(dataset)?)?;
    Ok(())
}
