//! Domain models for service consumption events.
//!
//! This module provides the tabular [`Dataset`] that flows through the
//! validation and cleaning stages, and the typed [`TabularRecord`] view of a
//! cleaned row.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::error::{PipelineError, PipelineResult};

pub const COL_PERSONA: &str = "PERSONA";
pub const COL_TIPO_SERVICIO: &str = "TIPO DE SERVICIO";
pub const COL_NOMBRE_TAREA: &str = "NOMBRE DE LA TAREA";
pub const COL_ANIO: &str = "AÑO";
pub const COL_MODALIDAD: &str = "MODALIDAD";
pub const COL_COMPLEJIDAD: &str = "COMPLEJIDAD";

/// The six columns every event log is expected to carry, in source order.
pub const STANDARD_COLUMNS: [&str; 6] = [
    COL_PERSONA,
    COL_TIPO_SERVICIO,
    COL_NOMBRE_TAREA,
    COL_ANIO,
    COL_MODALIDAD,
    COL_COMPLEJIDAD,
];

/// Deduplication key observed in the event log.
pub const STANDARD_KEY_COLUMNS: [&str; 5] = [
    COL_PERSONA,
    COL_TIPO_SERVICIO,
    COL_ANIO,
    COL_NOMBRE_TAREA,
    COL_MODALIDAD,
];

/// A single cell. `None` is a null / missing value.
pub type Cell = Option<String>;

/// Column-labeled event table backed by a polars [`DataFrame`].
///
/// Every column is a UTF-8 column. Rows keep their input order through every
/// stage; filtering and deduplication only ever remove rows, they never
/// reorder them.
///
/// # Examples
///
/// ```
/// use service_network::core::domain::Dataset;
///
/// let ds = Dataset::from_rows(
///     vec!["PERSONA".to_string(), "AÑO".to_string()],
///     vec![vec![Some("ANA".to_string()), Some("2021".to_string())]],
/// ).unwrap();
///
/// assert_eq!(ds.height(), 1);
/// assert_eq!(ds.cell(0, "PERSONA"), Some("ANA"));
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    df: DataFrame,
}

/// Whole-table statistics captured before and after cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub rows: usize,
    pub columns: usize,
    /// Rows that repeat an earlier row across every column.
    pub duplicate_rows: usize,
    pub null_cells: usize,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            df: DataFrame::empty(),
        }
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.height() == other.height()
            && self.columns.iter().all(|c| match (self.text(c), other.text(c)) {
                (Some(a), Some(b)) => a.into_iter().eq(b),
                _ => false,
            })
    }
}

fn text_series(name: &str, values: Vec<Cell>) -> Column {
    Column::from(Series::new(name.into(), values))
}

impl Dataset {
    /// Creates an empty dataset with the given column labels.
    pub fn new(columns: Vec<String>) -> PipelineResult<Self> {
        Self::from_rows(columns, Vec::new())
    }

    /// Creates a dataset from row-major cells, checking that every row
    /// matches the column count and that labels are unique.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> PipelineResult<Self> {
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(PipelineError::InvalidRecord {
                row,
                reason: format!("expected {} cells, found {}", columns.len(), cells.len()),
            });
        }

        let mut values: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); columns.len()];
        for row in rows {
            for (idx, cell) in row.into_iter().enumerate() {
                values[idx].push(cell);
            }
        }
        Self::from_columns(columns.into_iter().zip(values).collect())
    }

    /// Creates a dataset from named columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<Cell>)>) -> PipelineResult<Self> {
        let mut seen = HashSet::new();
        if let Some((dup, _)) = columns.iter().find(|(name, _)| !seen.insert(name.as_str())) {
            return Err(PipelineError::ParseError(format!(
                "Duplicate column header: {}",
                dup
            )));
        }

        let names: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
        let df = DataFrame::new(
            columns
                .into_iter()
                .map(|(name, values)| text_series(&name, values))
                .collect(),
        )?;
        Ok(Self { columns: names, df })
    }

    /// Wraps a frame produced by a reader.
    ///
    /// Column labels are trimmed (a leading byte-order mark dropped), every
    /// column is cast to UTF-8, and empty or whitespace-only values become
    /// nulls. Other values are kept verbatim.
    pub fn from_frame(df: DataFrame) -> PipelineResult<Self> {
        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let name = column
                .name()
                .as_str()
                .trim_start_matches('\u{feff}')
                .trim()
                .to_string();
            let cast = column.cast(&DataType::String)?;
            let values: Vec<Cell> = cast
                .str()?
                .into_iter()
                .map(|v| v.filter(|s| !s.trim().is_empty()).map(str::to_string))
                .collect();
            columns.push((name, values));
        }
        Self::from_columns(columns)
    }

    /// The underlying frame.
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Like [`column_index`](Self::column_index) but missing columns are an error.
    pub fn require_column(&self, name: &str) -> PipelineResult<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// The UTF-8 values of `name`, or `None` for unknown columns.
    pub fn text(&self, name: &str) -> Option<&StringChunked> {
        self.df.column(name).ok()?.str().ok()
    }

    /// Like [`text`](Self::text) but missing columns are an error.
    pub fn require_text(&self, name: &str) -> PipelineResult<&StringChunked> {
        self.require_column(name)?;
        Ok(self.df.column(name)?.str()?)
    }

    /// Value of `column` at `row`; `None` for nulls, unknown columns and
    /// out-of-range rows.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        if row >= self.height() {
            return None;
        }
        self.text(column)?.get(row)
    }

    /// Every row as borrowed cells, in column order.
    pub fn rows(&self) -> Vec<Vec<Option<&str>>> {
        let columns: Vec<Option<&StringChunked>> =
            self.columns.iter().map(|c| self.text(c)).collect();
        (0..self.height())
            .map(|row| {
                columns
                    .iter()
                    .map(|&ca| ca.and_then(|ca| ca.get(row)))
                    .collect()
            })
            .collect()
    }

    /// Count of null cells in the column at `idx`.
    pub fn null_count(&self, idx: usize) -> usize {
        self.df
            .get_columns()
            .get(idx)
            .map_or(0, |c| c.null_count())
    }

    /// Replaces the values of an existing column, keeping its position.
    pub fn replace_text(&mut self, name: &str, values: StringChunked) -> PipelineResult<()> {
        self.require_column(name)?;
        self.df.with_column(values.with_name(name.into()).into_series())?;
        Ok(())
    }

    /// Keeps the rows where `mask` is true, preserving order.
    /// Returns the number of removed rows.
    pub fn filter(&mut self, mask: &BooleanChunked) -> PipelineResult<usize> {
        let before = self.height();
        self.df = self.df.filter(mask)?;
        Ok(before - self.height())
    }

    /// Keeps the first row of every distinct `keys` tuple, preserving order.
    /// Nulls compare equal. Returns the number of removed rows.
    pub fn unique_first(&mut self, keys: &[String]) -> PipelineResult<usize> {
        let before = self.height();
        self.df = self
            .df
            .unique_stable(Some(keys), UniqueKeepStrategy::First, None)?;
        Ok(before - self.height())
    }

    /// Rows that repeat an earlier `keys` tuple.
    pub fn duplicate_count(&self, keys: &[String]) -> PipelineResult<usize> {
        if self.is_empty() {
            return Ok(0);
        }
        let distinct = self
            .df
            .unique_stable(Some(keys), UniqueKeepStrategy::First, None)?;
        Ok(self.height() - distinct.height())
    }

    pub fn stats(&self) -> PipelineResult<DatasetStats> {
        Ok(DatasetStats {
            rows: self.height(),
            columns: self.width(),
            duplicate_rows: self.duplicate_count(&self.columns)?,
            null_cells: self.df.get_columns().iter().map(|c| c.null_count()).sum(),
        })
    }

    /// Converts every row into a typed [`TabularRecord`].
    pub fn records(&self) -> PipelineResult<Vec<TabularRecord>> {
        (0..self.height())
            .map(|row| TabularRecord::from_row(self, row))
            .collect()
    }
}

/// Parses an integer cell, accepting a zero fractional part ("2021.0")
/// that spreadsheet exports tend to produce.
pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Some(f as i64),
        _ => None,
    }
}

/// Delivery mode of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Modalidad {
    Presencial,
    Virtual,
}

impl Modalidad {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modalidad::Presencial => "PRESENCIAL",
            Modalidad::Virtual => "VIRTUAL",
        }
    }
}

impl FromStr for Modalidad {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PRESENCIAL" => Ok(Modalidad::Presencial),
            "VIRTUAL" => Ok(Modalidad::Virtual),
            other => Err(format!("unknown modalidad '{}'", other)),
        }
    }
}

impl fmt::Display for Modalidad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complexity grade of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Complejidad {
    Baja,
    Media,
    Alta,
}

impl Complejidad {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complejidad::Baja => "BAJA",
            Complejidad::Media => "MEDIA",
            Complejidad::Alta => "ALTA",
        }
    }
}

impl FromStr for Complejidad {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BAJA" => Ok(Complejidad::Baja),
            "MEDIA" => Ok(Complejidad::Media),
            "ALTA" => Ok(Complejidad::Alta),
            other => Err(format!("unknown complejidad '{}'", other)),
        }
    }
}

impl fmt::Display for Complejidad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of one cleaned event row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularRecord {
    pub persona: String,
    pub tipo_servicio: String,
    pub nombre_tarea: String,
    pub anio: i32,
    pub modalidad: Modalidad,
    pub complejidad: Complejidad,
}

impl TabularRecord {
    /// Builds the typed record for `row`.
    ///
    /// Fails when a standard column is missing or null, when the year is not
    /// an integer, or when a categorical value is outside its enum.
    pub fn from_row(dataset: &Dataset, row: usize) -> PipelineResult<Self> {
        let text = |column: &str| -> PipelineResult<String> {
            dataset.require_column(column)?;
            dataset
                .cell(row, column)
                .map(str::to_string)
                .ok_or_else(|| PipelineError::InvalidRecord {
                    row,
                    reason: format!("null value in {}", column),
                })
        };
        let invalid = |reason: String| PipelineError::InvalidRecord { row, reason };

        let anio_raw = text(COL_ANIO)?;
        let anio = parse_integer(&anio_raw)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| invalid(format!("'{}' is not a valid year", anio_raw)))?;

        Ok(Self {
            persona: text(COL_PERSONA)?,
            tipo_servicio: text(COL_TIPO_SERVICIO)?,
            nombre_tarea: text(COL_NOMBRE_TAREA)?,
            anio,
            modalidad: text(COL_MODALIDAD)?.parse().map_err(invalid)?,
            complejidad: text(COL_COMPLEJIDAD)?.parse().map_err(invalid)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    fn standard_dataset(rows: &[&[&str]]) -> Dataset {
        Dataset::from_rows(
            STANDARD_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows.iter().map(|r| cells(r)).collect(),
        )
        .unwrap()
    }

    fn ab(rows: &[&[&str]]) -> Dataset {
        Dataset::from_rows(
            vec!["A".to_string(), "B".to_string()],
            rows.iter().map(|r| cells(r)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_rejects_wrong_width_and_duplicate_labels() {
        let cols = vec!["A".to_string(), "B".to_string()];
        assert!(Dataset::from_rows(cols.clone(), vec![cells(&["x"])]).is_err());
        assert_eq!(Dataset::from_rows(cols, vec![cells(&["x", "y"])]).unwrap().height(), 1);
        assert!(Dataset::new(vec!["A".to_string(), "A".to_string()]).is_err());
        assert!(Dataset::new(vec!["A".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn test_cell_and_rows() {
        let ds = ab(&[&["x", ""], &["y", "z"]]);
        assert_eq!(ds.cell(1, "B"), Some("z"));
        assert_eq!(ds.cell(0, "B"), None);
        assert_eq!(ds.cell(2, "A"), None);
        assert_eq!(ds.cell(0, "C"), None);
        assert_eq!(ds.rows(), vec![vec![Some("x"), None], vec![Some("y"), Some("z")]]);
        assert_eq!(ds.null_count(1), 1);
    }

    #[test]
    fn test_filter_and_unique_first_preserve_order() {
        let mut ds = ab(&[&["x", "1"], &["y", "2"], &["x", "3"], &["z", ""], &["y", "4"]]);

        let removed = ds.unique_first(&["A".to_string()]).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(ds.rows(), ab(&[&["x", "1"], &["y", "2"], &["z", ""]]).rows());

        let mask = BooleanChunked::from_slice("keep".into(), &[true, false, true]);
        assert_eq!(ds.filter(&mask).unwrap(), 1);
        assert_eq!(ds, ab(&[&["x", "1"], &["z", ""]]));
    }

    #[test]
    fn test_replace_text_keeps_position() {
        let mut ds = ab(&[&["x", "1"], &["y", ""]]);
        let upper: StringChunked = ds
            .text("A")
            .unwrap()
            .into_iter()
            .map(|v| v.map(|s| s.to_uppercase()))
            .collect();

        ds.replace_text("A", upper).unwrap();

        assert_eq!(ds.columns(), &["A".to_string(), "B".to_string()]);
        assert_eq!(ds.cell(1, "A"), Some("Y"));
        assert!(ds.replace_text("C", StringChunked::from_slice("C".into(), &["x", "y"])).is_err());
    }

    #[test]
    fn test_from_frame_trims_labels_and_blank_values() {
        let df = DataFrame::new(vec![
            Column::from(Series::new(" A ".into(), &[Some("x"), Some("  "), None])),
            Column::from(Series::new("B".into(), &[1i64, 2, 3])),
        ])
        .unwrap();

        let ds = Dataset::from_frame(df).unwrap();

        assert_eq!(ds.columns(), &["A".to_string(), "B".to_string()]);
        assert_eq!(ds.cell(1, "A"), None);
        assert_eq!(ds.cell(2, "B"), Some("3"));
    }

    #[test]
    fn test_stats_counts_full_row_duplicates_and_nulls() {
        let ds = standard_dataset(&[
            &["ANA", "ASESORIA", "T1", "2021", "VIRTUAL", "BAJA"],
            &["ANA", "ASESORIA", "T1", "2021", "VIRTUAL", "BAJA"],
            &["LUIS", "", "T1", "2021", "VIRTUAL", ""],
        ]);
        let stats = ds.stats().unwrap();
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.columns, 6);
        assert_eq!(stats.duplicate_rows, 1);
        assert_eq!(stats.null_cells, 2);
    }

    #[test]
    fn test_record_from_row() {
        let ds = standard_dataset(&[&["ANA", "ASESORIA", "T1", "2021.0", "virtual", "ALTA"]]);
        let record = TabularRecord::from_row(&ds, 0).unwrap();
        assert_eq!(record.anio, 2021);
        assert_eq!(record.modalidad, Modalidad::Virtual);
        assert_eq!(record.complejidad, Complejidad::Alta);
    }

    #[test]
    fn test_record_rejects_bad_year_and_domain() {
        let ds = standard_dataset(&[
            &["ANA", "ASESORIA", "T1", "dos mil", "VIRTUAL", "ALTA"],
            &["ANA", "ASESORIA", "T1", "2021", "HIBRIDA", "ALTA"],
            &["ANA", "ASESORIA", "", "2021", "VIRTUAL", "ALTA"],
        ]);
        assert!(TabularRecord::from_row(&ds, 0).is_err());
        assert!(TabularRecord::from_row(&ds, 1).is_err());
        assert!(TabularRecord::from_row(&ds, 2).is_err());
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer(" 2022 "), Some(2022));
        assert_eq!(parse_integer("2022.0"), Some(2022));
        assert_eq!(parse_integer("2022.5"), None);
        assert_eq!(parse_integer("abc"), None);
        assert_eq!(parse_integer("1e3"), Some(1000));
        assert_eq!(parse_integer("1e30"), None);
        assert_eq!(parse_integer("-1e300"), None);
        assert_eq!(parse_integer("inf"), None);
        assert_eq!(parse_integer("NaN"), None);
    }
}
