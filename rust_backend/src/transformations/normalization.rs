use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use polars::prelude::*;

use crate::core::domain::{parse_integer, Dataset};
use crate::core::error::PipelineResult;

/// Canonical form of a text value.
///
/// Upper-cases, strips diacritics (NFD, combining marks dropped), trims and
/// collapses whitespace runs to a single space. Returns `None` when nothing
/// is left.
///
/// # Examples
///
/// ```
/// use service_network::transformations::normalization::normalize_text;
///
/// assert_eq!(normalize_text("  asesoría   jurídica "), Some("ASESORIA JURIDICA".to_string()));
/// assert_eq!(normalize_text("   "), None);
/// ```
pub fn normalize_text(value: &str) -> Option<String> {
    let stripped: String = value
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Rewrites the non-null values of `column` with `rewrite`, returning the
/// number of cells whose content changed.
fn rewrite_column<F>(dataset: &mut Dataset, column: &str, rewrite: F) -> PipelineResult<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let current = dataset.require_text(column)?;
    let mut modified = 0;
    let rewritten: StringChunked = current
        .into_iter()
        .map(|value| {
            let value = value?;
            let new = rewrite(value);
            if new.as_deref() != Some(value) {
                modified += 1;
            }
            new
        })
        .collect();

    if modified > 0 {
        dataset.replace_text(column, rewritten)?;
    }
    Ok(modified)
}

/// Outcome of [`normalize_columns`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationOutcome {
    pub modified_cells: usize,
    /// Requested columns absent from the dataset.
    pub skipped_columns: Vec<String>,
}

/// Normalizes every listed column in place.
pub fn normalize_columns(
    dataset: &mut Dataset,
    columns: &[String],
) -> PipelineResult<NormalizationOutcome> {
    let mut outcome = NormalizationOutcome::default();
    for column in columns {
        if !dataset.has_column(column) {
            outcome.skipped_columns.push(column.clone());
            continue;
        }
        outcome.modified_cells += rewrite_column(dataset, column, normalize_text)?;
    }
    Ok(outcome)
}

/// Canonical text of an integer-like value ("2021.0", " 2021" become "2021").
pub fn canonical_integer(value: &str) -> Option<String> {
    parse_integer(value).map(|v| v.to_string())
}

/// Rewrites integer-like values as plain integers.
/// Values that do not parse are left for validation to report.
pub fn canonicalize_integer_columns(
    dataset: &mut Dataset,
    columns: &[String],
) -> PipelineResult<usize> {
    let mut modified = 0;
    for column in columns.iter() {
        if !dataset.has_column(column) {
            continue;
        }
        modified += rewrite_column(dataset, column, |value| {
            Some(canonical_integer(value).unwrap_or_else(|| value.to_string()))
        })?;
    }
    Ok(modified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_strips_accents_and_spaces() {
        assert_eq!(normalize_text("Señora  Núñez"), Some("SENORA NUNEZ".to_string()));
        assert_eq!(normalize_text("\tvirtual\n"), Some("VIRTUAL".to_string()));
        assert_eq!(normalize_text("AÑO"), Some("ANO".to_string()));
        assert_eq!(normalize_text(""), None);
    }

    #[test]
    fn test_normalize_text_is_idempotent() {
        for raw in ["  Él  dijo ", "MEDIA", "crédito ágil", "x"] {
            let once = normalize_text(raw).unwrap();
            assert_eq!(normalize_text(&once), Some(once.clone()));
        }
    }

    #[test]
    fn test_normalize_columns_counts_changes_and_skips_missing() {
        let mut ds = Dataset::from_rows(
            vec!["PERSONA".to_string(), "AÑO".to_string()],
            vec![
                vec![Some("ana".to_string()), Some(" 2021".to_string())],
                vec![Some("LUIS".to_string()), None],
                vec![Some("  ".to_string()), Some("2022".to_string())],
            ],
        )
        .unwrap();

        let outcome = normalize_columns(
            &mut ds,
            &["PERSONA".to_string(), "MODALIDAD".to_string()],
        )
        .unwrap();

        assert_eq!(outcome.modified_cells, 2);
        assert_eq!(outcome.skipped_columns, vec!["MODALIDAD".to_string()]);
        assert_eq!(ds.cell(0, "PERSONA"), Some("ANA"));
        assert_eq!(ds.cell(2, "PERSONA"), None);
        assert_eq!(ds.cell(0, "AÑO"), Some(" 2021"));
    }

    #[test]
    fn test_canonicalize_integer_columns() {
        let mut ds = Dataset::from_rows(
            vec!["AÑO".to_string()],
            vec![
                vec![Some("2021.0".to_string())],
                vec![Some("2022".to_string())],
                vec![Some("dos mil".to_string())],
                vec![Some("1e30".to_string())],
                vec![None],
            ],
        )
        .unwrap();

        assert_eq!(canonicalize_integer_columns(&mut ds, &["AÑO".to_string()]).unwrap(), 1);
        assert_eq!(ds.cell(0, "AÑO"), Some("2021"));
        assert_eq!(ds.cell(2, "AÑO"), Some("dos mil"));
        assert_eq!(ds.cell(3, "AÑO"), Some("1e30"));
        assert_eq!(canonicalize_integer_columns(&mut ds, &["AÑO".to_string()]).unwrap(), 0);
    }
}
