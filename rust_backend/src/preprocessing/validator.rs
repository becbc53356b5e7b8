//! Dataset validation with categorized findings.
//!
//! This module checks an event-log [`Dataset`] against the configured schema,
//! categorical domains, deduplication key and null expectations. Checks are
//! read-only and never fail on data-quality problems: every issue becomes a
//! [`ValidationFinding`] in the returned [`ValidationReport`]. Only a malformed
//! configuration (no expected columns, no domains or no key) is an error.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::PipelineConfig;
use crate::core::domain::{parse_integer, Dataset};
use crate::core::error::{PipelineError, PipelineResult};
use crate::logging::LogSink;

const COMPONENT: &str = "validator";

/// How many offending values a finding description lists.
const MAX_LISTED_VALUES: usize = 5;

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingCategory {
    Schema,
    Domain,
    Duplicate,
    Null,
}

impl FindingCategory {
    /// All categories, in the order `full_validation` runs them.
    pub const ALL: [FindingCategory; 4] = [
        FindingCategory::Schema,
        FindingCategory::Domain,
        FindingCategory::Duplicate,
        FindingCategory::Null,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCategory::Schema => "schema",
            FindingCategory::Domain => "domain",
            FindingCategory::Duplicate => "duplicate",
            FindingCategory::Null => "null",
        }
    }
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors fail their category, warnings are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub category: FindingCategory,
    pub severity: Severity,
    /// Offending column, when the finding is about one column.
    pub column: Option<String>,
    pub description: String,
    pub affected_row_count: usize,
}

/// Summary counters computed during validation.
///
/// # Fields
///
/// * `total_rows` - Rows in the validated dataset
/// * `missing_columns` - Expected columns absent from the dataset
/// * `out_of_domain_rows` - Sum over domain columns of rows outside the allowed set
/// * `duplicate_rows` - Rows repeating an earlier key tuple
/// * `null_cells` - Null values across the checked columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub total_rows: usize,
    pub missing_columns: usize,
    pub out_of_domain_rows: usize,
    pub duplicate_rows: usize,
    pub null_cells: usize,
}

/// Ordered findings of one validation call plus pass/fail per category.
///
/// A report has no public mutators; it is produced by the check functions in
/// this module and read by the caller.
///
/// # Examples
///
/// ```
/// use service_network::core::domain::Dataset;
/// use service_network::preprocessing::validator::{DatasetValidator, FindingCategory};
///
/// let ds = Dataset::new(vec!["PERSONA".to_string()]).unwrap();
/// let report = DatasetValidator::validate_schema(&ds, &["PERSONA".to_string(), "AÑO".to_string()], &[]);
///
/// assert!(!report.passed(FindingCategory::Schema));
/// assert_eq!(report.errors().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    findings: Vec<ValidationFinding>,
    stats: ValidationStats,
}

impl ValidationReport {
    fn new(total_rows: usize) -> Self {
        Self {
            findings: Vec::new(),
            stats: ValidationStats {
                total_rows,
                ..ValidationStats::default()
            },
        }
    }

    fn add_error(
        &mut self,
        category: FindingCategory,
        column: Option<&str>,
        description: String,
        affected_row_count: usize,
    ) {
        self.push(category, Severity::Error, column, description, affected_row_count);
    }

    fn add_warning(
        &mut self,
        category: FindingCategory,
        column: Option<&str>,
        description: String,
        affected_row_count: usize,
    ) {
        self.push(category, Severity::Warning, column, description, affected_row_count);
    }

    fn push(
        &mut self,
        category: FindingCategory,
        severity: Severity,
        column: Option<&str>,
        description: String,
        affected_row_count: usize,
    ) {
        self.findings.push(ValidationFinding {
            category,
            severity,
            column: column.map(str::to_string),
            description,
            affected_row_count,
        });
    }

    /// Appends the findings of `other` and adds up its counters.
    fn merge(&mut self, other: ValidationReport) {
        self.findings.extend(other.findings);
        self.stats.missing_columns += other.stats.missing_columns;
        self.stats.out_of_domain_rows += other.stats.out_of_domain_rows;
        self.stats.duplicate_rows += other.stats.duplicate_rows;
        self.stats.null_cells += other.stats.null_cells;
    }

    pub fn findings(&self) -> &[ValidationFinding] {
        &self.findings
    }

    pub fn stats(&self) -> &ValidationStats {
        &self.stats
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    /// Findings of one category, in report order.
    pub fn by_category(&self, category: FindingCategory) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(move |f| f.category == category)
    }

    /// A category passes when it holds no error finding.
    pub fn passed(&self, category: FindingCategory) -> bool {
        !self.errors().any(|f| f.category == category)
    }

    /// `true` when every category passed.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn category_status(&self) -> BTreeMap<FindingCategory, bool> {
        FindingCategory::ALL
            .iter()
            .map(|c| (*c, self.passed(*c)))
            .collect()
    }

    /// Affected rows reported for `column` under `category`, if any finding matches.
    pub fn affected_rows(&self, category: FindingCategory, column: &str) -> Option<usize> {
        self.by_category(category)
            .find(|f| f.column.as_deref() == Some(column))
            .map(|f| f.affected_row_count)
    }

    pub fn summary(&self) -> String {
        format!(
            "Status: {} | errors: {} | warnings: {}",
            if self.is_valid() { "PASSED" } else { "FAILED" },
            self.errors().count(),
            self.warnings().count()
        )
    }

    /// Writes the summary and every finding to `sink`.
    pub fn log_to(&self, sink: &mut dyn LogSink, component: &str) {
        sink.info(component, self.summary());
        for finding in &self.findings {
            let line = format!("[{}] {}", finding.category, finding.description);
            match finding.severity {
                Severity::Error => sink.warning(component, line),
                Severity::Warning => sink.info(component, line),
            }
        }
    }
}

fn list_values(values: &BTreeSet<String>) -> String {
    let shown: Vec<&str> = values
        .iter()
        .take(MAX_LISTED_VALUES)
        .map(String::as_str)
        .collect();
    if values.len() > MAX_LISTED_VALUES {
        format!("{}, ... ({} distinct)", shown.join(", "), values.len())
    } else {
        shown.join(", ")
    }
}

/// Validator for event-log datasets.
pub struct DatasetValidator;

impl DatasetValidator {
    /// Checks that every expected column is present.
    ///
    /// Each missing column is an error finding; extra columns produce a single
    /// warning. Non-null values of `integer_columns` that do not parse as
    /// integers are reported as a warning per column.
    pub fn validate_schema(
        dataset: &Dataset,
        expected_columns: &[String],
        integer_columns: &[String],
    ) -> ValidationReport {
        let mut report = ValidationReport::new(dataset.height());

        for column in expected_columns {
            if !dataset.has_column(column) {
                report.stats.missing_columns += 1;
                report.add_error(
                    FindingCategory::Schema,
                    Some(column),
                    format!("Missing required column: {}", column),
                    dataset.height(),
                );
            }
        }

        let extra: Vec<&str> = dataset
            .columns()
            .iter()
            .filter(|c| !expected_columns.contains(c))
            .map(String::as_str)
            .collect();
        if !extra.is_empty() {
            report.add_warning(
                FindingCategory::Schema,
                None,
                format!("Unexpected extra columns: {}", extra.join(", ")),
                0,
            );
        }

        for column in integer_columns {
            let Some(values) = dataset.text(column) else {
                continue;
            };
            let mut bad_values = BTreeSet::new();
            let bad_rows = values
                .into_iter()
                .flatten()
                .filter(|v| parse_integer(v).is_none())
                .inspect(|v| {
                    bad_values.insert(v.to_string());
                })
                .count();
            if bad_rows > 0 {
                report.add_warning(
                    FindingCategory::Schema,
                    Some(column),
                    format!(
                        "Column {}: {} non-integer values ({})",
                        column,
                        bad_rows,
                        list_values(&bad_values)
                    ),
                    bad_rows,
                );
            }
        }

        report
    }

    /// Counts, per domain column, the rows whose value is outside the allowed
    /// set. A null is outside every set. Rows are never dropped here.
    pub fn validate_domains(
        dataset: &Dataset,
        domain_map: &BTreeMap<String, BTreeSet<String>>,
    ) -> ValidationReport {
        let mut report = ValidationReport::new(dataset.height());

        for (column, allowed) in domain_map {
            let Some(values) = dataset.text(column) else {
                report.add_warning(
                    FindingCategory::Domain,
                    Some(column),
                    format!("Domain column {} is not present in the dataset", column),
                    0,
                );
                continue;
            };

            let mut invalid_values = BTreeSet::new();
            let mut null_rows = 0;
            let mut affected = 0;
            for value in values {
                match value {
                    Some(v) if allowed.contains(v) => {}
                    Some(v) => {
                        affected += 1;
                        invalid_values.insert(v.to_string());
                    }
                    None => {
                        affected += 1;
                        null_rows += 1;
                    }
                }
            }

            if affected > 0 {
                report.stats.out_of_domain_rows += affected;
                let mut description = format!(
                    "Column {}: {} rows outside the domain [{}]",
                    column,
                    affected,
                    allowed.iter().cloned().collect::<Vec<_>>().join(", ")
                );
                if !invalid_values.is_empty() {
                    description.push_str(&format!("; invalid values: {}", list_values(&invalid_values)));
                }
                if null_rows > 0 {
                    description.push_str(&format!("; null values: {}", null_rows));
                }
                report.add_error(FindingCategory::Domain, Some(column), description, affected);
            }
        }

        report
    }

    /// Counts rows that repeat an earlier `key_columns` tuple (rows beyond the
    /// first occurrence of each group). Nulls compare equal to each other.
    pub fn validate_duplicates(dataset: &Dataset, key_columns: &[String]) -> ValidationReport {
        let mut report = ValidationReport::new(dataset.height());

        let missing: Vec<&str> = key_columns
            .iter()
            .filter(|c| !dataset.has_column(c))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            report.add_error(
                FindingCategory::Duplicate,
                None,
                format!("Missing key columns: {}", missing.join(", ")),
                0,
            );
            return report;
        }

        let duplicates = match dataset.duplicate_count(key_columns) {
            Ok(count) => count,
            Err(e) => {
                report.add_error(
                    FindingCategory::Duplicate,
                    None,
                    format!("Duplicate check failed: {}", e),
                    0,
                );
                return report;
            }
        };

        report.stats.duplicate_rows = duplicates;
        if duplicates > 0 {
            report.add_error(
                FindingCategory::Duplicate,
                None,
                format!(
                    "{} duplicate rows on key [{}]",
                    duplicates,
                    key_columns.join(", ")
                ),
                duplicates,
            );
        }

        report
    }

    /// Counts null values per column (columns absent from the dataset are
    /// skipped) and adds a total finding.
    pub fn validate_nulls(dataset: &Dataset, columns: &[String]) -> ValidationReport {
        let mut report = ValidationReport::new(dataset.height());
        let total_rows = dataset.height();

        let mut total_nulls = 0;
        let mut complete: Option<BooleanChunked> = None;
        for column in columns {
            let Some(values) = dataset.text(column) else {
                continue;
            };
            let nulls = values.null_count();
            if nulls == 0 {
                continue;
            }
            total_nulls += nulls;
            let pct = nulls as f64 / total_rows as f64 * 100.0;
            report.add_error(
                FindingCategory::Null,
                Some(column),
                format!("Column {}: {} null values ({:.1}%)", column, nulls, pct),
                nulls,
            );
            let present = values.is_not_null();
            complete = Some(match complete {
                Some(mask) => &mask & &present,
                None => present,
            });
        }

        report.stats.null_cells = total_nulls;
        if let Some(complete) = complete {
            let rows_with_nulls = complete
                .into_iter()
                .filter(|present| *present == Some(false))
                .count();
            report.add_error(
                FindingCategory::Null,
                None,
                format!(
                    "Total: {} null values in {} rows",
                    total_nulls, rows_with_nulls
                ),
                rows_with_nulls,
            );
        }

        report
    }

    /// Runs the four checks in fixed order: schema, domain, duplicate, null.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigurationError`] when `expected_columns`,
    /// `domain_map` or `key_columns` is empty. Data-quality issues never
    /// produce an error.
    pub fn validate(
        dataset: &Dataset,
        expected_columns: &[String],
        domain_map: &BTreeMap<String, BTreeSet<String>>,
        key_columns: &[String],
    ) -> PipelineResult<ValidationReport> {
        Self::validate_with_types(dataset, expected_columns, &[], domain_map, key_columns)
    }

    fn validate_with_types(
        dataset: &Dataset,
        expected_columns: &[String],
        integer_columns: &[String],
        domain_map: &BTreeMap<String, BTreeSet<String>>,
        key_columns: &[String],
    ) -> PipelineResult<ValidationReport> {
        if expected_columns.is_empty() {
            return Err(PipelineError::ConfigurationError(
                "validation requires at least one expected column".to_string(),
            ));
        }
        if domain_map.is_empty() {
            return Err(PipelineError::ConfigurationError(
                "validation requires at least one domain".to_string(),
            ));
        }
        if domain_map.keys().any(|c| c.trim().is_empty()) {
            return Err(PipelineError::ConfigurationError(
                "domain map contains a blank column name".to_string(),
            ));
        }
        if key_columns.is_empty() {
            return Err(PipelineError::ConfigurationError(
                "validation requires at least one key column".to_string(),
            ));
        }

        let mut report = ValidationReport::new(dataset.height());
        report.merge(Self::validate_schema(dataset, expected_columns, integer_columns));
        report.merge(Self::validate_domains(dataset, domain_map));
        report.merge(Self::validate_duplicates(dataset, key_columns));
        report.merge(Self::validate_nulls(dataset, expected_columns));
        Ok(report)
    }
}

/// Runs every check as configured and logs the outcome.
///
/// Configuration problems are logged at ERROR before being returned.
pub fn full_validation(
    dataset: &Dataset,
    config: &PipelineConfig,
    sink: &mut dyn LogSink,
) -> PipelineResult<ValidationReport> {
    sink.info(
        COMPONENT,
        format!(
            "Validating {} rows x {} columns",
            dataset.height(),
            dataset.width()
        ),
    );

    let report = DatasetValidator::validate_with_types(
        dataset,
        &config.expected_columns,
        &config.integer_columns,
        &config.domains,
        &config.key_columns,
    )
    .map_err(|e| {
        sink.error(COMPONENT, e.to_string());
        e
    })?;

    for category in FindingCategory::ALL {
        sink.info(
            COMPONENT,
            format!(
                "{} check: {} ({} findings)",
                category,
                if report.passed(category) { "passed" } else { "failed" },
                report.by_category(category).count()
            ),
        );
    }
    report.log_to(sink, COMPONENT);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::Cell;
    use crate::logging::{LogLevel, RunLog};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        let rows = rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
                    .collect::<Vec<Cell>>()
            })
            .collect();
        Dataset::from_rows(strings(columns), rows).unwrap()
    }

    fn domains(entries: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
        entries
            .iter()
            .map(|(c, vals)| (c.to_string(), vals.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_schema_missing_and_extra_columns() {
        let ds = dataset(&["PERSONA", "NOTA"], &[&["ANA", "x"]]);
        let report =
            DatasetValidator::validate_schema(&ds, &strings(&["PERSONA", "AÑO"]), &[]);

        assert!(!report.passed(FindingCategory::Schema));
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.stats().missing_columns, 1);
        assert_eq!(report.affected_rows(FindingCategory::Schema, "AÑO"), Some(1));
    }

    #[test]
    fn test_schema_extra_columns_do_not_fail() {
        let ds = dataset(&["PERSONA", "NOTA"], &[&["ANA", "x"]]);
        let report = DatasetValidator::validate_schema(&ds, &strings(&["PERSONA"]), &[]);
        assert!(report.passed(FindingCategory::Schema));
    }

    #[test]
    fn test_schema_integer_check_is_warning() {
        let ds = dataset(&["AÑO"], &[&["2021"], &["dos mil"], &[""]]);
        let report =
            DatasetValidator::validate_schema(&ds, &strings(&["AÑO"]), &strings(&["AÑO"]));
        assert!(report.passed(FindingCategory::Schema));
        assert_eq!(report.affected_rows(FindingCategory::Schema, "AÑO"), Some(1));
    }

    #[test]
    fn test_domain_counts_invalid_and_null() {
        let ds = dataset(
            &["MODALIDAD"],
            &[&["VIRTUAL"], &["HIBRIDA"], &[""], &["PRESENCIAL"]],
        );
        let report = DatasetValidator::validate_domains(
            &ds,
            &domains(&[("MODALIDAD", &["PRESENCIAL", "VIRTUAL"])]),
        );

        assert!(!report.passed(FindingCategory::Domain));
        assert_eq!(report.affected_rows(FindingCategory::Domain, "MODALIDAD"), Some(2));
        let finding = report.by_category(FindingCategory::Domain).next().unwrap();
        assert!(finding.description.contains("HIBRIDA"));
        assert!(finding.description.contains("null values: 1"));
    }

    #[test]
    fn test_domain_missing_column_is_warning() {
        let ds = dataset(&["PERSONA"], &[&["ANA"]]);
        let report =
            DatasetValidator::validate_domains(&ds, &domains(&[("MODALIDAD", &["VIRTUAL"])]));
        assert!(report.passed(FindingCategory::Domain));
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn test_domain_all_null_with_empty_allowed_set() {
        let ds = dataset(&["PERSONA", "EXTRA"], &[&["A", ""], &["B", ""], &["C", ""]]);
        let report = DatasetValidator::validate_domains(&ds, &domains(&[("EXTRA", &[])]));
        assert_eq!(report.affected_rows(FindingCategory::Domain, "EXTRA"), Some(3));
    }

    #[test]
    fn test_duplicates_beyond_first_occurrence() {
        let ds = dataset(
            &["PERSONA", "TAREA", "NOTA"],
            &[
                &["ANA", "T1", "a"],
                &["ANA", "T1", "b"],
                &["ANA", "T1", "c"],
                &["LUIS", "T1", "a"],
                &["LUIS", "", "a"],
                &["LUIS", "", "b"],
            ],
        );
        let report = DatasetValidator::validate_duplicates(&ds, &strings(&["PERSONA", "TAREA"]));
        assert_eq!(report.stats().duplicate_rows, 3);
        assert!(!report.passed(FindingCategory::Duplicate));
    }

    #[test]
    fn test_duplicates_missing_key_column() {
        let ds = dataset(&["PERSONA"], &[&["ANA"]]);
        let report = DatasetValidator::validate_duplicates(&ds, &strings(&["PERSONA", "AÑO"]));
        assert!(!report.passed(FindingCategory::Duplicate));
        assert!(report.findings()[0].description.contains("AÑO"));
    }

    #[test]
    fn test_nulls_per_column_and_total() {
        let ds = dataset(
            &["PERSONA", "AÑO", "NOTA"],
            &[&["ANA", "", ""], &["", "", "x"], &["LUIS", "2021", ""]],
        );
        let report = DatasetValidator::validate_nulls(&ds, &strings(&["PERSONA", "AÑO"]));

        assert_eq!(report.affected_rows(FindingCategory::Null, "PERSONA"), Some(1));
        assert_eq!(report.affected_rows(FindingCategory::Null, "AÑO"), Some(2));
        assert_eq!(report.stats().null_cells, 3);
        let total = report.by_category(FindingCategory::Null).last().unwrap();
        assert!(total.column.is_none());
        assert_eq!(total.affected_row_count, 2);
    }

    #[test]
    fn test_validate_fixed_order_and_clean_pass() {
        let ds = dataset(
            &["PERSONA", "MODALIDAD"],
            &[&["ANA", "VIRTUAL"], &["ANA", "VIRTUAL"], &["", "OTRA"]],
        );
        let report = DatasetValidator::validate(
            &ds,
            &strings(&["PERSONA", "MODALIDAD", "AÑO"]),
            &domains(&[("MODALIDAD", &["VIRTUAL"])]),
            &strings(&["PERSONA", "MODALIDAD"]),
        )
        .unwrap();

        let order: Vec<FindingCategory> = report.findings().iter().map(|f| f.category).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
        assert!(!report.is_valid());

        let clean = dataset(&["PERSONA", "MODALIDAD"], &[&["ANA", "VIRTUAL"]]);
        let report = DatasetValidator::validate(
            &clean,
            &strings(&["PERSONA", "MODALIDAD"]),
            &domains(&[("MODALIDAD", &["VIRTUAL"])]),
            &strings(&["PERSONA"]),
        )
        .unwrap();
        assert!(report.is_valid());
        assert!(report.category_status().values().all(|passed| *passed));
    }

    #[test]
    fn test_validate_rejects_malformed_configuration() {
        let ds = dataset(&["PERSONA"], &[&["ANA"]]);
        let dom = domains(&[("MODALIDAD", &["VIRTUAL"])]);
        let cols = strings(&["PERSONA"]);

        assert!(DatasetValidator::validate(&ds, &[], &dom, &cols).is_err());
        assert!(DatasetValidator::validate(&ds, &cols, &BTreeMap::new(), &cols).is_err());
        assert!(DatasetValidator::validate(&ds, &cols, &dom, &[]).is_err());
    }

    #[test]
    fn test_full_validation_logs_errors_before_failing() {
        let ds = dataset(&["PERSONA"], &[&["ANA"]]);
        let mut config = PipelineConfig::default();
        config.key_columns.clear();
        let mut log = RunLog::silent();

        assert!(full_validation(&ds, &config, &mut log).is_err());
        assert_eq!(log.count(LogLevel::Error), 1);
    }

    #[test]
    fn test_full_validation_on_empty_dataset() {
        let ds = Dataset::new(strings(&crate::core::domain::STANDARD_COLUMNS)).unwrap();
        let mut log = RunLog::silent();
        let report = full_validation(&ds, &PipelineConfig::default(), &mut log).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.stats().total_rows, 0);
    }
}
