//! Pipeline configuration file support.
//!
//! This module reads the pipeline configuration from a TOML file and checks it
//! once at pipeline entry. The resulting [`PipelineConfig`] is passed by
//! reference through every stage and never re-read mid-run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::domain::{
    COL_ANIO, COL_COMPLEJIDAD, COL_MODALIDAD, COL_NOMBRE_TAREA, COL_PERSONA, COL_TIPO_SERVICIO,
    STANDARD_COLUMNS, STANDARD_KEY_COLUMNS,
};
use crate::core::error::{PipelineError, PipelineResult};
use crate::transformations::normalization::{canonical_integer, normalize_text};

/// How the cleaner resolves nulls left after deduplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullPolicy {
    #[default]
    Drop,
    Fill,
}

/// What the pipeline does when required columns are missing from the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicy {
    #[default]
    Abort,
    Warn,
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    pub expected_columns: Vec<String>,
    #[serde(default = "default_key_columns")]
    pub key_columns: Vec<String>,
    /// Columns normalized as text. `None` means every expected column that
    /// is not an integer column.
    #[serde(default)]
    pub text_columns: Option<Vec<String>>,
    #[serde(default = "default_integer_columns")]
    pub integer_columns: Vec<String>,
    #[serde(default)]
    pub null_policy: NullPolicy,
    /// Per-column defaults used by [`NullPolicy::Fill`].
    #[serde(default)]
    pub fill_values: BTreeMap<String, String>,
    #[serde(default)]
    pub schema_policy: SchemaPolicy,
    pub domains: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub summary: SummarySettings,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub outputs: OutputSettings,
}

/// Columns used to build the person / service-task network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    #[serde(default = "default_person_column")]
    pub person_column: String,
    #[serde(default = "default_task_columns")]
    pub task_columns: Vec<String>,
    #[serde(default = "default_task_separator")]
    pub task_separator: String,
}

/// Columns crossed with the year in the per-year category counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySettings {
    #[serde(default = "default_year_column")]
    pub year_column: String,
    #[serde(default = "default_category_columns")]
    pub category_columns: Vec<String>,
}

/// Directory layout, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_data_raw")]
    pub data_raw: PathBuf,
    #[serde(default = "default_data_processed")]
    pub data_processed: PathBuf,
    #[serde(default = "default_reports")]
    pub reports: PathBuf,
}

/// Artifact file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_cleaned_csv")]
    pub cleaned_csv: String,
    #[serde(default = "default_edges_bipartite")]
    pub edges_bipartite: String,
    #[serde(default = "default_projection_weighted")]
    pub projection_weighted: String,
    #[serde(default = "default_cleaning_log_csv")]
    pub cleaning_log_csv: String,
    #[serde(default = "default_cleaning_log_md")]
    pub cleaning_log_md: String,
    #[serde(default = "default_metrics_summary")]
    pub metrics_summary: String,
    #[serde(default = "default_validation_json")]
    pub validation_json: String,
    #[serde(default = "default_degree_histogram_bipartite")]
    pub degree_histogram_bipartite: String,
    #[serde(default = "default_degree_histogram_projection")]
    pub degree_histogram_projection: String,
    #[serde(default = "default_strength_histogram")]
    pub strength_histogram: String,
    #[serde(default = "default_category_counts")]
    pub category_counts: String,
    #[serde(default = "default_etl_log")]
    pub etl_log: String,
}

fn default_random_seed() -> u64 {
    42
}

fn default_key_columns() -> Vec<String> {
    STANDARD_KEY_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn default_integer_columns() -> Vec<String> {
    vec![COL_ANIO.to_string()]
}

fn default_person_column() -> String {
    COL_PERSONA.to_string()
}

fn default_task_columns() -> Vec<String> {
    vec![COL_TIPO_SERVICIO.to_string(), COL_NOMBRE_TAREA.to_string()]
}

fn default_task_separator() -> String {
    " :: ".to_string()
}

fn default_data_raw() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_data_processed() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_reports() -> PathBuf {
    PathBuf::from("reports")
}

fn default_cleaned_csv() -> String {
    "eventos_limpios.csv".to_string()
}

fn default_edges_bipartite() -> String {
    "edges_bipartita.csv".to_string()
}

fn default_projection_weighted() -> String {
    "proyeccion_cc_ponderada.csv".to_string()
}

fn default_cleaning_log_csv() -> String {
    "limpieza_log.csv".to_string()
}

fn default_cleaning_log_md() -> String {
    "limpieza_log.md".to_string()
}

fn default_metrics_summary() -> String {
    "metricas_resumen.csv".to_string()
}

fn default_validation_json() -> String {
    "validacion.json".to_string()
}

fn default_degree_histogram_bipartite() -> String {
    "hist_grado_bipartita.csv".to_string()
}

fn default_degree_histogram_projection() -> String {
    "hist_grado_proyeccion.csv".to_string()
}

fn default_strength_histogram() -> String {
    "hist_fuerza_proyeccion.csv".to_string()
}

fn default_category_counts() -> String {
    "conteos_por_anio.csv".to_string()
}

fn default_year_column() -> String {
    COL_ANIO.to_string()
}

fn default_category_columns() -> Vec<String> {
    vec![COL_MODALIDAD.to_string(), COL_COMPLEJIDAD.to_string()]
}

fn default_etl_log() -> String {
    "etl.log".to_string()
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            person_column: default_person_column(),
            task_columns: default_task_columns(),
            task_separator: default_task_separator(),
        }
    }
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            year_column: default_year_column(),
            category_columns: default_category_columns(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_raw: default_data_raw(),
            data_processed: default_data_processed(),
            reports: default_reports(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            cleaned_csv: default_cleaned_csv(),
            edges_bipartite: default_edges_bipartite(),
            projection_weighted: default_projection_weighted(),
            cleaning_log_csv: default_cleaning_log_csv(),
            cleaning_log_md: default_cleaning_log_md(),
            metrics_summary: default_metrics_summary(),
            validation_json: default_validation_json(),
            degree_histogram_bipartite: default_degree_histogram_bipartite(),
            degree_histogram_projection: default_degree_histogram_projection(),
            strength_histogram: default_strength_histogram(),
            category_counts: default_category_counts(),
            etl_log: default_etl_log(),
        }
    }
}

impl Default for PipelineConfig {
    /// The standard event-log schema with canonical (normalized) domain values.
    fn default() -> Self {
        let mut domains = BTreeMap::new();
        domains.insert(
            COL_MODALIDAD.to_string(),
            ["PRESENCIAL", "VIRTUAL"].iter().map(|v| v.to_string()).collect(),
        );
        domains.insert(
            COL_COMPLEJIDAD.to_string(),
            ["BAJA", "MEDIA", "ALTA"].iter().map(|v| v.to_string()).collect(),
        );

        Self {
            random_seed: default_random_seed(),
            expected_columns: STANDARD_COLUMNS.iter().map(|c| c.to_string()).collect(),
            key_columns: default_key_columns(),
            text_columns: None,
            integer_columns: default_integer_columns(),
            null_policy: NullPolicy::Drop,
            fill_values: BTreeMap::new(),
            schema_policy: SchemaPolicy::Abort,
            domains,
            network: NetworkSettings::default(),
            summary: SummarySettings::default(),
            paths: PathSettings::default(),
            outputs: OutputSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load the pipeline configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(PipelineConfig)` if the file was read, parsed and is well formed
    /// * `Err(PipelineError::ConfigurationError)` otherwise
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and check a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from the default location.
    ///
    /// Searches for `pipeline.toml` in:
    /// 1. `config/` under the current directory
    /// 2. Current directory
    /// 3. `rust_backend/config/`
    pub fn from_default_location() -> PipelineResult<Self> {
        let search_paths = [
            PathBuf::from("config/pipeline.toml"),
            PathBuf::from("pipeline.toml"),
            PathBuf::from("rust_backend/config/pipeline.toml"),
        ];

        for path in &search_paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Err(PipelineError::ConfigurationError(
            "No pipeline.toml found in standard locations".to_string(),
        ))
    }

    /// Structural checks; any failure is fatal for the run.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.expected_columns.is_empty() {
            return Err(PipelineError::ConfigurationError(
                "expected_columns must not be empty".to_string(),
            ));
        }
        if let Some(blank) = self.expected_columns.iter().find(|c| c.trim().is_empty()) {
            return Err(PipelineError::ConfigurationError(format!(
                "expected_columns contains a blank name: '{}'",
                blank
            )));
        }
        if self.domains.is_empty() {
            return Err(PipelineError::ConfigurationError(
                "domains must declare at least one column".to_string(),
            ));
        }
        if self.domains.keys().any(|c| c.trim().is_empty()) {
            return Err(PipelineError::ConfigurationError(
                "domains contains a blank column name".to_string(),
            ));
        }
        if self.key_columns.is_empty() {
            return Err(PipelineError::ConfigurationError(
                "key_columns must not be empty".to_string(),
            ));
        }
        if self.network.person_column.trim().is_empty() || self.network.task_columns.is_empty() {
            return Err(PipelineError::ConfigurationError(
                "network.person_column and network.task_columns are required".to_string(),
            ));
        }

        let text_columns = self.text_columns();
        for (column, allowed) in &self.domains {
            for value in allowed {
                let canonical = self.canonical_value(column, value, &text_columns);
                if canonical.as_deref() != Some(value.as_str()) {
                    return Err(PipelineError::ConfigurationError(format!(
                        "domain value '{}' of {} is not in normalized form ('{}')",
                        value,
                        column,
                        canonical.unwrap_or_default()
                    )));
                }
            }
        }
        for (column, value) in self.resolved_fill_values() {
            if let Some(allowed) = self.domains.get(&column) {
                if !allowed.contains(&value) {
                    return Err(PipelineError::ConfigurationError(format!(
                        "fill value '{}' of {} is outside its domain",
                        value, column
                    )));
                }
            }
        }
        Ok(())
    }

    /// The form a raw value of `column` takes after the normalization stage.
    fn canonical_value(&self, column: &str, value: &str, text_columns: &[String]) -> Option<String> {
        let column = column.to_string();
        let mut canonical = if text_columns.contains(&column) {
            normalize_text(value)?
        } else {
            value.to_string()
        };
        if self.integer_columns.contains(&column) {
            if let Some(integer) = canonical_integer(&canonical) {
                canonical = integer;
            }
        }
        Some(canonical)
    }

    /// Fill values in their normalized form, for non-key columns only.
    pub fn resolved_fill_values(&self) -> BTreeMap<String, String> {
        let text_columns = self.text_columns();
        self.fill_values
            .iter()
            .filter(|(column, _)| !self.key_columns.contains(column))
            .filter_map(|(column, value)| {
                self.canonical_value(column, value, &text_columns)
                    .map(|v| (column.clone(), v))
            })
            .collect()
    }

    /// Columns that go through text normalization.
    pub fn text_columns(&self) -> Vec<String> {
        match &self.text_columns {
            Some(columns) => columns.clone(),
            None => self
                .expected_columns
                .iter()
                .filter(|c| !self.integer_columns.contains(c))
                .cloned()
                .collect(),
        }
    }

    /// Resolves an artifact name inside the processed-data directory.
    pub fn processed_path(&self, root: &Path, file_name: &str) -> PathBuf {
        root.join(&self.paths.data_processed).join(file_name)
    }

    /// Resolves an artifact name inside the reports directory.
    pub fn report_path(&self, root: &Path, file_name: &str) -> PathBuf {
        root.join(&self.paths.reports).join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
expected_columns = ["PERSONA", "TIPO DE SERVICIO", "NOMBRE DE LA TAREA", "AÑO", "MODALIDAD", "COMPLEJIDAD"]

[domains]
MODALIDAD = ["PRESENCIAL", "VIRTUAL"]
COMPLEJIDAD = ["BAJA", "MEDIA", "ALTA"]
"#;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.key_columns.len(), 5);
        assert_eq!(config.random_seed, 42);
    }

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let config = PipelineConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.null_policy, NullPolicy::Drop);
        assert_eq!(config.schema_policy, SchemaPolicy::Abort);
        assert_eq!(config.network.person_column, "PERSONA");
        assert_eq!(config.key_columns, default_key_columns());
        assert!(config.domains["MODALIDAD"].contains("VIRTUAL"));
    }

    #[test]
    fn test_text_columns_exclude_integer_columns() {
        let config = PipelineConfig::default();
        let text = config.text_columns();
        assert_eq!(text.len(), 5);
        assert!(!text.iter().any(|c| c == "AÑO"));
    }

    #[test]
    fn test_policies_parse_lowercase() {
        let toml = format!("null_policy = \"fill\"\nschema_policy = \"warn\"\n{}", MINIMAL);
        let config = PipelineConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.null_policy, NullPolicy::Fill);
        assert_eq!(config.schema_policy, SchemaPolicy::Warn);
    }

    #[test]
    fn test_empty_expected_columns_is_fatal() {
        let toml = "expected_columns = []\n[domains]\nMODALIDAD = [\"VIRTUAL\"]\n";
        let err = PipelineConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigurationError(_)));
    }

    #[test]
    fn test_missing_domains_is_fatal() {
        let toml = "expected_columns = [\"PERSONA\"]\n";
        assert!(PipelineConfig::from_toml_str(toml).is_err());

        let mut config = PipelineConfig::default();
        config.domains.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_normalized_domain_values_are_rejected() {
        let mut config = PipelineConfig::default();
        config.domains.insert(
            "MODALIDAD".to_string(),
            ["virtual".to_string()].into_iter().collect(),
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'virtual'"));

        let toml = MINIMAL.replace("\"VIRTUAL\"", "\"Virtual\"");
        assert!(PipelineConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_fill_values_are_normalized_and_checked_against_domains() {
        let mut config = PipelineConfig::default();
        config.fill_values.insert("COMPLEJIDAD".to_string(), " media ".to_string());
        config.fill_values.insert("PERSONA".to_string(), "ANONIMO".to_string());
        config.fill_values.insert("AÑO".to_string(), "2020.0".to_string());
        config.key_columns = vec!["PERSONA".to_string()];

        let resolved = config.resolved_fill_values();
        assert_eq!(resolved["COMPLEJIDAD"], "MEDIA");
        assert_eq!(resolved["AÑO"], "2020");
        assert!(!resolved.contains_key("PERSONA"));
        assert!(config.validate().is_ok());

        config.fill_values.insert("COMPLEJIDAD".to_string(), "extrema".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_allowed_set_is_accepted() {
        let mut config = PipelineConfig::default();
        config.domains.insert("EXTRA".to_string(), BTreeSet::new());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped = PipelineConfig::from_toml_str(include_str!("../config/pipeline.toml")).unwrap();
        let defaults = PipelineConfig::default();
        assert_eq!(shipped.expected_columns, defaults.expected_columns);
        assert_eq!(shipped.key_columns, defaults.key_columns);
        assert_eq!(shipped.domains, defaults.domains);
        assert_eq!(shipped.network, defaults.network);
        assert_eq!(shipped.summary, defaults.summary);
        assert_eq!(shipped.outputs, defaults.outputs);
    }

    #[test]
    fn test_from_file_missing() {
        let err = PipelineConfig::from_file("/nonexistent/pipeline.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
