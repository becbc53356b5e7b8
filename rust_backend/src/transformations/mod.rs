//! Dataset cleaning transformations.
//!
//! This module turns a raw event-log [`Dataset`](crate::core::domain::Dataset)
//! into a clean one through a fixed sequence of stages, each recorded in a
//! [`CleaningLog`].
//!
//! # Modules
//!
//! - [`normalization`]: Canonical text form (upper case, no diacritics, collapsed whitespace)
//! - [`filtering`]: Remove rows outside the categorical domains
//! - [`cleaning`]: Deduplication, null handling and the stage orchestration
//!
//! # Example
//!
//! ```no_run
//! use service_network::config::PipelineConfig;
//! use service_network::logging::RunLog;
//! use service_network::parsing::parse_dataset_csv;
//! use service_network::transformations::clean_data_pipeline;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), service_network::core::PipelineError> {
//! let config = PipelineConfig::default();
//! let raw = parse_dataset_csv(Path::new("data/raw/eventos.csv"))?;
//! let mut log = RunLog::new();
//!
//! let (cleaned, cleaning_log) = clean_data_pipeline(raw, &config, &mut log)?;
//! println!("{} rows kept, {} removed", cleaned.height(), cleaning_log.rows_removed());
//! # Ok(())
//! # }
//! ```

pub mod cleaning;
pub mod filtering;
pub mod normalization;

pub use cleaning::{
    clean_data_pipeline, handle_missing_values, remove_duplicates, CleaningLog, CleaningStep,
};
pub use filtering::filter_by_domain;
pub use normalization::{normalize_columns, normalize_text};
