//! Service network ETL.
//!
//! Validates and cleans a person / service event log, builds the bipartite
//! person-service network and its weighted client-client projection, and
//! computes structural metrics over both.
//!
//! ```no_run
//! use service_network::config::PipelineConfig;
//! use service_network::logging::RunLog;
//! use service_network::preprocessing::EtlPipeline;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let pipeline = EtlPipeline::new(PipelineConfig::from_default_location()?)?;
//! let mut log = RunLog::new();
//! let output = pipeline.run_from_file(Path::new("data/raw/eventos.csv"), &mut log)?;
//! pipeline.export(&output, Path::new("."), &mut log)?;
//! # Ok(())
//! # }
//! ```

pub mod algorithms;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod network;
pub mod parsing;
pub mod preprocessing;
pub mod transformations;
