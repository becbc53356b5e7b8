//! Service network ETL binary
//!
//! Runs validation, cleaning, network construction and metrics on one raw
//! event file and writes every artifact under the project root.
//!
//! # Usage
//!
//! ```bash
//! # Detect the input in <root>/data/raw
//! cargo run --bin network-etl
//!
//! # Explicit input file
//! cargo run --bin network-etl -- data/raw/eventos.csv
//! ```
//!
//! # Environment Variables
//!
//! - `PIPELINE_CONFIG`: Path to pipeline.toml (default: standard locations)
//! - `PROJECT_ROOT`: Root for data and report directories (default: .)
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::path::PathBuf;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use service_network::config::PipelineConfig;
use service_network::logging::RunLog;
use service_network::preprocessing::EtlPipeline;

fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .init();

    let config = match env::var("PIPELINE_CONFIG") {
        Ok(path) => PipelineConfig::from_file(&path),
        Err(_) => PipelineConfig::from_default_location(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(anyhow::Error::new(e).context("Failed to load pipeline configuration"));
        }
    };

    let root = PathBuf::from(env::var("PROJECT_ROOT").unwrap_or_else(|_| ".".to_string()));
    let pipeline = match EtlPipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{}", e);
            return Err(anyhow::Error::new(e).context("Invalid pipeline configuration"));
        }
    };
    let mut run_log = RunLog::new();
    let input = env::args().nth(1).map(PathBuf::from);

    let (output, written) = match pipeline.execute(&root, input.as_deref(), &mut run_log) {
        Ok(result) => result,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };

    for path in &written {
        info!("Wrote {}", path.display());
    }
    info!(
        "Done: {} rows kept, {} persons, {} projection edges",
        output.cleaned.height(),
        output.metrics.projection.node_count,
        output.metrics.projection.edge_count
    );
    Ok(())
}
