//! High-level input and output utilities.
//!
//! Loaders combine parsing with format detection, error context and input
//! checksums; exporters write every artifact of a run.
//!
//! # Example
//!
//! ```no_run
//! use service_network::io::loaders::DatasetLoader;
//! use std::path::Path;
//!
//! let result = DatasetLoader::load_from_file(Path::new("data/raw/eventos.csv"))
//!     .expect("Failed to load");
//! println!("Loaded {} rows (sha256 {})", result.num_rows, result.checksum);
//! ```

pub mod exporters;
pub mod loaders;


pub use exporters::{
    export_category_counts, export_cleaning_log, export_histogram, export_metrics_summary,
    export_network_data, export_run_log, export_validation_reports,
};
pub use loaders::{
    find_data_file, profile_dataset, DatasetLoadResult, DatasetLoader, DatasetProfile,
    DatasetSourceType,
};
