//! Parsers for the event-log input format.
//!
//! # Parsers
//!
//! - [`csv_parser`]: Read header-labeled CSV into a [`Dataset`](crate::core::domain::Dataset)
//!   and write it back
//!
//! # Example
//!
//! ```no_run
//! use service_network::parsing::csv_parser::parse_dataset_csv;
//! use std::path::Path;
//!
//! let dataset = parse_dataset_csv(Path::new("eventos.csv"))
//!     .expect("Failed to parse event log");
//! println!("{} rows", dataset.height());
//! ```

pub mod csv_parser;


pub use csv_parser::{parse_dataset_csv, parse_dataset_csv_str, write_dataset_csv};
