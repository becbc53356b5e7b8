//! Core domain models and error types for the service-network pipeline.
//!
//! This module defines the tabular dataset that every stage consumes, the typed
//! event record, and the error type shared by the whole crate.

pub mod domain;
pub mod error;

pub use domain::{Cell, Dataset, DatasetStats, TabularRecord};
pub use error::{PipelineError, PipelineResult};
