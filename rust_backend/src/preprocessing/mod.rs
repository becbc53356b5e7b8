//! Validation and end-to-end orchestration.
//!
//! - [`validator`]: schema, domain, duplicate and null checks producing a [`ValidationReport`]
//! - [`pipeline`]: [`EtlPipeline`], which chains validation, cleaning, network construction and metrics

pub mod pipeline;
pub mod validator;

pub use pipeline::{run_pipeline, EtlPipeline, PipelineOutput};
pub use validator::{
    full_validation, DatasetValidator, FindingCategory, Severity, ValidationFinding,
    ValidationReport, ValidationStats,
};
