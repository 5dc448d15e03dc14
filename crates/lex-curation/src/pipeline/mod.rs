//! Curation pipeline module.
//!
//! This module contains the orchestrator and its supporting pieces:
//! - `builder`: [`CurationPipeline`] and its builder
//! - `loader`: CSV input
//! - `progress`: progress reporting

mod builder;
mod loader;
pub mod progress;

pub use builder::{
    CurationOutcome, CurationPipeline, CurationPipelineBuilder, TRANSFORMATION_LOG_FILE,
};
pub use loader::{INFER_SCHEMA_ROWS, load_dataset, positive_rate};
pub use progress::{
    ClosureProgressReporter, CurationStage, ProgressReporter, ProgressUpdate,
};
