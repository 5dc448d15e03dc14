//! Dataset Curation Library
//!
//! Validation, reproducible transformation, integrity-checked export and
//! provenance recording for fixed-schema tabular datasets, built on Polars.
//!
//! # Overview
//!
//! A curation run flows through four components:
//!
//! - **Validation**: [`SchemaValidator`] checks column set, types, row count,
//!   completeness and duplicates against a [`Schema`]
//! - **Transformation**: [`FeatureTransformer`] flags outliers, scales the
//!   continuous features with invertible parameters and derives new features
//! - **Export**: [`ArtifactExporter`] writes CSV, JSON and Parquet plus a data
//!   dictionary and summary statistics, each with a SHA-256 checksum
//! - **Provenance**: [`ProvenanceTracker`] records source, curator,
//!   environment, workflow steps, transformations, quality checks and exports
//!
//! [`CurationPipeline`] runs them in order and stops on the first fatal error.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_curation::{CurationConfig, CurationPipeline, CuratorInfo, NormalizationMethod};
//!
//! let config = CurationConfig::builder()
//!     .output_dir("output")
//!     .normalization(NormalizationMethod::Robust)
//!     .curator(CuratorInfo::new("Ada Lovelace", "Analytical Engines Ltd"))
//!     .build()?;
//!
//! let outcome = CurationPipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run("data/ai4i2020.csv")?;
//!
//! for artifact in &outcome.artifacts {
//!     println!("{} {}", artifact.checksum_sha256, artifact.filename);
//! }
//! ```
//!
//! # Using the components directly
//!
//! ```rust,ignore
//! use lex_curation::{FeatureTransformer, NormalizationMethod, OutlierMethod};
//!
//! let mut transformer = FeatureTransformer::default();
//! let outliers = transformer.detect_outliers(&df, OutlierMethod::Iqr, 1.5)?;
//! let (scaled, params) = transformer.normalize(&df, NormalizationMethod::Standard)?;
//! let restored = transformer.inverse_scaling(&scaled, &params)?;
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod provenance;
pub mod schema;
pub mod stats;
pub mod transform;
pub mod utils;
pub mod validation;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, CurationConfig, CurationConfigBuilder, CuratorInfo, DatasetSource,
    ExportFormat, NormalizationMethod, OutlierMethod, Severity, SeverityPolicy,
};
pub use error::{CurationError, Result as CurationResult, ResultExt};
pub use export::{ArtifactExporter, ExportArtifact, ExportLog};
pub use pipeline::{
    ClosureProgressReporter, CurationOutcome, CurationPipeline, CurationPipelineBuilder,
    CurationStage, ProgressReporter, ProgressUpdate, load_dataset,
};
pub use provenance::{ProvenanceRecord, ProvenanceTracker, StepStatus, TrackerState};
pub use schema::{ColumnSpec, ColumnType, Schema};
pub use transform::{
    FeatureTransformer, FlaggedRows, OutlierReport, ScaleParams, ScalingParameters,
    TransformationOperation, TransformationRecord,
};
pub use validation::{CheckStatus, SchemaValidator, ValidationReport};
