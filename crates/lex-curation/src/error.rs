//! Error types for the curation pipeline.
//!
//! Every failure a run can hit is represented by [`CurationError`]. Some
//! variants are advisory: they are accumulated into reports and logs
//! instead of aborting the run (see [`CurationError::is_fatal`]).
//!
//! Errors serialize as `{ "code": ..., "message": ... }` so they can be
//! embedded in JSON outcomes and provenance notes.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the curation pipeline.
#[derive(Error, Debug)]
pub enum CurationError {
    /// The input dataset does not exist at the given path.
    #[error("Input dataset not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Structural validation reported a `FAIL` status.
    #[error("Structural validation failed: {}", failed_checks.join(", "))]
    StructuralValidationFailure { failed_checks: Vec<String> },

    /// Structural validation reported a non-fatal condition.
    #[error("Structural validation warning: {0}")]
    StructuralValidationWarning(String),

    /// Unsupported method name or otherwise unusable configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The encoder for an export format is not available in this build.
    #[error("Export format '{format}' unavailable: {reason}")]
    OptionalExportUnavailable { format: String, reason: String },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CurationError>,
    },
}

impl CurationError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CurationError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for machine consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InputNotFound(_) => "INPUT_NOT_FOUND",
            Self::StructuralValidationFailure { .. } => "STRUCTURAL_VALIDATION_FAILURE",
            Self::StructuralValidationWarning(_) => "STRUCTURAL_VALIDATION_WARNING",
            Self::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            Self::OptionalExportUnavailable { .. } => "OPTIONAL_EXPORT_UNAVAILABLE",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error must abort the run.
    ///
    /// Warnings and unavailable optional encoders are recorded and the run
    /// continues; everything else stops at the stage where it occurred.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::StructuralValidationWarning(_) | Self::OptionalExportUnavailable { .. } => false,
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => true,
        }
    }
}

impl Serialize for CurationError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CurationError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for curation operations.
pub type Result<T> = std::result::Result<T, CurationError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CurationError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::io::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CurationError::Io(e).with_context(context))
    }
}
