//! Feature transformation module.
//!
//! [`FeatureTransformer`] detects outliers, scales a fixed set of continuous
//! features and computes derived features. Every operation returns a new
//! `DataFrame` and appends a timestamped [`TransformationRecord`] to the
//! transformer's log.

mod derive;
mod outliers;
mod scaling;

pub use derive::{
    DerivedFeature, DerivedFeatureColumns, POWER_ESTIMATE, TEMP_DIFFERENCE, TOOL_WEAR_CATEGORY,
    power_estimate, tool_wear_category,
};
pub use outliers::{FeatureOutliers, FlaggedRows, MAX_LISTED_OUTLIERS, OutlierReport};
pub use scaling::{FeatureScaling, ScaleParams, ScalingParameters};

use crate::config::{DEFAULT_SCALE_SET, NormalizationMethod, OutlierMethod};
use crate::error::{CurationError, Result, ResultExt};
use crate::utils::timestamp;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, warn};

/// One entry of the transformation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationRecord {
    pub timestamp: String,
    #[serde(flatten)]
    pub operation: TransformationOperation,
}

/// Operation-specific parameters of a transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum TransformationOperation {
    OutlierDetection {
        method: OutlierMethod,
        threshold: f64,
        results: Vec<FeatureOutliers>,
    },
    Normalization {
        method: NormalizationMethod,
        features: Vec<String>,
        parameters: Vec<FeatureScaling>,
    },
    FeatureDerivation {
        features: Vec<DerivedFeature>,
    },
}

impl TransformationOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OutlierDetection { .. } => "outlier_detection",
            Self::Normalization { .. } => "normalization",
            Self::FeatureDerivation { .. } => "feature_derivation",
        }
    }
}

/// Applies reproducible transformations to the scale set.
#[derive(Debug, Clone)]
pub struct FeatureTransformer {
    scale_set: Vec<String>,
    derived_columns: DerivedFeatureColumns,
    records: Vec<TransformationRecord>,
}

impl Default for FeatureTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE_SET.iter().map(|s| s.to_string()).collect())
    }
}

impl FeatureTransformer {
    pub fn new(scale_set: Vec<String>) -> Self {
        Self {
            scale_set,
            derived_columns: DerivedFeatureColumns::default(),
            records: Vec::new(),
        }
    }

    pub fn with_derived_columns(mut self, columns: DerivedFeatureColumns) -> Self {
        self.derived_columns = columns;
        self
    }

    pub fn derived_columns(&self) -> &DerivedFeatureColumns {
        &self.derived_columns
    }

    pub fn scale_set(&self) -> &[String] {
        &self.scale_set
    }

    /// Transformation log, oldest first.
    pub fn records(&self) -> &[TransformationRecord] {
        &self.records
    }

    fn record(&mut self, operation: TransformationOperation) {
        self.records.push(TransformationRecord {
            timestamp: timestamp(),
            operation,
        });
    }

    /// Flag outliers in every scale-set feature. The dataset is not modified.
    pub fn detect_outliers(
        &mut self,
        df: &DataFrame,
        method: OutlierMethod,
        threshold: f64,
    ) -> Result<OutlierReport> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(CurationError::InvalidConfiguration(format!(
                "outlier threshold must be positive, got {}",
                threshold
            )));
        }

        info!(
            "Detecting outliers in {} features ({}, threshold {})",
            self.scale_set.len(),
            method,
            threshold
        );
        let report = outliers::detect(df, &self.scale_set, method, threshold)?;
        info!("Flagged {} outlier values", report.total_flagged());

        self.record(TransformationOperation::OutlierDetection {
            method,
            threshold,
            results: report.features.clone(),
        });
        Ok(report)
    }

    /// Fit `method` on the scale set and return the scaled dataset.
    pub fn normalize(
        &mut self,
        df: &DataFrame,
        method: NormalizationMethod,
    ) -> Result<(DataFrame, ScalingParameters)> {
        info!(
            "Normalizing {} features ({})",
            self.scale_set.len(),
            method
        );
        let (scaled, parameters) = scaling::fit_transform(df, &self.scale_set, method)?;

        for f in &parameters.features {
            if f.params.spread() == 0.0 {
                warn!(
                    "Feature '{}' has zero spread; scaled by 1 instead",
                    f.feature
                );
            }
        }

        self.record(TransformationOperation::Normalization {
            method,
            features: parameters.feature_names(),
            parameters: parameters.features.clone(),
        });
        Ok((scaled, parameters))
    }

    /// Like [`normalize`](Self::normalize), with the method given by name.
    ///
    /// An unknown name fails with `InvalidConfiguration` before any data is read.
    pub fn normalize_named(
        &mut self,
        df: &DataFrame,
        method: &str,
    ) -> Result<(DataFrame, ScalingParameters)> {
        let method: NormalizationMethod = method.parse()?;
        self.normalize(df, method)
    }

    /// Re-apply recorded parameters without refitting.
    pub fn apply_scaling(&self, df: &DataFrame, parameters: &ScalingParameters) -> Result<DataFrame> {
        scaling::apply(df, parameters)
    }

    /// Undo a scaling pass, reconstructing the original values.
    pub fn inverse_scaling(
        &self,
        df: &DataFrame,
        parameters: &ScalingParameters,
    ) -> Result<DataFrame> {
        scaling::invert(df, parameters)
    }

    /// Compute derived features from the pre-scaling `raw` values and append
    /// them to `base`.
    pub fn derive_features(&mut self, raw: &DataFrame, base: &DataFrame) -> Result<DataFrame> {
        let features = self.derived_columns.describe();
        info!("Deriving {} features", features.len());

        let out = derive::derive(raw, base, &self.derived_columns)?;
        self.record(TransformationOperation::FeatureDerivation { features });
        Ok(out)
    }

    /// Human-readable summary of the log.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&"=".repeat(70));
        out.push_str("\nTRANSFORMATION SUMMARY\n");
        out.push_str(&"=".repeat(70));
        out.push_str(&format!("\nTotal transformations: {}\n", self.records.len()));

        for (i, record) in self.records.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {} ({})\n",
                i + 1,
                record.operation.name(),
                record.timestamp
            ));
            match &record.operation {
                TransformationOperation::OutlierDetection {
                    method,
                    threshold,
                    results,
                } => {
                    out.push_str(&format!("   Method: {} (threshold {})\n", method, threshold));
                    for r in results {
                        out.push_str(&format!(
                            "   {}: {} outliers ({:.2}%)\n",
                            r.feature, r.count, r.percentage
                        ));
                    }
                }
                TransformationOperation::Normalization {
                    method, parameters, ..
                } => {
                    out.push_str(&format!("   Method: {}\n", method));
                    for p in parameters {
                        out.push_str(&format!(
                            "   {}: center={:.4}, spread={:.4}\n",
                            p.feature,
                            p.params.center(),
                            p.params.spread()
                        ));
                    }
                }
                TransformationOperation::FeatureDerivation { features } => {
                    for f in features {
                        out.push_str(&format!("   {} = {}\n", f.name, f.formula));
                    }
                }
            }
        }
        out.push_str(&"=".repeat(70));
        out.push('\n');
        out
    }

    /// Write the log as a JSON list of records.
    pub fn save_log(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).context(format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.records)?;
        info!("Transformation log saved to {}", path.display());
        Ok(())
    }
}
