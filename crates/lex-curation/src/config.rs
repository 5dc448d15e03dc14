//! Configuration types for the curation pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use crate::error::CurationError;
use crate::schema::Schema;
use crate::validation::CheckStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Policy for flagging statistical outliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Flag values outside [Q1 - t*IQR, Q3 + t*IQR]
    #[default]
    Iqr,
    /// Flag values whose |x - mean| / std exceeds t
    Zscore,
}

impl OutlierMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iqr => "iqr",
            Self::Zscore => "zscore",
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(Self::Iqr),
            "zscore" | "z-score" => Ok(Self::Zscore),
            other => Err(CurationError::InvalidConfiguration(format!(
                "unsupported outlier method '{}' (expected one of: iqr, zscore)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scaling policy applied to the scale set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMethod {
    /// Subtract mean, divide by population standard deviation
    #[default]
    Standard,
    /// Rescale to [0, 1] using the observed min and max
    MinMax,
    /// Subtract median, divide by the inter-quartile range
    Robust,
}

impl NormalizationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::MinMax => "minmax",
            Self::Robust => "robust",
        }
    }
}

impl FromStr for NormalizationMethod {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "minmax" | "min-max" => Ok(Self::MinMax),
            "robust" => Ok(Self::Robust),
            other => Err(CurationError::InvalidConfiguration(format!(
                "unsupported normalization method '{}' (expected one of: standard, minmax, robust)",
                other
            ))),
        }
    }
}

impl fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized representation of an exported artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Comma-delimited text with a header row
    Csv,
    /// JSON array of row records
    Json,
    /// Snappy-compressed Parquet
    Parquet,
    /// Per-column data dictionary (JSON)
    DataDictionary,
    /// Descriptive statistics of numeric columns (CSV)
    SummaryStatistics,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Parquet => "parquet",
            Self::DataDictionary => "data_dictionary",
            Self::SummaryStatistics => "summary_statistics",
        }
    }

    /// File extension used for the curated dataset in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv | Self::SummaryStatistics => "csv",
            Self::Json | Self::DataDictionary => "json",
            Self::Parquet => "parquet",
        }
    }

    /// Whether this format carries the curated rows themselves.
    pub fn is_dataset_format(&self) -> bool {
        matches!(self, Self::Csv | Self::Json | Self::Parquet)
    }
}

impl FromStr for ExportFormat {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "parquet" => Ok(Self::Parquet),
            other => Err(CurationError::InvalidConfiguration(format!(
                "unsupported export format '{}' (expected one of: csv, json, parquet)",
                other
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity assigned to a non-structural validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Warn,
    Fail,
}

impl Severity {
    pub fn status(&self) -> CheckStatus {
        match self {
            Self::Warn => CheckStatus::Warn,
            Self::Fail => CheckStatus::Fail,
        }
    }
}

/// Severity applied to each advisory validation check.
///
/// Missing required columns are always `FAIL` and are not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SeverityPolicy {
    pub row_count_mismatch: Severity,
    pub type_mismatch: Severity,
    pub missing_values: Severity,
    pub duplicates: Severity,
}

impl SeverityPolicy {
    /// Every finding fails the run.
    pub fn strict() -> Self {
        Self {
            row_count_mismatch: Severity::Fail,
            type_mismatch: Severity::Fail,
            missing_values: Severity::Fail,
            duplicates: Severity::Fail,
        }
    }
}

/// Identity of the person running the curation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CuratorInfo {
    pub name: String,
    pub institution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl CuratorInfo {
    pub fn new(name: impl Into<String>, institution: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            institution: institution.into(),
            contact: None,
        }
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }
}

/// Where the input dataset came from.
///
/// `title`, `source_url`, `acquisition_date` and `license` are recommended;
/// missing ones are warned about, never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DatasetSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_authors: Option<String>,
}

impl DatasetSource {
    /// Names of recommended fields that are absent or blank.
    pub fn missing_recommended_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("source_url", &self.source_url),
            ("acquisition_date", &self.acquisition_date),
            ("license", &self.license),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }

    /// Source metadata for the AI4I 2020 dataset on the UCI repository.
    pub fn ai4i_2020() -> Self {
        Self {
            title: Some("AI4I 2020 Predictive Maintenance Dataset".to_string()),
            source_url: Some("https://archive.ics.uci.edu/dataset/601".to_string()),
            acquisition_date: None,
            license: Some("CC BY 4.0".to_string()),
            doi: Some("10.24432/C5HS5C".to_string()),
            original_authors: Some("Stephan Matzka".to_string()),
        }
    }
}

/// Configuration for the curation pipeline.
///
/// Use [`CurationConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_curation::config::{CurationConfig, NormalizationMethod, OutlierMethod};
///
/// let config = CurationConfig::builder()
///     .outlier_method(OutlierMethod::Zscore)
///     .outlier_threshold(3.0)
///     .normalization(NormalizationMethod::Robust)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    /// Project name recorded in the provenance record.
    /// Default: "AI4I_2020_Curation"
    pub project_name: String,

    /// Base file name (without extension) of the curated dataset exports.
    /// Default: "AI4I_2020_curated"
    pub dataset_name: String,

    /// Output directory for every artifact, log and record.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Expected schema of the input dataset.
    /// Default: AI4I 2020 schema
    pub schema: Schema,

    /// Severity of advisory validation findings.
    /// Default: every finding is a warning
    pub severity: SeverityPolicy,

    /// Outlier detection policy.
    /// Default: Iqr
    pub outlier_method: OutlierMethod,

    /// Outlier threshold (IQR multiplier or z-score cut-off).
    /// Default: 1.5
    pub outlier_threshold: f64,

    /// Normalization policy for the scale set.
    /// Default: Standard
    pub normalization: NormalizationMethod,

    /// Continuous features subject to outlier detection and normalization.
    pub scale_set: Vec<String>,

    /// Dataset formats to export.
    /// Default: csv, json, parquet
    pub export_formats: Vec<ExportFormat>,

    /// Curator identity recorded in the provenance record.
    pub curator: Option<CuratorInfo>,

    /// Source metadata recorded in the provenance record.
    pub source: DatasetSource,
}

/// Default scale set of the AI4I 2020 dataset.
pub const DEFAULT_SCALE_SET: [&str; 5] = [
    "Air temperature [K]",
    "Process temperature [K]",
    "Rotational speed [rpm]",
    "Torque [Nm]",
    "Tool wear [min]",
];

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            project_name: "AI4I_2020_Curation".to_string(),
            dataset_name: "AI4I_2020_curated".to_string(),
            output_dir: PathBuf::from("output"),
            schema: Schema::ai4i_2020(),
            severity: SeverityPolicy::default(),
            outlier_method: OutlierMethod::default(),
            outlier_threshold: 1.5,
            normalization: NormalizationMethod::default(),
            scale_set: DEFAULT_SCALE_SET.iter().map(|s| s.to_string()).collect(),
            export_formats: vec![ExportFormat::Csv, ExportFormat::Json, ExportFormat::Parquet],
            curator: None,
            source: DatasetSource::ai4i_2020(),
        }
    }
}

impl CurationConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CurationConfigBuilder {
        CurationConfigBuilder::default()
    }

    /// Load a configuration from a JSON file.
    ///
    /// Fields that are absent keep their defaults. Unknown method names are
    /// reported as [`CurationError::InvalidConfiguration`].
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CurationError::InvalidConfiguration(format!(
                "cannot read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            CurationError::InvalidConfiguration(format!(
                "cannot parse config file {}: {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.outlier_threshold.is_finite() || self.outlier_threshold <= 0.0 {
            return Err(ConfigValidationError::InvalidThreshold(self.outlier_threshold));
        }

        if !self.export_formats.iter().any(ExportFormat::is_dataset_format) {
            return Err(ConfigValidationError::NoExportFormats);
        }

        if let Some(format) = self
            .export_formats
            .iter()
            .find(|f| !f.is_dataset_format())
        {
            return Err(ConfigValidationError::DocumentationFormat(*format));
        }

        if self.dataset_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyDatasetName);
        }

        if self.scale_set.is_empty() {
            return Err(ConfigValidationError::EmptyScaleSet);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid outlier threshold: {0} (must be a positive finite number)")]
    InvalidThreshold(f64),

    #[error("At least one dataset export format (csv, json, parquet) is required")]
    NoExportFormats,

    #[error("'{0}' is always exported; list only dataset formats (csv, json, parquet)")]
    DocumentationFormat(ExportFormat),

    #[error("Dataset name must not be empty")]
    EmptyDatasetName,

    #[error("Scale set must name at least one feature")]
    EmptyScaleSet,
}

impl From<ConfigValidationError> for CurationError {
    fn from(err: ConfigValidationError) -> Self {
        CurationError::InvalidConfiguration(err.to_string())
    }
}

/// Builder for [`CurationConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CurationConfigBuilder {
    project_name: Option<String>,
    dataset_name: Option<String>,
    output_dir: Option<PathBuf>,
    schema: Option<Schema>,
    severity: Option<SeverityPolicy>,
    outlier_method: Option<OutlierMethod>,
    outlier_threshold: Option<f64>,
    normalization: Option<NormalizationMethod>,
    scale_set: Option<Vec<String>>,
    export_formats: Option<Vec<ExportFormat>>,
    curator: Option<CuratorInfo>,
    source: Option<DatasetSource>,
}

impl CurationConfigBuilder {
    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Set the base file name of the curated dataset exports.
    pub fn dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }

    /// Set the output directory for artifacts, logs and records.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the expected schema.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the severity of advisory validation findings.
    pub fn severity(mut self, policy: SeverityPolicy) -> Self {
        self.severity = Some(policy);
        self
    }

    pub fn outlier_method(mut self, method: OutlierMethod) -> Self {
        self.outlier_method = Some(method);
        self
    }

    /// Set the outlier threshold.
    ///
    /// For [`OutlierMethod::Iqr`] this is the IQR multiplier (1.5 is the
    /// conventional fence); for [`OutlierMethod::Zscore`] the absolute
    /// standardized deviation above which a value is flagged.
    pub fn outlier_threshold(mut self, threshold: f64) -> Self {
        self.outlier_threshold = Some(threshold);
        self
    }

    pub fn normalization(mut self, method: NormalizationMethod) -> Self {
        self.normalization = Some(method);
        self
    }

    /// Set the continuous features subject to outlier detection and scaling.
    pub fn scale_set<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scale_set = Some(features.into_iter().map(Into::into).collect());
        self
    }

    /// Set the dataset formats to export.
    pub fn export_formats(mut self, formats: impl Into<Vec<ExportFormat>>) -> Self {
        self.export_formats = Some(formats.into());
        self
    }

    pub fn curator(mut self, curator: CuratorInfo) -> Self {
        self.curator = Some(curator);
        self
    }

    pub fn source(mut self, source: DatasetSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CurationConfig` or an error if validation fails.
    pub fn build(self) -> Result<CurationConfig, ConfigValidationError> {
        let defaults = CurationConfig::default();
        let config = CurationConfig {
            project_name: self.project_name.unwrap_or(defaults.project_name),
            dataset_name: self.dataset_name.unwrap_or(defaults.dataset_name),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            schema: self.schema.unwrap_or(defaults.schema),
            severity: self.severity.unwrap_or(defaults.severity),
            outlier_method: self.outlier_method.unwrap_or(defaults.outlier_method),
            outlier_threshold: self.outlier_threshold.unwrap_or(defaults.outlier_threshold),
            normalization: self.normalization.unwrap_or(defaults.normalization),
            scale_set: self.scale_set.unwrap_or(defaults.scale_set),
            export_formats: self.export_formats.unwrap_or(defaults.export_formats),
            curator: self.curator,
            source: self.source.unwrap_or(defaults.source),
        };

        config.validate()?;
        Ok(config)
    }
}
