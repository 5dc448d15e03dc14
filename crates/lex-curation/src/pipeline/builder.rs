//! Main curation pipeline.
//!
//! [`CurationPipeline`] runs the four stages in order:
//! validation, transformation, export, provenance. It stops at the first
//! fatal error; non-fatal conditions are collected as warnings and end up in
//! the provenance notes.

use crate::config::CurationConfig;
use crate::error::{CurationError, Result};
use crate::export::{ArtifactExporter, EXPORT_LOG_FILE, ExportArtifact};
use crate::pipeline::loader::{load_dataset, positive_rate};
use crate::pipeline::progress::{
    ClosureProgressReporter, CurationStage, ProgressReporter, ProgressUpdate,
};
use crate::provenance::{
    PROVENANCE_RECORD_FILE, PROVENANCE_SUMMARY_FILE, ProvenanceTracker, StepStatus,
};
use crate::transform::{FeatureTransformer, OutlierReport, ScalingParameters};
use crate::validation::{SchemaValidator, ValidationReport};
use polars::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub const TRANSFORMATION_LOG_FILE: &str = "transformation_log.json";

/// Column holding the failure label in the AI4I dataset.
const FAILURE_LABEL: &str = "Machine failure";

/// Failure rates below this share (percent) are noted as class imbalance.
const IMBALANCE_THRESHOLD: f64 = 10.0;

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct CurationOutcome {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub validation: ValidationReport,
    pub outliers: OutlierReport,
    pub scaling: ScalingParameters,
    pub artifacts: Vec<ExportArtifact>,
    pub warnings: Vec<String>,
    pub transformation_log: PathBuf,
    pub export_log: PathBuf,
    pub provenance_record: PathBuf,
    pub provenance_summary: PathBuf,
    pub duration_ms: u64,
    /// Curated dataset (scaled features plus derived features).
    #[serde(skip)]
    pub dataset: DataFrame,
}

/// In-memory results of loading, validation and transformation.
struct CuratedRun {
    raw: DataFrame,
    curated: DataFrame,
    validation: ValidationReport,
    outliers: OutlierReport,
    scaling: ScalingParameters,
    transformer: FeatureTransformer,
    derivation_skipped: bool,
    warnings: Vec<String>,
}

/// Log and record paths written by a successful run.
struct PublishedOutputs {
    transformation_log: PathBuf,
    export_log: PathBuf,
    provenance_record: PathBuf,
    provenance_summary: PathBuf,
}

/// The curation pipeline.
///
/// Use [`CurationPipeline::builder()`] to create a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use lex_curation::{CurationConfig, CurationPipeline};
///
/// let outcome = CurationPipeline::builder()
///     .config(CurationConfig::builder().output_dir("out").build()?)
///     .on_progress(|update| println!("{}", update.message))
///     .build()?
///     .run("data/ai4i2020.csv")?;
///
/// println!("{} artifacts written", outcome.artifacts.len());
/// ```
pub struct CurationPipeline {
    config: CurationConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// The pipeline may be moved to a worker thread
static_assertions::assert_impl_all!(CurationPipeline: Send);

impl CurationPipeline {
    pub fn builder() -> CurationPipelineBuilder {
        CurationPipelineBuilder::default()
    }

    pub fn config(&self) -> &CurationConfig {
        &self.config
    }

    /// Curate the CSV dataset at `input`.
    ///
    /// # Errors
    ///
    /// - [`CurationError::InputNotFound`] if `input` does not exist
    /// - [`CurationError::StructuralValidationFailure`] if validation reports
    ///   a `FAIL`; nothing is written in that case
    /// - I/O, Polars or JSON errors from any stage
    pub fn run(&self, input: impl AsRef<Path>) -> Result<CurationOutcome> {
        match self.run_internal(input.as_ref()) {
            Ok(outcome) => {
                self.report_progress(ProgressUpdate::complete("Curation completed successfully"));
                Ok(outcome)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Curation failed: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, input: &Path) -> Result<CurationOutcome> {
        let start_time = Instant::now();
        let mut run = self.curate(input)?;

        let mut exporter =
            ArtifactExporter::new(&self.config.output_dir, &self.config.dataset_name)?;
        let outputs = match self.publish(input, &mut run, &mut exporter) {
            Ok(outputs) => outputs,
            Err(e) => {
                let removed = exporter.discard();
                error!("Removed {} partial outputs after failure", removed);
                return Err(e);
            }
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Curation complete in {} ms: {} artifacts, {} warnings",
            duration_ms,
            exporter.artifacts().len(),
            run.warnings.len()
        );

        Ok(CurationOutcome {
            input: input.to_path_buf(),
            output_dir: self.config.output_dir.clone(),
            rows: run.curated.height(),
            columns: run.curated.width(),
            validation: run.validation,
            outliers: run.outliers,
            scaling: run.scaling,
            artifacts: exporter.artifacts().to_vec(),
            warnings: run.warnings,
            transformation_log: outputs.transformation_log,
            export_log: outputs.export_log,
            provenance_record: outputs.provenance_record,
            provenance_summary: outputs.provenance_summary,
            duration_ms,
            dataset: run.curated,
        })
    }

    /// Load, validate and transform. Nothing is written to disk.
    fn curate(&self, input: &Path) -> Result<CuratedRun> {
        let config = &self.config;
        let mut warnings: Vec<String> = Vec::new();

        // Step 1: Load
        info!("[1/5] Loading dataset from {}", input.display());
        self.report_progress(ProgressUpdate::new(
            CurationStage::Loading,
            0.0,
            "Loading dataset...",
        ));
        let raw = load_dataset(input)?;

        // Step 2: Validate
        info!("[2/5] Validating dataset structure...");
        self.report_progress(ProgressUpdate::new(
            CurationStage::Validation,
            0.0,
            "Validating dataset structure...",
        ));
        let validation = SchemaValidator::new(config.schema.clone())
            .with_policy(config.severity)
            .validate(&raw)?;

        if validation.is_fatal() {
            for message in validation.messages() {
                error!("Validation: {}", message);
            }
            return Err(CurationError::StructuralValidationFailure {
                failed_checks: validation.failed_checks(),
            });
        }
        for message in validation.messages() {
            warnings.push(CurationError::StructuralValidationWarning(message).to_string());
        }

        // Step 3: Transform
        info!("[3/5] Transforming features...");
        self.report_progress(ProgressUpdate::new(
            CurationStage::Transformation,
            0.0,
            "Detecting outliers...",
        ));
        let mut transformer = FeatureTransformer::new(config.scale_set.clone());
        let outliers =
            transformer.detect_outliers(&raw, config.outlier_method, config.outlier_threshold)?;

        self.report_progress(ProgressUpdate::new(
            CurationStage::Transformation,
            0.33,
            "Normalizing features...",
        ));
        let (scaled, scaling) = transformer.normalize(&raw, config.normalization)?;

        self.report_progress(ProgressUpdate::new(
            CurationStage::Transformation,
            0.66,
            "Deriving features...",
        ));
        let missing_sources = transformer.derived_columns().missing_in(&raw);
        let derivation_skipped = !missing_sources.is_empty();
        let curated = if derivation_skipped {
            let message = format!(
                "Feature derivation skipped; missing source columns: {}",
                missing_sources.join(", ")
            );
            warn!("{}", message);
            warnings.push(message);
            scaled
        } else {
            transformer.derive_features(&raw, &scaled)?
        };

        Ok(CuratedRun {
            raw,
            curated,
            validation,
            outliers,
            scaling,
            transformer,
            derivation_skipped,
            warnings,
        })
    }

    /// Export artifacts and logs, then record and persist provenance.
    ///
    /// Every file is written through `exporter` or registered with it, so the
    /// caller can discard all of them if this fails.
    fn publish(
        &self,
        input: &Path,
        run: &mut CuratedRun,
        exporter: &mut ArtifactExporter,
    ) -> Result<PublishedOutputs> {
        let config = &self.config;

        // Step 4: Export
        info!("[4/5] Exporting curated data...");
        let total = config.export_formats.len() + 2;

        for (i, format) in config.export_formats.iter().enumerate() {
            self.report_progress(ProgressUpdate::with_items(
                CurationStage::Export,
                i,
                total,
                format!("Exporting {}...", format),
            ));
            exporter.export(&run.curated, *format)?;
        }

        self.report_progress(ProgressUpdate::with_items(
            CurationStage::Export,
            total - 2,
            total,
            "Exporting documentation...",
        ));
        exporter.export_data_dictionary(&run.curated)?;
        exporter.export_summary_statistics(&run.curated)?;
        run.warnings.extend(exporter.warnings().iter().cloned());

        let export_log = exporter.save_export_log(EXPORT_LOG_FILE)?;
        let transformation_log = config.output_dir.join(TRANSFORMATION_LOG_FILE);
        exporter.track_file(&transformation_log);
        run.transformer.save_log(&transformation_log)?;

        // Step 5: Provenance
        info!("[5/5] Recording provenance...");
        self.report_progress(ProgressUpdate::new(
            CurationStage::Provenance,
            0.0,
            "Recording provenance...",
        ));
        let mut tracker = self.record_provenance(input, run, exporter)?;

        let provenance_record = config.output_dir.join(PROVENANCE_RECORD_FILE);
        let provenance_summary = config.output_dir.join(PROVENANCE_SUMMARY_FILE);
        exporter.track_file(&provenance_record);
        exporter.track_file(&provenance_summary);
        tracker.persist(&provenance_record)?;
        tracker.persist_summary(&provenance_summary)?;

        Ok(PublishedOutputs {
            transformation_log,
            export_log,
            provenance_record,
            provenance_summary,
        })
    }

    fn record_provenance(
        &self,
        input: &Path,
        run: &mut CuratedRun,
        exporter: &ArtifactExporter,
    ) -> Result<ProvenanceTracker> {
        let config = &self.config;
        let mut tracker = ProvenanceTracker::new(&config.project_name);

        let missing = tracker.record_source(config.source.clone());
        if !missing.is_empty() {
            run.warnings.push(format!(
                "Dataset source is missing recommended fields: {}",
                missing.join(", ")
            ));
        }
        match &config.curator {
            Some(curator) => tracker.record_curator(curator.clone()),
            None => warn!("No curator information configured"),
        }
        tracker.capture_environment();

        tracker.record_workflow_step(
            "data_loading",
            "Loaded input dataset from CSV",
            json!({
                "input": input.display().to_string(),
                "rows": run.raw.height(),
                "columns": run.raw.width(),
            }),
            StepStatus::Completed,
        );
        tracker.record_workflow_step(
            "structural_validation",
            "Validated column set, types, row count, completeness and duplicates",
            json!({
                "overall_status": run.validation.overall_status(),
                "expected_rows": config.schema.expected_rows,
            }),
            StepStatus::Completed,
        );
        tracker.record_workflow_step(
            "outlier_detection",
            "Flagged statistical outliers in the scale set",
            json!({
                "method": config.outlier_method,
                "threshold": config.outlier_threshold,
                "total_flagged": run.outliers.total_flagged(),
            }),
            StepStatus::Completed,
        );
        tracker.record_workflow_step(
            "normalization",
            "Scaled continuous features",
            json!({
                "method": config.normalization,
                "features": run.scaling.feature_names(),
            }),
            StepStatus::Completed,
        );
        tracker.record_workflow_step(
            "feature_derivation",
            "Computed derived features from unscaled values",
            json!({ "features_added": run.curated.width() - run.raw.width() }),
            if run.derivation_skipped {
                StepStatus::Skipped
            } else {
                StepStatus::Completed
            },
        );
        tracker.record_workflow_step(
            "export",
            "Exported curated dataset and documentation with checksums",
            json!({
                "formats": config.export_formats,
                "artifacts": exporter.artifacts().len(),
            }),
            StepStatus::Completed,
        );

        for record in run.transformer.records() {
            tracker.record_transformation(record);
        }

        tracker.record_quality_check(
            "structural_validation",
            serde_json::to_value(&run.validation)?,
            !run.validation.is_fatal(),
        );
        tracker.record_quality_check(
            "completeness_check",
            json!({
                "missing_values": run.validation.missing_values.total_missing,
                "total_records": run.raw.height(),
            }),
            run.validation.missing_values.total_missing == 0,
        );

        for artifact in exporter.artifacts() {
            tracker.record_export(artifact);
        }

        if let Some(rate) = positive_rate(&run.raw, FAILURE_LABEL)
            && rate < IMBALANCE_THRESHOLD
        {
            tracker.add_note(
                format!(
                    "Dataset exhibits class imbalance ({:.2}% failure rate). \
                     Apply appropriate techniques for imbalanced classification.",
                    rate
                ),
                "data_quality",
            );
        }
        for w in &run.warnings {
            tracker.add_note(w.clone(), "warning");
        }

        Ok(tracker)
    }
}

/// Builder for [`CurationPipeline`].
#[derive(Default)]
pub struct CurationPipelineBuilder {
    config: Option<CurationConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(CurationPipelineBuilder: Send);

impl CurationPipelineBuilder {
    pub fn config(mut self, config: CurationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a custom progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<CurationPipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(CurationPipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportFormat, OutlierMethod};
    use crate::schema::{ColumnType, Schema};
    use std::sync::Mutex;

    fn write_csv(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("input.csv");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn small_config(output_dir: &Path) -> CurationConfig {
        let schema = Schema::new(4)
            .with_column("id", ColumnType::Integer)
            .with_column("a", ColumnType::Float)
            .with_column("b", ColumnType::Float);
        CurationConfig::builder()
            .output_dir(output_dir)
            .dataset_name("small")
            .schema(schema)
            .scale_set(["a", "b"])
            .outlier_method(OutlierMethod::Zscore)
            .outlier_threshold(3.0)
            .export_formats([ExportFormat::Csv])
            .build()
            .unwrap()
    }

    const SMALL_CSV: &str = "id,a,b\n1,1.0,10.0\n2,2.0,20.0\n3,3.0,30.0\n4,4.0,40.0\n";

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = CurationConfig::default();
        config.outlier_threshold = -1.0;
        assert!(CurationPipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_missing_input_reports_failed_stage() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&stages);
        let dir = tempfile::tempdir().unwrap();

        let pipeline = CurationPipeline::builder()
            .config(small_config(dir.path()))
            .on_progress(move |u| sink.lock().unwrap().push(u.stage))
            .build()
            .unwrap();

        let err = pipeline.run(dir.path().join("missing.csv")).unwrap_err();
        assert_eq!(err.error_code(), "INPUT_NOT_FOUND");
        assert_eq!(stages.lock().unwrap().last(), Some(&CurationStage::Failed));
    }

    #[test]
    fn test_generic_schema_run_skips_derivation() {
        let input_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let input = write_csv(input_dir.path(), SMALL_CSV);

        let outcome = CurationPipeline::builder()
            .config(small_config(out_dir.path()))
            .build()
            .unwrap()
            .run(&input)
            .unwrap();

        assert_eq!(outcome.columns, 3);
        let names: Vec<&str> = outcome.artifacts.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["small.csv", "data_dictionary.json", "summary_statistics.csv"]
        );
        assert!(
            outcome
                .warnings
                .iter()
                .any(|w| w.starts_with("Feature derivation skipped"))
        );
        assert!(outcome.provenance_record.exists());
        assert!(outcome.provenance_summary.exists());
        assert!(outcome.transformation_log.exists());
        assert!(outcome.export_log.exists());

        let scaled = crate::utils::float_series(&outcome.dataset, "a").unwrap();
        assert!(crate::stats::mean(&scaled).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let input_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let output = out_dir.path().join("out");
        let input = write_csv(input_dir.path(), "id,a\n1,1.0\n2,2.0\n3,3.0\n4,4.0\n");

        let err = CurationPipeline::builder()
            .config(small_config(&output))
            .build()
            .unwrap()
            .run(&input)
            .unwrap_err();

        match err {
            CurationError::StructuralValidationFailure { failed_checks } => {
                assert_eq!(failed_checks, vec!["columns".to_string()]);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!output.exists());
    }

    fn remaining_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_failed_export_leaves_no_artifacts() {
        let input_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let input = write_csv(input_dir.path(), SMALL_CSV);
        // A directory where the JSON export should go makes the second write fail
        std::fs::create_dir(out_dir.path().join("small.json")).unwrap();

        let mut config = small_config(out_dir.path());
        config.export_formats = vec![ExportFormat::Csv, ExportFormat::Json];
        let err = CurationPipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .run(&input)
            .unwrap_err();

        assert_eq!(err.error_code(), "IO_ERROR");
        assert_eq!(remaining_entries(out_dir.path()), vec!["small.json".to_string()]);
    }

    #[test]
    fn test_failed_provenance_write_discards_exports_and_logs() {
        let input_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let input = write_csv(input_dir.path(), SMALL_CSV);
        std::fs::create_dir(out_dir.path().join(PROVENANCE_SUMMARY_FILE)).unwrap();

        let err = CurationPipeline::builder()
            .config(small_config(out_dir.path()))
            .build()
            .unwrap()
            .run(&input)
            .unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(
            remaining_entries(out_dir.path()),
            vec![PROVENANCE_SUMMARY_FILE.to_string()]
        );
    }
}
