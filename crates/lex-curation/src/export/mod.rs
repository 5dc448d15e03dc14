//! Artifact export module.
//!
//! [`ArtifactExporter`] writes the curated dataset and its documentation into
//! an output directory. Every file it writes is checksummed by streaming it
//! through SHA-256 and logged as an [`ExportArtifact`].

mod checksum;
mod dictionary;

pub use checksum::{CHUNK_SIZE, sha256_bytes, sha256_file};
pub use dictionary::{
    DictionaryEntry, NumericSummary, TOP_VALUES, ValueCount, build_dictionary, summary_statistics,
    top_value_counts,
};

use crate::config::ExportFormat;
use crate::error::{CurationError, Result, ResultExt};
use crate::utils::timestamp;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DATA_DICTIONARY_FILE: &str = "data_dictionary.json";
pub const SUMMARY_STATISTICS_FILE: &str = "summary_statistics.csv";
pub const EXPORT_LOG_FILE: &str = "export_log.json";

/// One exported file and its integrity checksum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub filename: String,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub size_bytes: u64,
    pub checksum_sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    pub timestamp: String,
}

impl ExportArtifact {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Contents of `export_log.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportLog {
    pub timestamp: String,
    pub output_dir: PathBuf,
    pub artifacts: Vec<ExportArtifact>,
    pub warnings: Vec<String>,
}

/// Writes curated datasets and documentation, tracking every artifact.
#[derive(Debug)]
pub struct ArtifactExporter {
    output_dir: PathBuf,
    dataset_name: String,
    artifacts: Vec<ExportArtifact>,
    warnings: Vec<String>,
    /// Non-artifact files written into `output_dir` (logs, records).
    side_files: Vec<PathBuf>,
    created_dir: bool,
}

impl ArtifactExporter {
    /// Create an exporter, creating `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>, dataset_name: impl Into<String>) -> Result<Self> {
        let output_dir = output_dir.into();
        let created_dir = !output_dir.exists();
        fs::create_dir_all(&output_dir)
            .context(format!("creating output directory {}", output_dir.display()))?;
        Ok(Self {
            output_dir,
            dataset_name: dataset_name.into(),
            artifacts: Vec::new(),
            warnings: Vec::new(),
            side_files: Vec::new(),
            created_dir,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Artifacts written so far, in write order.
    pub fn artifacts(&self) -> &[ExportArtifact] {
        &self.artifacts
    }

    /// Non-fatal export conditions (e.g. an unavailable encoder).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Export `df` in one format.
    ///
    /// Returns `Ok(None)` when the format's encoder is not available in this
    /// build; the condition is recorded as a warning instead.
    pub fn export(&mut self, df: &DataFrame, format: ExportFormat) -> Result<Option<ExportArtifact>> {
        let result = match format {
            ExportFormat::Csv => self.export_csv(df),
            ExportFormat::Json => self.export_json(df),
            ExportFormat::Parquet => self.export_parquet(df),
            ExportFormat::DataDictionary => self.export_data_dictionary(df),
            ExportFormat::SummaryStatistics => self.export_summary_statistics(df),
        };

        match result {
            Ok(artifact) => Ok(Some(artifact)),
            Err(e) if !e.is_fatal() => {
                warn!("Skipping {} export: {}", format, e);
                self.warnings.push(e.to_string());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Export `df` in each format, skipping unavailable ones.
    pub fn export_all(
        &mut self,
        df: &DataFrame,
        formats: &[ExportFormat],
    ) -> Result<Vec<ExportArtifact>> {
        let mut written = Vec::with_capacity(formats.len());
        for format in formats {
            if let Some(artifact) = self.export(df, *format)? {
                written.push(artifact);
            }
        }
        Ok(written)
    }

    fn dataset_filename(&self, format: ExportFormat) -> String {
        format!("{}.{}", self.dataset_name, format.extension())
    }

    pub fn export_csv(&mut self, df: &DataFrame) -> Result<ExportArtifact> {
        let filename = self.dataset_filename(ExportFormat::Csv);
        let mut df = df.clone();
        self.write_artifact(ExportFormat::Csv, &filename, df.shape(), None, |file| {
            CsvWriter::new(file)
                .include_header(true)
                .with_separator(b',')
                .finish(&mut df)?;
            Ok(())
        })
    }

    /// JSON array of row records.
    pub fn export_json(&mut self, df: &DataFrame) -> Result<ExportArtifact> {
        let filename = self.dataset_filename(ExportFormat::Json);
        let mut df = df.clone();
        self.write_artifact(ExportFormat::Json, &filename, df.shape(), None, |file| {
            JsonWriter::new(file)
                .with_json_format(JsonFormat::Json)
                .finish(&mut df)?;
            Ok(())
        })
    }

    /// Snappy-compressed Parquet.
    #[cfg(feature = "parquet")]
    pub fn export_parquet(&mut self, df: &DataFrame) -> Result<ExportArtifact> {
        let filename = self.dataset_filename(ExportFormat::Parquet);
        let mut df = df.clone();
        self.write_artifact(
            ExportFormat::Parquet,
            &filename,
            df.shape(),
            Some("snappy".to_string()),
            |file| {
                ParquetWriter::new(file)
                    .with_compression(ParquetCompression::Snappy)
                    .finish(&mut df)?;
                Ok(())
            },
        )
    }

    #[cfg(not(feature = "parquet"))]
    pub fn export_parquet(&mut self, _df: &DataFrame) -> Result<ExportArtifact> {
        Err(CurationError::OptionalExportUnavailable {
            format: ExportFormat::Parquet.to_string(),
            reason: "built without the `parquet` feature".to_string(),
        })
    }

    /// Per-column data dictionary as JSON.
    pub fn export_data_dictionary(&mut self, df: &DataFrame) -> Result<ExportArtifact> {
        let entries = build_dictionary(df)?;
        let shape = (entries.len(), df.width());
        self.write_artifact(
            ExportFormat::DataDictionary,
            DATA_DICTIONARY_FILE,
            shape,
            None,
            |file| {
                serde_json::to_writer_pretty(&mut *file, &entries)?;
                Ok(())
            },
        )
    }

    /// Descriptive statistics of the numeric columns as CSV.
    pub fn export_summary_statistics(&mut self, df: &DataFrame) -> Result<ExportArtifact> {
        let mut summary = summary_statistics(df)?;
        self.write_artifact(
            ExportFormat::SummaryStatistics,
            SUMMARY_STATISTICS_FILE,
            summary.shape(),
            None,
            |file| {
                CsvWriter::new(file)
                    .include_header(true)
                    .with_separator(b',')
                    .finish(&mut summary)?;
                Ok(())
            },
        )
    }

    /// Create `filename`, fill it with `write`, then checksum and log it.
    ///
    /// A failed write removes the partial file.
    fn write_artifact<F>(
        &mut self,
        format: ExportFormat,
        filename: &str,
        (rows, columns): (usize, usize),
        compression: Option<String>,
        write: F,
    ) -> Result<ExportArtifact>
    where
        F: FnOnce(&mut BufWriter<File>) -> Result<()>,
    {
        let path = self.output_dir.join(filename);
        debug!("Writing {} artifact to {}", format, path.display());

        let written = File::create(&path)
            .map_err(CurationError::from)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                write(&mut writer)?;
                writer.flush()?;
                Ok(())
            })
            .context(format!("writing {}", path.display()));

        if let Err(e) = written {
            if path.exists()
                && let Err(rm) = fs::remove_file(&path)
            {
                warn!("Could not remove partial file {}: {}", path.display(), rm);
            }
            return Err(e);
        }

        let size_bytes = fs::metadata(&path)
            .context(format!("reading metadata of {}", path.display()))?
            .len();
        let checksum_sha256 = sha256_file(&path)?;

        let artifact = ExportArtifact {
            format,
            filename: filename.to_string(),
            path,
            rows,
            columns,
            size_bytes,
            checksum_sha256,
            compression,
            timestamp: timestamp(),
        };

        info!(
            "Exported {} ({:.2} MB, sha256 {})",
            artifact.filename,
            artifact.size_mb(),
            &artifact.checksum_sha256[..16]
        );
        self.artifacts.push(artifact.clone());
        Ok(artifact)
    }

    /// Recompute an artifact's checksum and compare it to the recorded one.
    pub fn verify_artifact(&self, artifact: &ExportArtifact) -> Result<bool> {
        let actual = sha256_file(&artifact.path)?;
        let ok = actual == artifact.checksum_sha256;
        if !ok {
            warn!(
                "Checksum mismatch for {}: recorded {}, actual {}",
                artifact.filename, artifact.checksum_sha256, actual
            );
        }
        Ok(ok)
    }

    /// Register a file written into the output directory by another
    /// component so [`discard`](Self::discard) removes it too.
    pub fn track_file(&mut self, path: impl Into<PathBuf>) {
        self.side_files.push(path.into());
    }

    /// Remove every artifact and tracked file written so far.
    ///
    /// Used when a run fails after exporting started, so no unlabeled output
    /// is left behind. The output directory itself is removed when this
    /// exporter created it and it is empty afterwards. Returns the number of
    /// files removed.
    pub fn discard(&mut self) -> usize {
        let paths: Vec<PathBuf> = self
            .artifacts
            .drain(..)
            .map(|a| a.path)
            .chain(self.side_files.drain(..))
            .collect();

        let mut removed = 0;
        for path in paths {
            if !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }

        if self.created_dir && fs::remove_dir(&self.output_dir).is_ok() {
            debug!("Removed empty output directory {}", self.output_dir.display());
        }
        warn!(
            "Discarded {} files from {}",
            removed,
            self.output_dir.display()
        );
        removed
    }

    /// Write the export log into the output directory.
    pub fn save_export_log(&mut self, filename: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        let log = ExportLog {
            timestamp: timestamp(),
            output_dir: self.output_dir.clone(),
            artifacts: self.artifacts.clone(),
            warnings: self.warnings.clone(),
        };
        let file = File::create(&path).context(format!("creating {}", path.display()))?;
        self.side_files.push(path.clone());
        serde_json::to_writer_pretty(BufWriter::new(file), &log)?;
        info!("Export log saved to {}", path.display());
        Ok(path)
    }

    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&"=".repeat(70));
        out.push_str("\nEXPORT SUMMARY\n");
        out.push_str(&"=".repeat(70));
        out.push_str(&format!("\nOutput directory: {}\n", self.output_dir.display()));
        out.push_str(&format!("Total artifacts: {}\n\n", self.artifacts.len()));

        for artifact in &self.artifacts {
            out.push_str(&format!("{}:\n", artifact.format.as_str().to_uppercase()));
            out.push_str(&format!("  File: {}\n", artifact.filename));
            out.push_str(&format!(
                "  Shape: {} rows x {} columns\n",
                artifact.rows, artifact.columns
            ));
            out.push_str(&format!("  Size: {:.2} MB\n", artifact.size_mb()));
            if let Some(codec) = &artifact.compression {
                out.push_str(&format!("  Compression: {}\n", codec));
            }
            out.push_str(&format!("  SHA-256: {}\n", artifact.checksum_sha256));
        }

        if !self.warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for w in &self.warnings {
                out.push_str(&format!("  - {}\n", w));
            }
        }
        out.push_str(&"=".repeat(70));
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df![
            "id" => [1i64, 2, 3],
            "value" => [0.5f64, 1.5, 2.5],
            "label" => ["a", "b", "a"],
        ]
        .unwrap()
    }

    #[test]
    fn test_csv_export_round_trip_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ArtifactExporter::new(dir.path(), "curated").unwrap();
        let df = sample_df();

        let artifact = exporter.export_csv(&df).unwrap();
        assert_eq!(artifact.filename, "curated.csv");
        assert_eq!((artifact.rows, artifact.columns), (3, 3));
        assert_eq!(artifact.checksum_sha256.len(), 64);
        assert!(exporter.verify_artifact(&artifact).unwrap());

        let bytes = fs::read(&artifact.path).unwrap();
        assert_eq!(artifact.size_bytes, bytes.len() as u64);
        assert_eq!(artifact.checksum_sha256, sha256_bytes(&bytes));

        let back = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(artifact.path.clone()))
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(back.shape(), df.shape());
        assert_eq!(crate::utils::column_names(&back), crate::utils::column_names(&df));
    }

    #[test]
    fn test_tampered_artifact_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ArtifactExporter::new(dir.path(), "curated").unwrap();
        let artifact = exporter.export_json(&sample_df()).unwrap();

        fs::write(&artifact.path, b"[]").unwrap();
        assert!(!exporter.verify_artifact(&artifact).unwrap());
    }

    #[test]
    fn test_json_export_is_array_of_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ArtifactExporter::new(dir.path(), "curated").unwrap();
        let artifact = exporter.export_json(&sample_df()).unwrap();

        let content = fs::read_to_string(&artifact.path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1]["label"], "b");
    }

    #[cfg(feature = "parquet")]
    #[test]
    fn test_parquet_export_records_codec() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ArtifactExporter::new(dir.path(), "curated").unwrap();
        let artifact = exporter.export_parquet(&sample_df()).unwrap();
        assert_eq!(artifact.compression.as_deref(), Some("snappy"));

        let file = File::open(&artifact.path).unwrap();
        let back = ParquetReader::new(file).finish().unwrap();
        assert_eq!(back.shape(), (3, 3));
    }

    #[cfg(not(feature = "parquet"))]
    #[test]
    fn test_parquet_unavailable_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ArtifactExporter::new(dir.path(), "curated").unwrap();
        let result = exporter.export(&sample_df(), ExportFormat::Parquet).unwrap();
        assert!(result.is_none());
        assert_eq!(exporter.warnings().len(), 1);
        assert!(exporter.artifacts().is_empty());
    }

    #[test]
    fn test_documentation_exports_are_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ArtifactExporter::new(dir.path(), "curated").unwrap();
        let df = sample_df();

        exporter.export_data_dictionary(&df).unwrap();
        exporter.export_summary_statistics(&df).unwrap();

        let names: Vec<&str> = exporter
            .artifacts()
            .iter()
            .map(|a| a.filename.as_str())
            .collect();
        assert_eq!(names, vec![DATA_DICTIONARY_FILE, SUMMARY_STATISTICS_FILE]);
        for artifact in exporter.artifacts() {
            assert!(exporter.verify_artifact(artifact).unwrap());
        }
    }

    #[test]
    fn test_failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ArtifactExporter::new(dir.path(), "curated").unwrap();

        let err = exporter
            .write_artifact(ExportFormat::Csv, "broken.csv", (0, 0), None, |file| {
                file.write_all(b"partial")?;
                Err(CurationError::Io(std::io::Error::other("disk full")))
            })
            .unwrap_err();

        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(err.to_string().contains("broken.csv"));
        assert!(!dir.path().join("broken.csv").exists());
        assert!(exporter.artifacts().is_empty());
    }

    #[test]
    fn test_export_log_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ArtifactExporter::new(dir.path(), "curated").unwrap();
        exporter
            .export_all(&sample_df(), &[ExportFormat::Csv, ExportFormat::Json])
            .unwrap();

        let path = exporter.save_export_log(EXPORT_LOG_FILE).unwrap();
        let log: ExportLog = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(log.artifacts, exporter.artifacts());

        let summary = exporter.render_summary();
        assert!(summary.contains("Total artifacts: 2"));
        assert!(summary.contains("curated.json"));
    }

    #[test]
    fn test_discard_removes_everything_written() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        let mut exporter = ArtifactExporter::new(&out, "curated").unwrap();
        exporter
            .export_all(&sample_df(), &[ExportFormat::Csv, ExportFormat::Json])
            .unwrap();
        exporter.save_export_log(EXPORT_LOG_FILE).unwrap();
        let extra = out.join("transformation_log.json");
        fs::write(&extra, "[]").unwrap();
        exporter.track_file(&extra);

        assert_eq!(exporter.discard(), 4);
        assert!(exporter.artifacts().is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn test_discard_keeps_existing_directory_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        let mut exporter = ArtifactExporter::new(dir.path(), "curated").unwrap();
        exporter.export_csv(&sample_df()).unwrap();

        assert_eq!(exporter.discard(), 1);
        assert!(dir.path().join("notes.txt").is_file());
        assert!(!dir.path().join("curated.csv").exists());
    }
}
