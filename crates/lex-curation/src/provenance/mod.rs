//! Provenance tracking module.
//!
//! [`ProvenanceTracker`] is an append-only aggregator. It validates nothing
//! and never rewrites an entry; every call is timestamped when it is made.
//! Source, curator and environment are recorded once; a later call leaves the
//! first entry in place and appends the new value as a `correction` note.

mod record;

pub use record::{
    CuratorEntry, EnvironmentSnapshot, Note, ProvenanceRecord, QualityCheck,
    RecordedExport, RecordedTransformation, SourceEntry, StepStatus, WorkflowStep,
};

use crate::config::{CuratorInfo, DatasetSource};
use crate::error::{Result, ResultExt};
use crate::export::ExportArtifact;
use crate::transform::TransformationRecord;
use crate::utils::timestamp;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const PROVENANCE_RECORD_FILE: &str = "provenance_record.json";
pub const PROVENANCE_SUMMARY_FILE: &str = "provenance.txt";

/// Note category for values recorded after a single-entry field was set.
pub const CORRECTION_CATEGORY: &str = "correction";

/// Lifecycle of a tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerState {
    Open,
    /// Persisted at least once; the path of the last write.
    Sealed(PathBuf),
}

#[derive(Debug)]
pub struct ProvenanceTracker {
    record: ProvenanceRecord,
    state: TrackerState,
}

impl ProvenanceTracker {
    pub fn new(project_name: impl Into<String>) -> Self {
        let record = ProvenanceRecord::new(project_name);
        info!("Provenance tracking started for '{}'", record.project_name);
        Self {
            record,
            state: TrackerState::Open,
        }
    }

    pub fn record(&self) -> &ProvenanceRecord {
        &self.record
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Record the dataset source.
    ///
    /// Returns the recommended fields that are missing. They are logged as
    /// warnings; the source is recorded regardless.
    pub fn record_source(&mut self, source: DatasetSource) -> Vec<&'static str> {
        let missing = source.missing_recommended_fields();
        if !missing.is_empty() {
            warn!(
                "Dataset source is missing recommended fields: {}",
                missing.join(", ")
            );
        }
        if self.record.dataset_source.is_some() {
            self.add_correction("dataset_source", &source);
        } else {
            self.record.dataset_source = Some(SourceEntry {
                source,
                recorded_at: timestamp(),
            });
        }
        missing
    }

    pub fn record_curator(&mut self, curator: CuratorInfo) {
        if self.record.curator.is_some() {
            self.add_correction("curator", &curator);
            return;
        }
        debug!("Recorded curator '{}'", curator.name);
        self.record.curator = Some(CuratorEntry {
            curator,
            recorded_at: timestamp(),
        });
    }

    /// Snapshot the runtime environment. A repeated capture keeps the first
    /// snapshot and notes the new one.
    pub fn capture_environment(&mut self) -> &EnvironmentSnapshot {
        let snapshot = EnvironmentSnapshot::capture();
        if self.record.environment.is_some() {
            self.add_correction("environment", &snapshot);
        }
        self.record.environment.get_or_insert(snapshot)
    }

    fn add_correction<T: Serialize>(&mut self, field: &str, value: &T) {
        warn!("'{}' already recorded; keeping it and noting the new value", field);
        let value = serde_json::to_string(value)
            .unwrap_or_else(|e| format!("<unserializable: {}>", e));
        self.add_note(format!("{} re-recorded: {}", field, value), CORRECTION_CATEGORY);
    }

    /// Append a workflow step; its number is its 1-based position.
    pub fn record_workflow_step(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        status: StepStatus,
    ) {
        let step = WorkflowStep {
            step_number: self.record.workflow_steps.len() + 1,
            name: name.into(),
            description: description.into(),
            parameters,
            status,
            timestamp: timestamp(),
        };
        debug!("Workflow step {}: {}", step.step_number, step.name);
        self.record.workflow_steps.push(step);
    }

    pub fn record_transformation(&mut self, record: &TransformationRecord) {
        self.record.transformations.push(RecordedTransformation {
            recorded_at: timestamp(),
            record: record.clone(),
        });
    }

    pub fn record_quality_check(
        &mut self,
        check_name: impl Into<String>,
        results: serde_json::Value,
        passed: bool,
    ) {
        self.record.quality_checks.push(QualityCheck {
            check_name: check_name.into(),
            passed,
            results,
            timestamp: timestamp(),
        });
    }

    pub fn record_export(&mut self, artifact: &ExportArtifact) {
        self.record.exports.push(RecordedExport {
            recorded_at: timestamp(),
            artifact: artifact.clone(),
        });
    }

    pub fn add_note(&mut self, text: impl Into<String>, category: impl Into<String>) {
        self.record.notes.push(Note {
            text: text.into(),
            category: category.into(),
            timestamp: timestamp(),
        });
    }

    /// Fixed-section, human-readable summary.
    pub fn render_summary(&self) -> String {
        let r = &self.record;
        let rule = "=".repeat(70);
        let thin = "-".repeat(70);
        let mut out = String::new();

        out.push_str(&format!("{}\nPROVENANCE SUMMARY\n{}\n", rule, rule));
        out.push_str(&format!("Project: {}\n", r.project_name));
        out.push_str(&format!("Created: {}\n", r.created_at));

        out.push_str(&format!("\nDATASET SOURCE\n{}\n", thin));
        match &r.dataset_source {
            Some(entry) => {
                let s = &entry.source;
                let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
                out.push_str(&format!("Title: {}\n", field(&s.title)));
                out.push_str(&format!("Source URL: {}\n", field(&s.source_url)));
                out.push_str(&format!("Acquired: {}\n", field(&s.acquisition_date)));
                out.push_str(&format!("License: {}\n", field(&s.license)));
                if let Some(doi) = &s.doi {
                    out.push_str(&format!("DOI: {}\n", doi));
                }
                if let Some(authors) = &s.original_authors {
                    out.push_str(&format!("Authors: {}\n", authors));
                }
            }
            None => out.push_str("Not recorded\n"),
        }

        out.push_str(&format!("\nCURATOR INFORMATION\n{}\n", thin));
        match &r.curator {
            Some(entry) => {
                out.push_str(&format!("Name: {}\n", entry.curator.name));
                out.push_str(&format!("Institution: {}\n", entry.curator.institution));
                if let Some(contact) = &entry.curator.contact {
                    out.push_str(&format!("Contact: {}\n", contact));
                }
            }
            None => out.push_str("Not recorded\n"),
        }

        out.push_str(&format!(
            "\nCURATION WORKFLOW ({} steps)\n{}\n",
            r.workflow_steps.len(),
            thin
        ));
        for step in &r.workflow_steps {
            out.push_str(&format!(
                "{}. {}: {} [{}]\n",
                step.step_number, step.name, step.description, step.status
            ));
        }

        out.push_str(&format!(
            "\nDATA TRANSFORMATIONS ({})\n{}\n",
            r.transformations.len(),
            thin
        ));
        for t in &r.transformations {
            out.push_str(&format!("- {}\n", t.record.operation.name()));
        }

        out.push_str(&format!(
            "\nQUALITY CHECKS (Passed {}/{})\n{}\n",
            r.passed_checks(),
            r.quality_checks.len(),
            thin
        ));
        for c in &r.quality_checks {
            let mark = if c.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!("[{}] {}\n", mark, c.check_name));
        }

        out.push_str(&format!("\nEXPORTS ({})\n{}\n", r.exports.len(), thin));
        for e in &r.exports {
            out.push_str(&format!(
                "- {} ({}, sha256 {})\n",
                e.artifact.filename, e.artifact.format, e.artifact.checksum_sha256
            ));
        }

        if !r.notes.is_empty() {
            out.push_str(&format!("\nNOTES ({})\n{}\n", r.notes.len(), thin));
            for n in &r.notes {
                out.push_str(&format!("[{}] {}\n", n.category, n.text));
            }
        }

        out.push_str(&rule);
        out.push('\n');
        out
    }

    /// Write the full record as JSON and seal the tracker.
    ///
    /// Persisting a sealed tracker again overwrites the target and logs a
    /// warning.
    pub fn persist(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let TrackerState::Sealed(previous) = &self.state {
            warn!(
                "Provenance record already persisted to {}; overwriting {}",
                previous.display(),
                path.display()
            );
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context(format!("creating {}", parent.display()))?;
        }
        let file = File::create(path).context(format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.record)?;

        info!("Provenance record saved to {}", path.display());
        self.state = TrackerState::Sealed(path.to_path_buf());
        Ok(())
    }

    /// Write [`render_summary`](Self::render_summary) as text.
    pub fn persist_summary(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.render_summary()).context(format!("writing {}", path.display()))?;
        info!("Provenance summary saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportFormat;
    use crate::transform::{TransformationOperation, TransformationRecord};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn artifact(name: &str) -> ExportArtifact {
        ExportArtifact {
            format: ExportFormat::Csv,
            filename: name.to_string(),
            path: PathBuf::from(name),
            rows: 10,
            columns: 2,
            size_bytes: 120,
            checksum_sha256: "ab".repeat(32),
            compression: None,
            timestamp: timestamp(),
        }
    }

    #[test]
    fn test_record_source_warns_but_records() {
        let mut tracker = ProvenanceTracker::new("test");
        let missing = tracker.record_source(DatasetSource {
            title: Some("Data".to_string()),
            ..Default::default()
        });
        assert_eq!(missing, vec!["source_url", "acquisition_date", "license"]);
        assert!(tracker.record().dataset_source.is_some());
    }

    #[test]
    fn test_workflow_steps_numbered_in_order() {
        let mut tracker = ProvenanceTracker::new("test");
        tracker.record_workflow_step("load", "Load data", json!({}), StepStatus::Completed);
        tracker.record_workflow_step(
            "validate",
            "Validate schema",
            json!({"rows": 3}),
            StepStatus::Completed,
        );

        let steps = &tracker.record().workflow_steps;
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_number, 1);
        assert_eq!(steps[1].name, "validate");
        assert_eq!(steps[1].parameters["rows"], 3);
    }

    #[test]
    fn test_environment_snapshot() {
        let mut tracker = ProvenanceTracker::new("test");
        let env = tracker.capture_environment();
        assert_eq!(env.os, std::env::consts::OS);
        assert!(env.packages.contains_key("lex-curation"));
        assert!(env.encoders.contains(&"csv".to_string()));
        assert_eq!(
            env.encoders.contains(&"parquet".to_string()),
            cfg!(feature = "parquet")
        );
    }

    #[test]
    fn test_summary_sections_and_tally() {
        let mut tracker = ProvenanceTracker::new("AI4I");
        tracker.record_curator(CuratorInfo::new("Ada", "Example University"));
        tracker.record_quality_check("structural_validation", json!({"status": "PASS"}), true);
        tracker.record_quality_check("completeness", json!({"missing": 2}), false);
        tracker.record_export(&artifact("data.csv"));
        tracker.add_note("Parquet skipped", "warning");

        let summary = tracker.render_summary();
        for section in [
            "PROVENANCE SUMMARY",
            "DATASET SOURCE",
            "CURATOR INFORMATION",
            "CURATION WORKFLOW (0 steps)",
            "DATA TRANSFORMATIONS",
            "QUALITY CHECKS (Passed 1/2)",
            "EXPORTS (1)",
            "[warning] Parquet skipped",
        ] {
            assert!(summary.contains(section), "missing section {}", section);
        }
    }

    #[test]
    fn test_summary_uses_lowercase_step_status() {
        let mut tracker = ProvenanceTracker::new("test");
        tracker.record_workflow_step("load", "Load data", json!({}), StepStatus::Completed);
        tracker.record_workflow_step("derive", "Derive", json!({}), StepStatus::Skipped);

        let summary = tracker.render_summary();
        assert!(summary.contains("1. load: Load data [completed]"));
        assert!(summary.contains("2. derive: Derive [skipped]"));
        assert_eq!(
            serde_json::to_value(StepStatus::Skipped).unwrap(),
            json!(StepStatus::Skipped.as_str())
        );
    }

    #[test]
    fn test_second_recording_keeps_first_and_adds_correction() {
        let mut tracker = ProvenanceTracker::new("test");
        let source = |title: &str| DatasetSource {
            title: Some(title.to_string()),
            ..DatasetSource::default()
        };
        tracker.record_source(source("first"));
        tracker.record_source(source("second"));
        tracker.record_curator(CuratorInfo::new("Ada", "Example University"));
        tracker.record_curator(CuratorInfo::new("Grace", "Navy"));
        let first_env = tracker.capture_environment().captured_at.clone();
        tracker.capture_environment();

        let record = tracker.record();
        assert_eq!(
            record.dataset_source.as_ref().unwrap().source.title.as_deref(),
            Some("first")
        );
        assert_eq!(record.curator.as_ref().unwrap().curator.name, "Ada");
        assert_eq!(record.environment.as_ref().unwrap().captured_at, first_env);

        let corrections: Vec<&str> = record
            .notes
            .iter()
            .filter(|n| n.category == CORRECTION_CATEGORY)
            .map(|n| n.text.as_str())
            .collect();
        assert_eq!(corrections.len(), 3);
        assert!(corrections[0].starts_with("dataset_source re-recorded"));
        assert!(corrections[0].contains("second"));
        assert!(corrections[1].contains("Grace"));
        assert!(corrections[2].starts_with("environment re-recorded"));
    }

    #[test]
    fn test_persist_seals_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROVENANCE_RECORD_FILE);

        let mut tracker = ProvenanceTracker::new("test");
        tracker.record_transformation(&TransformationRecord {
            timestamp: timestamp(),
            operation: TransformationOperation::FeatureDerivation { features: vec![] },
        });
        tracker.record_export(&artifact("a.csv"));
        assert_eq!(tracker.state(), &TrackerState::Open);

        tracker.persist(&path).unwrap();
        assert_eq!(tracker.state(), &TrackerState::Sealed(path.clone()));

        let back: ProvenanceRecord =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(&back, tracker.record());
    }

    #[test]
    fn test_recording_after_seal_and_repersist_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROVENANCE_RECORD_FILE);

        let mut tracker = ProvenanceTracker::new("test");
        tracker.persist(&path).unwrap();
        tracker.add_note("late note", "general");
        tracker.persist(&path).unwrap();

        let back: ProvenanceRecord =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.notes.len(), 1);
    }

    #[test]
    fn test_persist_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROVENANCE_SUMMARY_FILE);
        let tracker = ProvenanceTracker::new("test");
        tracker.persist_summary(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&"=".repeat(70)));
    }
}
