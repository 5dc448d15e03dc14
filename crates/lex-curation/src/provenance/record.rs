//! Provenance record types.

use crate::config::{CuratorInfo, DatasetSource};
use crate::export::ExportArtifact;
use crate::transform::TransformationRecord;
use crate::utils::timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    #[serde(flatten)]
    pub source: DatasetSource,
    pub recorded_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratorEntry {
    #[serde(flatten)]
    pub curator: CuratorInfo,
    pub recorded_at: String,
}

/// Where and with what the curation ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub os: String,
    pub arch: String,
    pub os_family: String,
    /// Crate name to version.
    pub packages: BTreeMap<String, String>,
    /// Dataset encoders compiled into this build.
    pub encoders: Vec<String>,
    pub captured_at: String,
}

impl EnvironmentSnapshot {
    pub fn capture() -> Self {
        let mut packages = BTreeMap::new();
        packages.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );

        let mut encoders = vec!["csv".to_string(), "json".to_string()];
        if cfg!(feature = "parquet") {
            encoders.push("parquet".to_string());
        }

        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            os_family: std::env::consts::FAMILY.to_string(),
            packages,
            encoders,
            captured_at: timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Completed,
    Skipped,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// 1-based position in the workflow.
    pub step_number: usize,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub status: StepStatus,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedTransformation {
    pub recorded_at: String,
    #[serde(flatten)]
    pub record: TransformationRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub check_name: String,
    pub passed: bool,
    pub results: serde_json::Value,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedExport {
    pub recorded_at: String,
    #[serde(flatten)]
    pub artifact: ExportArtifact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    pub category: String,
    pub timestamp: String,
}

/// Durable audit trail of one curation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub project_name: String,
    pub created_at: String,
    pub dataset_source: Option<SourceEntry>,
    pub curator: Option<CuratorEntry>,
    pub environment: Option<EnvironmentSnapshot>,
    pub workflow_steps: Vec<WorkflowStep>,
    pub transformations: Vec<RecordedTransformation>,
    pub quality_checks: Vec<QualityCheck>,
    pub exports: Vec<RecordedExport>,
    pub notes: Vec<Note>,
}

impl ProvenanceRecord {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            created_at: timestamp(),
            dataset_source: None,
            curator: None,
            environment: None,
            workflow_steps: Vec::new(),
            transformations: Vec::new(),
            quality_checks: Vec::new(),
            exports: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn passed_checks(&self) -> usize {
        self.quality_checks.iter().filter(|c| c.passed).count()
    }
}
