//! Validation report types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single validation check.
///
/// Ordered by severity so the worst status of a report is its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowCountCheck {
    pub status: CheckStatus,
    pub expected: usize,
    pub actual: usize,
}

/// Column-set comparison. `missing` follows schema order, `extra` dataset order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnsCheck {
    pub status: CheckStatus,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMismatch {
    pub column: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypesCheck {
    pub status: CheckStatus,
    pub mismatches: Vec<TypeMismatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnNullCount {
    pub column: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValuesCheck {
    pub status: CheckStatus,
    pub total_missing: usize,
    /// Only columns with at least one null, in dataset order.
    pub by_column: Vec<ColumnNullCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatesCheck {
    pub status: CheckStatus,
    /// Rows that repeat an earlier row exactly.
    pub duplicate_rows: usize,
}

/// Result of validating a dataset against a schema.
///
/// Every check is always present; a `FAIL` in one check never suppresses
/// the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub timestamp: String,
    pub row_count: RowCountCheck,
    pub columns: ColumnsCheck,
    pub data_types: DataTypesCheck,
    pub missing_values: MissingValuesCheck,
    pub duplicates: DuplicatesCheck,
}

impl ValidationReport {
    /// Check names and statuses, in reporting order.
    pub fn checks(&self) -> [(&'static str, CheckStatus); 5] {
        [
            ("row_count", self.row_count.status),
            ("columns", self.columns.status),
            ("data_types", self.data_types.status),
            ("missing_values", self.missing_values.status),
            ("duplicates", self.duplicates.status),
        ]
    }

    /// Worst status across all checks.
    pub fn overall_status(&self) -> CheckStatus {
        self.checks()
            .iter()
            .map(|(_, status)| *status)
            .max()
            .unwrap_or(CheckStatus::Pass)
    }

    /// Whether any check failed.
    pub fn is_fatal(&self) -> bool {
        self.overall_status() == CheckStatus::Fail
    }

    pub fn failed_checks(&self) -> Vec<String> {
        self.checks_with(CheckStatus::Fail)
    }

    pub fn warned_checks(&self) -> Vec<String> {
        self.checks_with(CheckStatus::Warn)
    }

    fn checks_with(&self, wanted: CheckStatus) -> Vec<String> {
        self.checks()
            .iter()
            .filter(|(_, status)| *status == wanted)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Number of checks that passed.
    pub fn passed_count(&self) -> usize {
        self.checks()
            .iter()
            .filter(|(_, status)| *status == CheckStatus::Pass)
            .count()
    }

    /// One message per non-passing check.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        if self.row_count.status != CheckStatus::Pass {
            messages.push(format!(
                "row_count: expected {} rows, found {}",
                self.row_count.expected, self.row_count.actual
            ));
        }
        if !self.columns.missing.is_empty() {
            messages.push(format!(
                "columns: missing {}",
                self.columns.missing.join(", ")
            ));
        }
        if self.data_types.status != CheckStatus::Pass {
            let cols: Vec<&str> = self
                .data_types
                .mismatches
                .iter()
                .map(|m| m.column.as_str())
                .collect();
            messages.push(format!("data_types: mismatched {}", cols.join(", ")));
        }
        if self.missing_values.status != CheckStatus::Pass {
            messages.push(format!(
                "missing_values: {} null cells",
                self.missing_values.total_missing
            ));
        }
        if self.duplicates.status != CheckStatus::Pass {
            messages.push(format!(
                "duplicates: {} duplicated rows",
                self.duplicates.duplicate_rows
            ));
        }
        messages
    }

    /// Fixed-format text block, one line per check.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&"=".repeat(70));
        out.push_str("\nVALIDATION SUMMARY\n");
        out.push_str(&"=".repeat(70));
        out.push('\n');

        out.push_str(&format!(
            "[{}] row_count: expected {}, actual {}\n",
            self.row_count.status, self.row_count.expected, self.row_count.actual
        ));

        out.push_str(&format!("[{}] columns:", self.columns.status));
        if self.columns.missing.is_empty() && self.columns.extra.is_empty() {
            out.push_str(" all expected columns present");
        }
        if !self.columns.missing.is_empty() {
            out.push_str(&format!(" missing [{}]", self.columns.missing.join(", ")));
        }
        if !self.columns.extra.is_empty() {
            out.push_str(&format!(" extra [{}]", self.columns.extra.join(", ")));
        }
        out.push('\n');

        out.push_str(&format!("[{}] data_types:", self.data_types.status));
        if self.data_types.mismatches.is_empty() {
            out.push_str(" all types match");
        }
        for m in &self.data_types.mismatches {
            out.push_str(&format!(
                " {} (expected {}, got {});",
                m.column, m.expected, m.actual
            ));
        }
        out.push('\n');

        out.push_str(&format!(
            "[{}] missing_values: {} total\n",
            self.missing_values.status, self.missing_values.total_missing
        ));
        for c in &self.missing_values.by_column {
            out.push_str(&format!("    {}: {}\n", c.column, c.count));
        }

        out.push_str(&format!(
            "[{}] duplicates: {} rows\n",
            self.duplicates.status, self.duplicates.duplicate_rows
        ));

        out.push_str(&"-".repeat(70));
        out.push_str(&format!(
            "\nOverall: {} ({}/5 checks passed)\n",
            self.overall_status(),
            self.passed_count()
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing_report() -> ValidationReport {
        ValidationReport {
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            row_count: RowCountCheck {
                status: CheckStatus::Pass,
                expected: 3,
                actual: 3,
            },
            columns: ColumnsCheck {
                status: CheckStatus::Pass,
                missing: vec![],
                extra: vec![],
            },
            data_types: DataTypesCheck {
                status: CheckStatus::Pass,
                mismatches: vec![],
            },
            missing_values: MissingValuesCheck {
                status: CheckStatus::Pass,
                total_missing: 0,
                by_column: vec![],
            },
            duplicates: DuplicatesCheck {
                status: CheckStatus::Pass,
                duplicate_rows: 0,
            },
        }
    }

    #[test]
    fn test_status_ordering() {
        assert!(CheckStatus::Pass < CheckStatus::Warn);
        assert!(CheckStatus::Warn < CheckStatus::Fail);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&CheckStatus::Warn).unwrap();
        assert_eq!(json, "\"WARN\"");
    }

    #[test]
    fn test_overall_status() {
        let mut report = passing_report();
        assert_eq!(report.overall_status(), CheckStatus::Pass);
        assert_eq!(report.passed_count(), 5);

        report.duplicates.status = CheckStatus::Warn;
        assert_eq!(report.overall_status(), CheckStatus::Warn);
        assert!(!report.is_fatal());
        assert_eq!(report.warned_checks(), vec!["duplicates"]);

        report.columns.status = CheckStatus::Fail;
        report.columns.missing = vec!["Torque [Nm]".to_string()];
        assert!(report.is_fatal());
        assert_eq!(report.failed_checks(), vec!["columns"]);
    }

    #[test]
    fn test_render_summary() {
        let mut report = passing_report();
        report.columns.extra = vec!["note".to_string()];
        let summary = report.render_summary();
        assert!(summary.contains("VALIDATION SUMMARY"));
        assert!(summary.contains("[PASS] row_count"));
        assert!(summary.contains("extra [note]"));
        assert!(summary.contains("(5/5 checks passed)"));
    }

    #[test]
    fn test_messages_only_for_non_passing() {
        let mut report = passing_report();
        assert!(report.messages().is_empty());

        report.missing_values.status = CheckStatus::Warn;
        report.missing_values.total_missing = 4;
        assert_eq!(report.messages(), vec!["missing_values: 4 null cells"]);
    }
}
