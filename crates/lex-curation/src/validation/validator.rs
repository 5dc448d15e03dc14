//! Schema validator.

use super::report::*;
use crate::config::SeverityPolicy;
use crate::error::Result;
use crate::schema::Schema;
use crate::utils::{self, timestamp};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Checks a dataset against an expected schema.
///
/// Validation is pure: the dataset is only read. Each check runs
/// independently and records its own status; only missing columns are
/// always fatal, the severity of everything else comes from the
/// [`SeverityPolicy`].
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Schema,
    policy: SeverityPolicy,
}

impl SchemaValidator {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            policy: SeverityPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SeverityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validate `df` and return the report.
    ///
    /// A `FAIL` status is reported, not raised; the caller decides whether to
    /// abort.
    pub fn validate(&self, df: &DataFrame) -> Result<ValidationReport> {
        info!(
            "Validating dataset ({} rows x {} columns) against schema ({} columns)",
            df.height(),
            df.width(),
            self.schema.columns.len()
        );

        let report = ValidationReport {
            timestamp: timestamp(),
            row_count: self.check_row_count(df),
            columns: self.check_columns(df),
            data_types: self.check_data_types(df),
            missing_values: self.check_missing_values(df),
            duplicates: self.check_duplicates(df)?,
        };

        for (name, status) in report.checks() {
            match status {
                CheckStatus::Pass => debug!("Check '{}': PASS", name),
                CheckStatus::Warn => warn!("Check '{}': WARN", name),
                CheckStatus::Fail => warn!("Check '{}': FAIL", name),
            }
        }
        info!("Validation complete: {}", report.overall_status());

        Ok(report)
    }

    fn check_row_count(&self, df: &DataFrame) -> RowCountCheck {
        let actual = df.height();
        let expected = self.schema.expected_rows;
        let status = if actual == expected {
            CheckStatus::Pass
        } else {
            self.policy.row_count_mismatch.status()
        };
        RowCountCheck {
            status,
            expected,
            actual,
        }
    }

    fn check_columns(&self, df: &DataFrame) -> ColumnsCheck {
        let actual = utils::column_names(df);

        let missing: Vec<String> = self
            .schema
            .column_names()
            .filter(|name| !actual.iter().any(|a| a == name))
            .map(str::to_string)
            .collect();

        let extra: Vec<String> = actual
            .iter()
            .filter(|name| !self.schema.contains(name))
            .cloned()
            .collect();

        if !extra.is_empty() {
            debug!("Extra columns not in schema: {:?}", extra);
        }

        let status = if missing.is_empty() {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        };

        ColumnsCheck {
            status,
            missing,
            extra,
        }
    }

    fn check_data_types(&self, df: &DataFrame) -> DataTypesCheck {
        let mismatches: Vec<TypeMismatch> = self
            .schema
            .columns
            .iter()
            .filter_map(|spec| {
                let column = df.column(&spec.name).ok()?;
                let dtype = column.dtype();
                (!spec.column_type.matches(dtype)).then(|| TypeMismatch {
                    column: spec.name.clone(),
                    expected: spec.column_type.to_string(),
                    actual: dtype.to_string(),
                })
            })
            .collect();

        let status = if mismatches.is_empty() {
            CheckStatus::Pass
        } else {
            self.policy.type_mismatch.status()
        };

        DataTypesCheck { status, mismatches }
    }

    fn check_missing_values(&self, df: &DataFrame) -> MissingValuesCheck {
        let by_column: Vec<ColumnNullCount> = df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() > 0)
            .map(|col| ColumnNullCount {
                column: col.name().to_string(),
                count: col.null_count(),
            })
            .collect();
        let total_missing = by_column.iter().map(|c| c.count).sum();

        let status = if total_missing == 0 {
            CheckStatus::Pass
        } else {
            self.policy.missing_values.status()
        };

        MissingValuesCheck {
            status,
            total_missing,
            by_column,
        }
    }

    fn check_duplicates(&self, df: &DataFrame) -> Result<DuplicatesCheck> {
        let duplicate_rows = utils::duplicate_row_count(df)?;
        let status = if duplicate_rows == 0 {
            CheckStatus::Pass
        } else {
            self.policy.duplicates.status()
        };
        Ok(DuplicatesCheck {
            status,
            duplicate_rows,
        })
    }
}
