//! Input loading.

use crate::error::{CurationError, Result, ResultExt};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Rows scanned to infer column dtypes.
pub const INFER_SCHEMA_ROWS: usize = 10_000;

/// Read a CSV dataset with a header row.
///
/// A missing file is reported as [`CurationError::InputNotFound`] so callers
/// can tell it apart from a malformed one.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(CurationError::InputNotFound(path.to_path_buf()));
    }

    debug!("Reading CSV from {}", path.display());
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .context(format!("reading {}", path.display()))?;

    info!(
        "Loaded {} ({} rows x {} columns)",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Share of rows whose `column` equals 1, in percent.
///
/// `None` when the column is absent or has no values.
pub fn positive_rate(df: &DataFrame, column: &str) -> Option<f64> {
    let values = crate::utils::float_values(df, column).ok()?;
    if values.is_empty() {
        return None;
    }
    let positives = values.iter().filter(|v| **v == 1.0).count();
    Some(positives as f64 / values.len() as f64 * 100.0)
}
