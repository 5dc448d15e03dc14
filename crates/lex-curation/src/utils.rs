//! Shared utilities for the curation pipeline.
//!
//! Column access helpers and dtype classification used by the validator,
//! the transformer and the exporter.

use crate::error::{CurationError, Result};
use chrono::Local;
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType is a floating point type.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || is_float_dtype(dtype)
}

/// Check if a DataType holds text or categories.
#[inline]
pub fn is_categorical_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

// =============================================================================
// Column Access
// =============================================================================

/// Names of all columns, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// A numeric column cast to `Float64`, keeping nulls in place.
pub fn float_series(df: &DataFrame, name: &str) -> Result<Series> {
    let col = df
        .column(name)
        .map_err(|_| CurationError::ColumnNotFound(name.to_string()))?;
    Ok(col.as_materialized_series().cast(&DataType::Float64)?)
}

/// Read a numeric column as `f64`, keeping nulls in place.
pub fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = float_series(df, name)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Non-null values of a numeric column as `f64`.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    Ok(float_column(df, name)?.into_iter().flatten().collect())
}

/// Number of fully duplicated rows (occurrences beyond the first).
pub fn duplicate_row_count(df: &DataFrame) -> Result<usize> {
    if df.height() == 0 || df.width() == 0 {
        return Ok(0);
    }
    let unique = df.unique::<&str, &str>(None, UniqueKeepStrategy::First, None)?;
    Ok(df.height() - unique.height())
}

/// Total null cells across every column.
pub fn total_null_count(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|col| col.null_count()).sum()
}

/// Timestamp used for every log entry and record.
pub fn timestamp() -> String {
    Local::now().to_rfc3339()
}
