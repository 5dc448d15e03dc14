//! Expected dataset shape: column names, semantic types and row count.

use once_cell::sync::Lazy;
use polars::prelude::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{is_float_dtype, is_integer_dtype};

/// Semantic type expected for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Signed or unsigned integers
    Integer,
    /// Floating point numbers
    Float,
    /// Text or categorical values
    Categorical,
}

impl ColumnType {
    /// Whether a concrete polars dtype satisfies this semantic type.
    pub fn matches(&self, dtype: &DataType) -> bool {
        match self {
            Self::Integer => is_integer_dtype(dtype),
            Self::Float => is_float_dtype(dtype),
            Self::Categorical => matches!(dtype, DataType::String | DataType::Categorical(_, _)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Categorical => "categorical",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single expected column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
}

/// Expected schema for one dataset kind.
///
/// Column order is significant only for reporting; the column-set check
/// compares membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnSpec>,
    pub expected_rows: usize,
}

impl Schema {
    pub fn new(expected_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            expected_rows,
        }
    }

    /// Append an expected column.
    pub fn with_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(ColumnSpec {
            name: name.into(),
            column_type,
        });
        self
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Schema of the AI4I 2020 predictive maintenance dataset.
    pub fn ai4i_2020() -> Self {
        AI4I_2020_SCHEMA.clone()
    }
}

static AI4I_2020_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(10_000)
        .with_column("UDI", ColumnType::Integer)
        .with_column("Product ID", ColumnType::Categorical)
        .with_column("Type", ColumnType::Categorical)
        .with_column("Air temperature [K]", ColumnType::Float)
        .with_column("Process temperature [K]", ColumnType::Float)
        .with_column("Rotational speed [rpm]", ColumnType::Integer)
        .with_column("Torque [Nm]", ColumnType::Float)
        .with_column("Tool wear [min]", ColumnType::Integer)
        .with_column("Machine failure", ColumnType::Integer)
        .with_column("TWF", ColumnType::Integer)
        .with_column("HDF", ColumnType::Integer)
        .with_column("PWF", ColumnType::Integer)
        .with_column("OSF", ColumnType::Integer)
        .with_column("RNF", ColumnType::Integer)
});
