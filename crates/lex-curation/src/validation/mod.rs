//! Structural validation of the input dataset.
//!
//! This module checks a dataset against an expected [`Schema`](crate::schema::Schema)
//! and a handful of data-quality rules, producing a [`ValidationReport`].

mod report;
mod validator;

pub use report::{
    CheckStatus, ColumnNullCount, ColumnsCheck, DataTypesCheck, DuplicatesCheck,
    MissingValuesCheck, RowCountCheck, TypeMismatch, ValidationReport,
};
pub use validator::SchemaValidator;
