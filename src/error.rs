//! Error types shared by the table, modifier and querying layers.

use crate::column::ColumnType;

/// Errors raised by the querying subsystem and the data table it drives.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A value handed to a public API is outside its accepted set.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A modifier or lookup referenced a column the table does not have.
    #[error("Column '{0}' not found")]
    UnknownColumn(String),

    /// A value did not match the declared column type.
    #[error("Type mismatch in column '{column}': expected {expected:?}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        actual: String,
    },

    #[error("Row {index} out of range [0, {len})")]
    RowOutOfRange { index: usize, len: usize },

    /// A filter expression could not be parsed.
    #[error("Invalid expression: {0}")]
    Expression(String),

    /// Grid options could not be deserialized.
    #[error("Invalid grid options: {0}")]
    Options(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueryError>;
