/// LiveGrid Column Implementation
///
/// A Column is a typed, random-access value container indexed by row.
/// Columns are filled once while a table is being built and are read-only
/// afterwards; the querying layer never writes to them.

use crate::error::{QueryError, Result};
use std::cmp::Ordering;
use std::fmt::Debug;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bool,
}

/// Column value enum to support multiple types
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bool(bool),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ColumnValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int32(v) => Some(*v as i64),
            ColumnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Int32(v) => Some(*v as f64),
            ColumnValue::Int64(v) => Some(*v as f64),
            ColumnValue::Float32(v) => Some(*v as f64),
            ColumnValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Int32(_) => "Int32",
            ColumnValue::Int64(_) => "Int64",
            ColumnValue::Float32(_) => "Float32",
            ColumnValue::Float64(_) => "Float64",
            ColumnValue::String(_) => "String",
            ColumnValue::Bool(_) => "Bool",
            ColumnValue::Null => "Null",
        }
    }
}

/// Natural ordering of two non-null values.
///
/// Same-typed values use their own ordering (floats by IEEE total order so the
/// result is always a total order). Mixed numeric values compare numerically,
/// and anything else falls back to the type label so the outcome stays
/// deterministic.
pub fn natural_order(a: &ColumnValue, b: &ColumnValue) -> Ordering {
    match (a, b) {
        (ColumnValue::Int32(a), ColumnValue::Int32(b)) => a.cmp(b),
        (ColumnValue::Int64(a), ColumnValue::Int64(b)) => a.cmp(b),
        (ColumnValue::Float32(a), ColumnValue::Float32(b)) => a.total_cmp(b),
        (ColumnValue::Float64(a), ColumnValue::Float64(b)) => a.total_cmp(b),
        (ColumnValue::String(a), ColumnValue::String(b)) => a.cmp(b),
        (ColumnValue::Bool(a), ColumnValue::Bool(b)) => a.cmp(b),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.type_name().cmp(b.type_name()),
        },
    }
}

/// A named, typed column.
pub struct Column {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    values: Vec<ColumnValue>,
}

impl Column {
    pub fn new(name: String, column_type: ColumnType, nullable: bool) -> Self {
        Column {
            name,
            column_type,
            nullable,
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Validate a value against the column's type and nullability
    pub fn validate(&self, value: &ColumnValue) -> Result<()> {
        let ok = match (value, self.column_type) {
            (ColumnValue::Null, _) => self.nullable,
            (ColumnValue::Int32(_), ColumnType::Int32)
            | (ColumnValue::Int64(_), ColumnType::Int64)
            | (ColumnValue::Float32(_), ColumnType::Float32)
            | (ColumnValue::Float64(_), ColumnType::Float64)
            | (ColumnValue::String(_), ColumnType::String)
            | (ColumnValue::Bool(_), ColumnType::Bool) => true,
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(QueryError::TypeMismatch {
                column: self.name.clone(),
                expected: self.column_type,
                actual: value.type_name().to_string(),
            })
        }
    }

    pub fn append(&mut self, value: ColumnValue) -> Result<()> {
        self.validate(&value)?;
        self.values.push(value);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&ColumnValue> {
        self.values.get(index).ok_or(QueryError::RowOutOfRange {
            index,
            len: self.values.len(),
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnValue> {
        self.values.iter()
    }
}

impl Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Column {{ name: '{}', type: {:?}, nullable: {}, len: {} }}",
            self.name,
            self.column_type,
            self.nullable,
            self.len()
        )
    }
}
