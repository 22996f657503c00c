/// LiveGrid Table Implementation
///
/// A Table is an immutable collection of typed columns described by a schema.
/// Tables are built once (row by row or from JSON) and then shared as
/// `Rc<Table>`; every sort or filter produces a `DerivedView` instead of
/// touching the table itself.
///
/// # Examples
///
/// ```
/// use livegrid::{Table, Schema, ColumnType, ColumnValue};
/// use std::collections::HashMap;
///
/// let schema = Schema::new(vec![
///     ("id".to_string(), ColumnType::Int32, false),
///     ("name".to_string(), ColumnType::String, false),
/// ]);
/// let mut table = Table::new("users".to_string(), schema);
///
/// let mut row = HashMap::new();
/// row.insert("id".to_string(), ColumnValue::Int32(1));
/// row.insert("name".to_string(), ColumnValue::String("Alice".to_string()));
/// table.append_row(row).unwrap();
///
/// assert_eq!(table.row_count(), 1);
/// assert_eq!(table.get_value(0, "name").unwrap().as_string(), Some("Alice"));
/// ```

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{QueryError, Result};
use crate::modifier::{Comparator, Modifier};
use crate::view::DerivedView;
use std::collections::HashMap;
use std::rc::Rc;

/// Schema definition with column names and types.
///
/// Column order is the declaration order and is preserved everywhere a
/// table lists its columns.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<(String, ColumnType, bool)>, // (name, type, nullable)
}

impl Schema {
    /// Creates a new schema from `(column_name, column_type, is_nullable)` tuples.
    pub fn new(columns: Vec<(String, ColumnType, bool)>) -> Self {
        Schema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _, _)| name.as_str()).collect()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _, _)| n == name)
    }

    pub fn get_column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, ty, _)| *ty)
    }
}

/// Root table owning its data.
pub struct Table {
    name: String,
    schema: Schema,
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(name: String, schema: Schema) -> Self {
        let columns = schema
            .columns
            .iter()
            .map(|(col_name, col_type, nullable)| {
                Column::new(col_name.clone(), *col_type, *nullable)
            })
            .collect();

        Table {
            name,
            schema,
            columns,
            row_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.schema
            .get_column_index(name)
            .map(|idx| &self.columns[idx])
            .ok_or_else(|| QueryError::UnknownColumn(name.to_string()))
    }

    pub fn get_value(&self, row: usize, column: &str) -> Result<&ColumnValue> {
        self.column(column)?.get(row)
    }

    pub fn get_row(&self, row: usize) -> Result<HashMap<String, ColumnValue>> {
        if row >= self.row_count {
            return Err(QueryError::RowOutOfRange {
                index: row,
                len: self.row_count,
            });
        }

        let mut result = HashMap::with_capacity(self.columns.len());
        for col in &self.columns {
            result.insert(col.name().to_string(), col.get(row)?.clone());
        }
        Ok(result)
    }

    /// Append a row. Every schema column must be present; the row is
    /// validated in full before any column is written.
    pub fn append_row(&mut self, mut row: HashMap<String, ColumnValue>) -> Result<()> {
        for col in &self.columns {
            match row.get(col.name()) {
                Some(value) => col.validate(value)?,
                None => {
                    return Err(QueryError::InvalidArgument(format!(
                        "Missing value for column '{}'",
                        col.name()
                    )))
                }
            }
        }

        for col in self.columns.iter_mut() {
            if let Some(value) = row.remove(col.name()) {
                col.append(value)?;
            }
        }
        self.row_count += 1;
        Ok(())
    }

    /// Default comparison for a column, chosen by its value type.
    pub fn default_comparator(&self, column: &str) -> Result<Comparator> {
        let column_type = self
            .schema
            .get_column_type(column)
            .ok_or_else(|| QueryError::UnknownColumn(column.to_string()))?;
        Ok(Comparator::for_type(column_type))
    }

    /// Apply a modifier to the whole table, producing a derived view.
    ///
    /// This is a pure function of the table and the modifier.
    ///
    /// # Example
    ///
    /// ```
    /// use livegrid::{Modifier, SortModifier, SortOrder, Table};
    /// use std::rc::Rc;
    ///
    /// let json = r#"[{"id": 1, "v": 5}, {"id": 2, "v": 9}, {"id": 3, "v": 1}]"#;
    /// let table = Rc::new(Table::from_json("rows", json).unwrap());
    ///
    /// let sort = Modifier::Sort(SortModifier::new("v", SortOrder::Descending));
    /// let view = Table::apply_modifier(&table, &sort).unwrap();
    /// assert_eq!(view.row_indices(), &[1, 0, 2]);
    /// ```
    pub fn apply_modifier(table: &Rc<Table>, modifier: &Modifier) -> Result<DerivedView> {
        DerivedView::identity(Rc::clone(table)).apply(modifier)
    }

    /// Create a table from a JSON string (array of objects).
    ///
    /// Column names and types are inferred from the first object, in the
    /// order its keys appear: integers become `Int64`, other numbers
    /// `Float64`, strings `String`, booleans `Bool` and nulls `String`.
    /// All columns are nullable. Integer values are accepted in `Float64`
    /// columns.
    ///
    /// ```
    /// use livegrid::Table;
    ///
    /// let json = r#"[{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]"#;
    /// let table = Table::from_json("users", json).unwrap();
    /// assert_eq!(table.row_count(), 2);
    /// ```
    pub fn from_json(name: &str, json: &str) -> Result<Table> {
        let parsed: Vec<serde_json::Value> = serde_json::from_str(json)?;

        let first = parsed
            .first()
            .and_then(|v| v.as_object())
            .ok_or_else(|| {
                QueryError::InvalidArgument("Expected a non-empty array of objects".to_string())
            })?;

        let schema = infer_schema_from_json(first);
        let mut table = Table::new(name.to_string(), schema);

        for item in &parsed {
            let obj = item
                .as_object()
                .ok_or_else(|| {
                    QueryError::InvalidArgument("Expected object in array".to_string())
                })?;
            let row = json_object_to_row(&table.schema, obj)?;
            table.append_row(row)?;
        }

        Ok(table)
    }
}

fn infer_schema_from_json(obj: &serde_json::Map<String, serde_json::Value>) -> Schema {
    let columns = obj
        .iter()
        .map(|(key, value)| {
            let col_type = match value {
                serde_json::Value::Number(n) if n.is_i64() => ColumnType::Int64,
                serde_json::Value::Number(_) => ColumnType::Float64,
                serde_json::Value::Bool(_) => ColumnType::Bool,
                _ => ColumnType::String,
            };
            (key.clone(), col_type, true)
        })
        .collect();

    Schema::new(columns)
}

fn json_object_to_row(
    schema: &Schema,
    obj: &serde_json::Map<String, serde_json::Value>,
) -> Result<HashMap<String, ColumnValue>> {
    let mut row = HashMap::new();

    for (key, value) in obj {
        let expected = schema.get_column_type(key);
        let col_value = match (value, expected) {
            (serde_json::Value::Null, _) => ColumnValue::Null,
            (serde_json::Value::Number(n), Some(ColumnType::Float64)) => {
                n.as_f64().map(ColumnValue::Float64).unwrap_or(ColumnValue::Null)
            }
            (serde_json::Value::Number(n), _) => match n.as_i64() {
                Some(v) => ColumnValue::Int64(v),
                None => n.as_f64().map(ColumnValue::Float64).unwrap_or(ColumnValue::Null),
            },
            (serde_json::Value::String(s), _) => ColumnValue::String(s.clone()),
            (serde_json::Value::Bool(b), _) => ColumnValue::Bool(*b),
            _ => {
                return Err(QueryError::InvalidArgument(format!(
                    "Unsupported JSON value type for key '{}'",
                    key
                )))
            }
        };
        row.insert(key.clone(), col_value);
    }

    // Keys missing from later objects read as null.
    for name in schema.get_column_names() {
        row.entry(name.to_string()).or_insert(ColumnValue::Null);
    }

    Ok(row)
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Table {{ name: '{}', columns: {}, rows: {} }}",
            self.name,
            self.schema.len(),
            self.row_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_table_basic() {
        let schema = Schema::new(vec![
            ("id".to_string(), ColumnType::Int32, false),
            ("name".to_string(), ColumnType::String, false),
            ("age".to_string(), ColumnType::Int32, true),
        ]);

        let mut table = Table::new("users".to_string(), schema);

        let mut row1 = HashMap::new();
        row1.insert("id".to_string(), ColumnValue::Int32(1));
        row1.insert("name".to_string(), ColumnValue::String("Alice".to_string()));
        row1.insert("age".to_string(), ColumnValue::Null);
        table.append_row(row1).unwrap();

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.get_value(0, "name").unwrap().as_string(), Some("Alice"));
        assert!(table.get_value(0, "age").unwrap().is_null());

        let row = table.get_row(0).unwrap();
        assert_eq!(row.get("id").unwrap().as_i32(), Some(1));
    }

    #[test]
    fn test_append_row_is_all_or_nothing() {
        let schema = Schema::new(vec![
            ("id".to_string(), ColumnType::Int32, false),
            ("name".to_string(), ColumnType::String, false),
        ]);
        let mut table = Table::new("users".to_string(), schema);

        let mut bad = HashMap::new();
        bad.insert("id".to_string(), ColumnValue::Int32(1));
        bad.insert("name".to_string(), ColumnValue::Int32(7));
        assert!(matches!(table.append_row(bad), Err(QueryError::TypeMismatch { .. })));

        let mut missing = HashMap::new();
        missing.insert("id".to_string(), ColumnValue::Int32(1));
        assert!(matches!(table.append_row(missing), Err(QueryError::InvalidArgument(_))));

        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column("id").unwrap().len(), 0);
    }

    #[test]
    fn test_unknown_column() {
        let table = Table::from_json("t", r#"[{"a": 1}]"#).unwrap();
        assert!(matches!(table.get_value(0, "b"), Err(QueryError::UnknownColumn(c)) if c == "b"));
        assert!(matches!(table.default_comparator("b"), Err(QueryError::UnknownColumn(_))));
    }

    #[test]
    fn test_from_json_keeps_key_order_and_types() {
        let json = r#"[
            {"name": "a", "score": 1.5, "rank": 3, "ok": true},
            {"name": null, "score": 2, "rank": 1, "ok": false}
        ]"#;
        let table = Table::from_json("t", json).unwrap();

        assert_eq!(table.schema().get_column_names(), vec!["name", "score", "rank", "ok"]);
        assert_eq!(table.schema().get_column_type("score"), Some(ColumnType::Float64));
        assert_eq!(table.schema().get_column_type("rank"), Some(ColumnType::Int64));
        assert_eq!(table.get_value(1, "score").unwrap(), &ColumnValue::Float64(2.0));
        assert!(table.get_value(1, "name").unwrap().is_null());
    }

    #[test]
    fn test_from_json_rejects_empty_array() {
        assert!(matches!(
            Table::from_json("t", "[]"),
            Err(QueryError::InvalidArgument(_))
        ));
        assert!(matches!(Table::from_json("t", "{"), Err(QueryError::Options(_))));
    }

    #[test]
    fn test_default_comparator_by_type() {
        let table = Table::from_json("t", r#"[{"s": "x", "n": 1}]"#).unwrap();
        let cmp = table.default_comparator("s").unwrap();
        assert_eq!(
            cmp.compare(
                &ColumnValue::String("a".to_string()),
                &ColumnValue::String("b".to_string())
            ),
            Ordering::Less
        );
        let cmp = table.default_comparator("n").unwrap();
        assert_eq!(
            cmp.compare(&ColumnValue::Int64(10), &ColumnValue::Int64(2)),
            Ordering::Greater
        );
    }
}
