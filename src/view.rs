/// LiveGrid View Implementation
///
/// A DerivedView is the read-only result of applying modifiers to a table.
/// It keeps the source table alive and maps view positions to source rows,
/// so the rows themselves are never copied or mutated.

use crate::column::ColumnValue;
use crate::error::{QueryError, Result};
use crate::modifier::Modifier;
use crate::table::Table;
use std::collections::HashMap;
use std::rc::Rc;

/// Ordered subset of a table's rows.
///
/// # Examples
///
/// ```
/// use livegrid::{parse_expr, DerivedView, FilterModifier, Modifier, Table};
/// use std::rc::Rc;
///
/// let json = r#"[{"id": 1, "v": 5}, {"id": 2, "v": 9}, {"id": 3, "v": 1}]"#;
/// let table = Rc::new(Table::from_json("rows", json).unwrap());
///
/// let view = DerivedView::identity(table.clone());
/// assert_eq!(view.len(), 3);
///
/// let filter = Modifier::Filter(FilterModifier::new(parse_expr("v < 9").unwrap()));
/// let filtered = view.apply(&filter).unwrap();
/// assert_eq!(filtered.row_indices(), &[0, 2]);
/// assert_eq!(filtered.get_value(1, "id").unwrap().as_i64(), Some(3));
/// ```
#[derive(Debug, Clone)]
pub struct DerivedView {
    table: Rc<Table>,
    /// rows[view_pos] = source row index
    rows: Vec<usize>,
}

impl DerivedView {
    /// Every row of `table`, in source order.
    pub fn identity(table: Rc<Table>) -> Self {
        let rows = (0..table.row_count()).collect();
        DerivedView { table, rows }
    }

    /// Apply a further modifier, producing a new view over the same table.
    pub fn apply(&self, modifier: &Modifier) -> Result<DerivedView> {
        let rows = modifier.apply_rows(&self.table, self.rows.clone())?;
        Ok(DerivedView {
            table: Rc::clone(&self.table),
            rows,
        })
    }

    pub fn table(&self) -> &Rc<Table> {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Source row indices in view order.
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    /// Returns the source table row index for a given view position
    pub fn get_parent_index(&self, view_index: usize) -> Option<usize> {
        self.rows.get(view_index).copied()
    }

    fn parent_index(&self, index: usize) -> Result<usize> {
        self.get_parent_index(index).ok_or(QueryError::RowOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    pub fn get_row(&self, index: usize) -> Result<HashMap<String, ColumnValue>> {
        self.table.get_row(self.parent_index(index)?)
    }

    pub fn get_value(&self, row: usize, column: &str) -> Result<&ColumnValue> {
        self.table.get_value(self.parent_index(row)?, column)
    }

    /// Values of one column in view order.
    pub fn column_values(&self, column: &str) -> Result<Vec<&ColumnValue>> {
        let col = self.table.column(column)?;
        self.rows.iter().map(|&row| col.get(row)).collect()
    }
}
