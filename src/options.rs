//! Declarative per-column grid options.
//!
//! Options are usually loaded from JSON:
//!
//! ```
//! use livegrid::{GridOptions, SortOrder};
//!
//! let options = GridOptions::from_json(r#"{
//!     "columns": [
//!         {"id": "name"},
//!         {"id": "v", "sorting": {"order": "desc"}},
//!         {"id": "qty", "filtering": {"condition": "lessThan", "value": 9}}
//!     ]
//! }"#).unwrap();
//!
//! let map = options.into_column_map();
//! assert_eq!(map.ids(), vec!["name", "v", "qty"]);
//! assert_eq!(map.get("v").unwrap().sort_order(), Some(SortOrder::Descending));
//! ```

use crate::error::Result;
use crate::expr::{CompareOp, Expr, LiteralValue};
use crate::modifier::{Comparator, SortOrder};
use indexmap::IndexMap;
use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// Sorting options of one column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingOptions {
    /// Declared default ordering.
    #[serde(default)]
    pub order: Option<SortOrder>,
    /// Whether the user may toggle sorting on this column.
    #[serde(default = "default_true")]
    pub sortable: bool,
    /// Custom comparison for this column's values; only set from code.
    #[serde(skip)]
    pub compare: Option<Comparator>,
}

impl Default for SortingOptions {
    fn default() -> Self {
        SortingOptions {
            order: None,
            sortable: true,
            compare: None,
        }
    }
}

/// Condition kinds available for column filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterCondition {
    Equals,
    DoesNotEqual,
    Contains,
    DoesNotContain,
    BeginsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    Empty,
    NotEmpty,
}

impl FilterCondition {
    pub fn requires_value(self) -> bool {
        !matches!(self, FilterCondition::Empty | FilterCondition::NotEmpty)
    }
}

/// A single condition on one column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnFilter {
    pub condition: FilterCondition,
    #[serde(default)]
    pub value: Option<LiteralValue>,
}

impl ColumnFilter {
    pub fn new(condition: FilterCondition, value: Option<LiteralValue>) -> Self {
        ColumnFilter { condition, value }
    }

    /// Build the row condition for `column`.
    ///
    /// Returns `None` when the condition needs a value and has none.
    pub fn to_expr(&self, column: &str) -> Option<Expr> {
        let empty = || {
            Expr::IsNull {
                column: column.to_string(),
            }
            .or(Expr::compare(column, CompareOp::Eq, LiteralValue::String(String::new())))
        };

        let op = match self.condition {
            FilterCondition::Empty => return Some(empty()),
            FilterCondition::NotEmpty => return Some(empty().negate()),
            FilterCondition::Equals => CompareOp::Eq,
            FilterCondition::DoesNotEqual => CompareOp::Ne,
            FilterCondition::Contains | FilterCondition::DoesNotContain => CompareOp::Contains,
            FilterCondition::BeginsWith => CompareOp::StartsWith,
            FilterCondition::EndsWith => CompareOp::EndsWith,
            FilterCondition::GreaterThan => CompareOp::Gt,
            FilterCondition::GreaterThanOrEqualTo => CompareOp::Ge,
            FilterCondition::LessThan => CompareOp::Lt,
            FilterCondition::LessThanOrEqualTo => CompareOp::Le,
        };

        let expr = Expr::compare(column, op, self.value.clone()?);
        if self.condition == FilterCondition::DoesNotContain {
            Some(expr.negate())
        } else {
            Some(expr)
        }
    }
}

/// Filtering options of one column.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilteringOptions {
    #[serde(default)]
    pub condition: Option<FilterCondition>,
    #[serde(default)]
    pub value: Option<LiteralValue>,
}

impl FilteringOptions {
    /// The declared column filter, if a condition is set.
    pub fn column_filter(&self) -> Option<ColumnFilter> {
        self.condition
            .map(|condition| ColumnFilter::new(condition, self.value.clone()))
    }
}

/// Options of one column.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColumnOptions {
    pub id: String,
    #[serde(default)]
    pub sorting: Option<SortingOptions>,
    #[serde(default)]
    pub filtering: Option<FilteringOptions>,
}

impl ColumnOptions {
    pub fn new(id: impl Into<String>) -> Self {
        ColumnOptions {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_sort_order(mut self, order: Option<SortOrder>) -> Self {
        self.sorting.get_or_insert_with(SortingOptions::default).order = order;
        self
    }

    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sorting.get_or_insert_with(SortingOptions::default).sortable = sortable;
        self
    }

    pub fn with_filter(mut self, filter: ColumnFilter) -> Self {
        self.filtering = Some(FilteringOptions {
            condition: Some(filter.condition),
            value: filter.value,
        });
        self
    }

    pub fn sort_order(&self) -> Option<SortOrder> {
        self.sorting.as_ref().and_then(|s| s.order)
    }

    pub fn is_sortable(&self) -> bool {
        self.sorting.as_ref().map_or(true, |s| s.sortable)
    }

    pub fn comparator(&self) -> Option<&Comparator> {
        self.sorting.as_ref().and_then(|s| s.compare.as_ref())
    }
}

/// Top-level grid options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridOptions {
    #[serde(default)]
    pub columns: Vec<ColumnOptions>,
}

impl GridOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_column_map(self) -> ColumnOptionsMap {
        ColumnOptionsMap::from_columns(self.columns)
    }
}

/// Column options keyed by column id, in declaration order.
///
/// Declaration order matters: it decides which column wins when several
/// declare a sort order.
#[derive(Debug, Clone, Default)]
pub struct ColumnOptionsMap {
    columns: IndexMap<String, ColumnOptions>,
}

impl ColumnOptionsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a declaration list. A repeated id keeps its first
    /// position and takes the last options given for it.
    pub fn from_columns(columns: Vec<ColumnOptions>) -> Self {
        let mut map = ColumnOptionsMap::new();
        for options in columns {
            if map.columns.contains_key(&options.id) {
                log::warn!(
                    "Column '{}' is declared more than once; using the last declaration",
                    options.id
                );
            }
            map.insert(options);
        }
        map
    }

    /// Insert or replace options; a replaced column keeps its position.
    pub fn insert(&mut self, options: ColumnOptions) -> Option<ColumnOptions> {
        self.columns.insert(options.id.clone(), options)
    }

    pub fn get(&self, id: &str) -> Option<&ColumnOptions> {
        self.columns.get(id)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &ColumnOptions)> + '_ {
        self.columns.iter().map(|(id, options)| (id.as_str(), options))
    }

    /// Register (or remove) the custom comparator of a column, creating
    /// the column entry if needed.
    pub fn set_comparator(&mut self, id: &str, compare: Option<Comparator>) {
        let options = self
            .columns
            .entry(id.to_string())
            .or_insert_with(|| ColumnOptions::new(id));
        options.sorting.get_or_insert_with(SortingOptions::default).compare = compare;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    #[test]
    fn test_deserialize_sorting_options() {
        let options = GridOptions::from_json(
            r#"{"columns": [
                {"id": "a", "sorting": {"order": "ascending", "sortable": false}},
                {"id": "b", "sorting": {"order": null}},
                {"id": "c", "sorting": {}}
            ]}"#,
        )
        .unwrap();

        let map = options.into_column_map();
        assert_eq!(map.get("a").unwrap().sort_order(), Some(SortOrder::Ascending));
        assert!(!map.get("a").unwrap().is_sortable());
        assert_eq!(map.get("b").unwrap().sort_order(), None);
        assert!(map.get("c").unwrap().is_sortable());
    }

    #[test]
    fn test_invalid_order_is_rejected() {
        let result =
            GridOptions::from_json(r#"{"columns": [{"id": "a", "sorting": {"order": "up"}}]}"#);
        assert!(matches!(result, Err(QueryError::Options(_))));
    }

    #[test]
    fn test_duplicate_ids_keep_first_position() {
        let map = ColumnOptionsMap::from_columns(vec![
            ColumnOptions::new("a").with_sort_order(Some(SortOrder::Ascending)),
            ColumnOptions::new("b"),
            ColumnOptions::new("a").with_sort_order(Some(SortOrder::Descending)),
        ]);
        assert_eq!(map.ids(), vec!["a", "b"]);
        assert_eq!(map.get("a").unwrap().sort_order(), Some(SortOrder::Descending));
    }

    #[test]
    fn test_set_comparator_creates_entry() {
        let mut map = ColumnOptionsMap::new();
        let cmp = Comparator::new(|a, b| crate::column::natural_order(b, a));
        map.set_comparator("x", Some(cmp.clone()));
        assert_eq!(map.get("x").unwrap().comparator(), Some(&cmp));

        map.set_comparator("x", None);
        assert!(map.get("x").unwrap().comparator().is_none());
    }

    #[test]
    fn test_column_filter_to_expr() {
        let filter = ColumnFilter::new(FilterCondition::LessThan, Some(LiteralValue::Int(9)));
        assert_eq!(
            filter.to_expr("v"),
            Some(Expr::compare("v", CompareOp::Lt, LiteralValue::Int(9)))
        );

        let missing = ColumnFilter::new(FilterCondition::Contains, None);
        assert!(missing.to_expr("v").is_none());

        let not_empty = ColumnFilter::new(FilterCondition::NotEmpty, None);
        assert!(matches!(not_empty.to_expr("v"), Some(Expr::Not(_))));
    }

    #[test]
    fn test_deserialize_filtering_options() {
        let options = GridOptions::from_json(
            r#"{"columns": [
                {"id": "name", "filtering": {"condition": "beginsWith", "value": "Al"}}
            ]}"#,
        )
        .unwrap();
        let filter = options.columns[0].filtering.as_ref().unwrap().column_filter().unwrap();
        assert_eq!(filter.condition, FilterCondition::BeginsWith);
        assert_eq!(filter.value, Some(LiteralValue::String("Al".to_string())));
    }
}
