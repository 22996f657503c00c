//! Modifiers: immutable descriptions of a table transformation.
//!
//! A modifier does not hold any rows. Applying it to a table (or to a view of
//! one) yields a new `DerivedView`; the same descriptor applied to the same
//! input always yields the same row order.

use crate::column::{natural_order, ColumnType, ColumnValue};
use crate::error::{QueryError, Result};
use crate::expr::Expr;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Sort order specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order (smallest first)
    #[serde(rename = "asc", alias = "ascending")]
    Ascending,
    /// Descending order (largest first)
    #[serde(rename = "desc", alias = "descending")]
    Descending,
}

impl SortOrder {
    /// Parse an optional order name as supplied by a host.
    ///
    /// `None` and `"none"` both mean "no ordering". Anything outside
    /// `asc`, `ascending`, `desc`, `descending`, `none` is rejected.
    pub fn parse_optional(order: Option<&str>) -> Result<Option<SortOrder>> {
        match order {
            None => Ok(None),
            Some(s) if s.eq_ignore_ascii_case("none") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            _ => Err(QueryError::InvalidArgument(format!(
                "Unknown sort order: '{}'. Use 'asc', 'desc' or 'none'",
                s
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("asc"),
            SortOrder::Descending => f.write_str("desc"),
        }
    }
}

pub type CompareFn = dyn Fn(&ColumnValue, &ColumnValue) -> Ordering;

/// A shared comparison function for column values.
///
/// Comparators are equal only when they share the same function, so a clone
/// equals its original while a freshly registered closure never equals the
/// one it replaced.
#[derive(Clone)]
pub struct Comparator(Rc<CompareFn>);

impl Comparator {
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&ColumnValue, &ColumnValue) -> Ordering + 'static,
    {
        Comparator(Rc::new(compare))
    }

    /// Default comparison for values of the given column type.
    pub fn for_type(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Float32 | ColumnType::Float64 => {
                Comparator::new(|a, b| match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    _ => natural_order(a, b),
                })
            }
            _ => Comparator::new(natural_order),
        }
    }

    pub fn compare(&self, a: &ColumnValue, b: &ColumnValue) -> Ordering {
        (self.0)(a, b)
    }
}

impl PartialEq for Comparator {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Comparator({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Orders rows by one column.
///
/// Nulls always go after non-null values, in both directions. Non-null
/// values are compared with `compare` when set, otherwise with the table's
/// default comparator for the column type. The sort is stable.
#[derive(Debug, Clone, PartialEq)]
pub struct SortModifier {
    pub order_by_column: String,
    pub direction: SortOrder,
    pub compare: Option<Comparator>,
}

impl SortModifier {
    pub fn new(order_by_column: impl Into<String>, direction: SortOrder) -> Self {
        SortModifier {
            order_by_column: order_by_column.into(),
            direction,
            compare: None,
        }
    }

    pub fn with_compare(mut self, compare: Option<Comparator>) -> Self {
        self.compare = compare;
        self
    }

    fn order_rows(&self, table: &Table, rows: Vec<usize>) -> Result<Vec<usize>> {
        let column = table.column(&self.order_by_column)?;
        let compare = match &self.compare {
            Some(compare) => compare.clone(),
            None => table.default_comparator(&self.order_by_column)?,
        };

        let mut keyed = rows
            .into_iter()
            .map(|row| column.get(row).map(|value| (row, value)))
            .collect::<Result<Vec<_>>>()?;

        keyed.sort_by(|(_, a), (_, b)| match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = compare.compare(a, b);
                match self.direction {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            }
        });

        Ok(keyed.into_iter().map(|(row, _)| row).collect())
    }
}

/// Keeps the rows for which `condition` holds, in their input order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterModifier {
    pub condition: Expr,
}

impl FilterModifier {
    pub fn new(condition: Expr) -> Self {
        FilterModifier { condition }
    }

    fn select_rows(&self, table: &Table, rows: Vec<usize>) -> Result<Vec<usize>> {
        for column in self.condition.columns() {
            table.column(&column)?;
        }

        Ok(rows
            .into_iter()
            .filter(|&row| self.condition.eval(&|name: &str| table.get_value(row, name).ok()))
            .collect())
    }
}

/// An ordered sequence of modifiers applied left to right.
///
/// The empty chain is the identity transformation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChainModifier {
    modifiers: Vec<Modifier>,
}

impl ChainModifier {
    pub fn new(modifiers: Vec<Modifier>) -> Self {
        ChainModifier { modifiers }
    }

    pub fn push(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }
}

/// Any transformation the data table knows how to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    Filter(FilterModifier),
    Sort(SortModifier),
    Chain(ChainModifier),
}

impl Modifier {
    /// Transform an ordered list of source row indices.
    pub(crate) fn apply_rows(&self, table: &Table, rows: Vec<usize>) -> Result<Vec<usize>> {
        match self {
            Modifier::Filter(filter) => filter.select_rows(table, rows),
            Modifier::Sort(sort) => sort.order_rows(table, rows),
            Modifier::Chain(chain) => chain
                .modifiers
                .iter()
                .try_fold(rows, |rows, modifier| modifier.apply_rows(table, rows)),
        }
    }
}

impl From<SortModifier> for Modifier {
    fn from(modifier: SortModifier) -> Self {
        Modifier::Sort(modifier)
    }
}

impl From<FilterModifier> for Modifier {
    fn from(modifier: FilterModifier) -> Self {
        Modifier::Filter(modifier)
    }
}

impl From<ChainModifier> for Modifier {
    fn from(modifier: ChainModifier) -> Self {
        Modifier::Chain(modifier)
    }
}
