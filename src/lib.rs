//! LiveGrid - querying pipeline for data grids
//!
//! Column options and API calls are turned into a chain of modifiers
//! (filter first, then sort) that derives a view over an immutable
//! columnar table. The `QueryingController` tracks whether the derived
//! view is stale and recomputes it on `proceed`.

pub mod column;
pub mod diagnostics;
pub mod error;
pub mod expr;
pub mod modifier;
pub mod options;
pub mod querying;
pub mod table;
pub mod view;

pub use column::{natural_order, Column, ColumnType, ColumnValue};
pub use diagnostics::{Diagnostics, Warning};
pub use error::{QueryError, Result};
pub use expr::{parse_expr, CompareOp, Expr, LiteralValue};
pub use modifier::{ChainModifier, Comparator, FilterModifier, Modifier, SortModifier, SortOrder};
pub use options::{
    ColumnFilter, ColumnOptions, ColumnOptionsMap, FilterCondition, FilteringOptions, GridOptions,
    SortingOptions,
};
pub use querying::{
    AspectController, DirtyFlag, FilteringController, QueryState, QueryingController,
    SortingController, SortingState,
};
pub use table::{Schema, Table};
pub use view::DerivedView;
