//! Querying: turns grid state into the modifier pipeline applied to a table.
//!
//! The `QueryingController` owns one controller per query aspect and a
//! shared dirty flag. Aspects report changes through their `DirtyFlag`
//! handle; the flag is cleared only by `proceed` after the pipeline was
//! applied successfully.

pub mod filtering;
pub mod sorting;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::modifier::{ChainModifier, Modifier};
use crate::options::ColumnOptionsMap;
use crate::table::Table;
use crate::view::DerivedView;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub use filtering::FilteringController;
pub use sorting::{SortingController, SortingState};

/// Handle to the grid's "view is stale" flag.
///
/// Clones share the flag. Aspect controllers can only raise it.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag(Rc<Cell<bool>>);

impl DirtyFlag {
    pub fn mark(&self) {
        self.0.set(true);
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }

    pub(crate) fn clear(&self) {
        self.0.set(false);
    }
}

/// Contract shared by every query aspect (sorting, filtering, ...).
pub trait AspectController {
    /// (Re)derive state from column options.
    fn load_options(&mut self);

    /// The aspect's transformation, or `None` when it is inert.
    fn modifier(&self) -> Option<Modifier>;

    /// Whether options have been loaded at least once.
    fn is_configured(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Options not loaded yet.
    Unconfigured,
    /// The last computed view matches the current state.
    Idle,
    /// State changed since the last successful recompute.
    Dirty,
}

/// Coordinates the query aspects of one grid.
///
/// # Examples
///
/// ```
/// use livegrid::{GridOptions, QueryingController, Table};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let json = r#"[{"id": 1, "v": 5}, {"id": 2, "v": 9}, {"id": 3, "v": 1}]"#;
/// let table = Rc::new(Table::from_json("rows", json).unwrap());
/// let config = r#"{"columns": [{"id": "v", "sorting": {"order": "asc"}}]}"#;
/// let options = GridOptions::from_json(config).unwrap().into_column_map();
///
/// let mut querying = QueryingController::new(table, Rc::new(RefCell::new(options)));
/// querying.load_options();
/// assert!(querying.should_be_updated());
///
/// let view = querying.proceed(false).unwrap().unwrap();
/// assert_eq!(view.row_indices(), &[2, 0, 1]);
/// assert!(!querying.should_be_updated());
/// ```
pub struct QueryingController {
    table: Rc<Table>,
    options: Rc<RefCell<ColumnOptionsMap>>,
    dirty: DirtyFlag,
    diagnostics: Diagnostics,
    filtering: FilteringController,
    sorting: SortingController,
}

impl QueryingController {
    pub fn new(table: Rc<Table>, options: Rc<RefCell<ColumnOptionsMap>>) -> Self {
        let dirty = DirtyFlag::default();
        let diagnostics = Diagnostics::new();

        QueryingController {
            filtering: FilteringController::new(
                options.clone(),
                dirty.clone(),
                diagnostics.clone(),
            ),
            sorting: SortingController::new(options.clone(), dirty.clone(), diagnostics.clone()),
            table,
            options,
            dirty,
            diagnostics,
        }
    }

    pub fn table(&self) -> &Rc<Table> {
        &self.table
    }

    /// Replace the data table; the next `proceed` recomputes.
    pub fn set_table(&mut self, table: Rc<Table>) {
        self.table = table;
        self.dirty.mark();
    }

    pub fn options(&self) -> &Rc<RefCell<ColumnOptionsMap>> {
        &self.options
    }

    /// Swap in a whole new configuration and load it.
    pub fn replace_options(&mut self, options: ColumnOptionsMap) {
        *self.options.borrow_mut() = options;
        self.load_options();
    }

    pub fn sorting(&self) -> &SortingController {
        &self.sorting
    }

    pub fn sorting_mut(&mut self) -> &mut SortingController {
        &mut self.sorting
    }

    pub fn filtering(&self) -> &FilteringController {
        &self.filtering
    }

    pub fn filtering_mut(&mut self) -> &mut FilteringController {
        &mut self.filtering
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn should_be_updated(&self) -> bool {
        self.dirty.is_set()
    }

    pub fn state(&self) -> QueryState {
        if self.aspects().any(|aspect| !aspect.is_configured()) {
            QueryState::Unconfigured
        } else if self.dirty.is_set() {
            QueryState::Dirty
        } else {
            QueryState::Idle
        }
    }

    /// Load column options into every aspect.
    pub fn load_options(&mut self) {
        self.filtering.load_options();
        self.sorting.load_options();
    }

    /// Aspects in pipeline order: row-subsetting before ordering, so sorts
    /// only see rows that survive filtering.
    fn aspects(&self) -> impl Iterator<Item = &dyn AspectController> + '_ {
        [
            &self.filtering as &dyn AspectController,
            &self.sorting as &dyn AspectController,
        ]
        .into_iter()
    }

    /// Active modifiers in the order they are applied.
    pub fn modifiers(&self) -> Vec<Modifier> {
        self.aspects().filter_map(|aspect| aspect.modifier()).collect()
    }

    /// The full pipeline; empty (identity) when no aspect is active.
    pub fn pipeline(&self) -> ChainModifier {
        ChainModifier::new(self.modifiers())
    }

    /// Apply the pipeline to the table without touching the dirty flag.
    pub fn apply(&self) -> Result<DerivedView> {
        let pipeline = Modifier::Chain(self.pipeline());
        log::trace!("Applying pipeline to '{}': {:?}", self.table.name(), pipeline);
        Table::apply_modifier(&self.table, &pipeline)
    }

    /// Recompute the view if the state is dirty (or `force` is set).
    ///
    /// Returns `Ok(None)` when nothing needed recomputing. On success the
    /// dirty flag is cleared; on failure it stays set and the error is
    /// returned as is.
    pub fn proceed(&self, force: bool) -> Result<Option<DerivedView>> {
        if !force && !self.dirty.is_set() {
            return Ok(None);
        }

        let view = self.apply()?;
        log::debug!(
            "Recomputed view of '{}': {} of {} rows",
            self.table.name(),
            view.len(),
            self.table.row_count()
        );
        self.dirty.clear();
        Ok(Some(view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::natural_order;
    use crate::error::QueryError;
    use crate::expr::LiteralValue;
    use crate::modifier::{Comparator, SortOrder};
    use crate::options::{ColumnFilter, ColumnOptions, FilterCondition};

    fn table() -> Rc<Table> {
        let json = r#"[
            {"id": 1, "v": 5},
            {"id": 2, "v": 9},
            {"id": 3, "v": 1},
            {"id": 4, "v": 9},
            {"id": 5, "v": 3}
        ]"#;
        Rc::new(Table::from_json("rows", json).unwrap())
    }

    fn controller(columns: Vec<ColumnOptions>) -> QueryingController {
        let options = Rc::new(RefCell::new(ColumnOptionsMap::from_columns(columns)));
        QueryingController::new(table(), options)
    }

    #[test]
    fn test_state_machine() {
        let mut querying = controller(vec![]);
        assert_eq!(querying.state(), QueryState::Unconfigured);

        querying.load_options();
        assert_eq!(querying.state(), QueryState::Dirty);

        querying.proceed(false).unwrap();
        assert_eq!(querying.state(), QueryState::Idle);

        querying
            .sorting_mut()
            .set_sorting(Some(SortOrder::Ascending), Some("v"));
        assert_eq!(querying.state(), QueryState::Dirty);
    }

    #[test]
    fn test_proceed_skips_when_clean() {
        let mut querying = controller(vec![]);
        querying.load_options();
        assert!(querying.proceed(false).unwrap().is_some());
        assert!(querying.proceed(false).unwrap().is_none());
        assert!(querying.proceed(true).unwrap().is_some());
    }

    #[test]
    fn test_pipeline_order_filter_then_sort() {
        let mut querying = controller(vec![]);
        querying
            .sorting_mut()
            .set_sorting(Some(SortOrder::Descending), Some("v"));
        querying
            .filtering_mut()
            .set_column_filter(
                "v",
                Some(ColumnFilter::new(FilterCondition::LessThan, Some(LiteralValue::Int(9)))),
            )
            .unwrap();

        let modifiers = querying.modifiers();
        assert_eq!(modifiers.len(), 2);
        assert!(matches!(modifiers[0], Modifier::Filter(_)));
        assert!(matches!(modifiers[1], Modifier::Sort(_)));
    }

    #[test]
    fn test_failed_apply_keeps_flag() {
        let mut querying = controller(vec![]);
        querying
            .sorting_mut()
            .set_sorting(Some(SortOrder::Ascending), Some("missing"));

        let result = querying.proceed(false);
        assert!(matches!(result, Err(QueryError::UnknownColumn(c)) if c == "missing"));
        assert!(querying.should_be_updated());

        querying.sorting_mut().set_sorting(None, None);
        assert!(querying.proceed(false).unwrap().is_some());
        assert!(!querying.should_be_updated());
    }

    #[test]
    fn test_set_table_marks_dirty() {
        let mut querying = controller(vec![]);
        querying.load_options();
        querying.proceed(false).unwrap();

        let smaller = Rc::new(Table::from_json("rows", r#"[{"id": 1, "v": 2}]"#).unwrap());
        querying.set_table(smaller);
        assert!(querying.should_be_updated());
        assert_eq!(querying.proceed(false).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_replace_options_reloads() {
        let mut querying = controller(vec![]);
        querying.load_options();
        querying.proceed(false).unwrap();

        querying.replace_options(ColumnOptionsMap::from_columns(vec![
            ColumnOptions::new("v").with_sort_order(Some(SortOrder::Ascending)),
        ]));
        assert!(querying.should_be_updated());

        let view = querying.proceed(false).unwrap().unwrap();
        assert_eq!(view.row_indices(), &[2, 4, 0, 1, 3]);
    }

    #[test]
    fn test_replace_options_with_new_comparator_recomputes() {
        let sorted_by_v =
            || vec![ColumnOptions::new("v").with_sort_order(Some(SortOrder::Ascending))];
        let mut querying = controller(sorted_by_v());
        querying.load_options();
        querying.proceed(false).unwrap();

        let mut options = ColumnOptionsMap::from_columns(sorted_by_v());
        options.set_comparator("v", Some(Comparator::new(|a, b| natural_order(b, a))));
        querying.replace_options(options);
        assert!(querying.should_be_updated());

        let view = querying.proceed(false).unwrap().unwrap();
        assert_eq!(view.row_indices(), &[1, 3, 0, 4, 2]);
    }
}
