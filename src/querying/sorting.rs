//! Sorting aspect: decides which single column orders the grid.
//!
//! Three inputs are reconciled here: direct API calls (`set_sorting`,
//! `toggle_sorting`), the sort orders declared in column options, and the
//! state recorded from the previous call.

use super::{AspectController, DirtyFlag};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{QueryError, Result};
use crate::modifier::{Modifier, SortModifier, SortOrder};
use crate::options::{ColumnOptions, ColumnOptionsMap};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Which column sorts the grid, and how.
///
/// `order: None` means no ordering; a state with a column but no order is
/// valid and behaves like no sort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingState {
    pub column_id: Option<String>,
    pub order: Option<SortOrder>,
}

impl SortingState {
    pub fn new(order: Option<SortOrder>, column_id: Option<&str>) -> Self {
        SortingState {
            column_id: column_id.map(str::to_string),
            order,
        }
    }

    /// True when this state actually reorders rows.
    pub fn is_active(&self) -> bool {
        self.column_id.is_some() && self.order.is_some()
    }
}

pub struct SortingController {
    options: Rc<RefCell<ColumnOptionsMap>>,
    dirty: DirtyFlag,
    diagnostics: Diagnostics,
    /// Last state set through any path; `None` until the first set.
    current_sorting: Option<SortingState>,
    /// State derived from column options at the last load that changed it.
    initial_sorting: Option<SortingState>,
    modifier: Option<SortModifier>,
    /// Conflict reported for the current configuration, if any.
    reported_conflict: Option<Warning>,
}

impl SortingController {
    pub fn new(
        options: Rc<RefCell<ColumnOptionsMap>>,
        dirty: DirtyFlag,
        diagnostics: Diagnostics,
    ) -> Self {
        SortingController {
            options,
            dirty,
            diagnostics,
            current_sorting: None,
            initial_sorting: None,
            modifier: None,
            reported_conflict: None,
        }
    }

    pub fn current_sorting(&self) -> Option<&SortingState> {
        self.current_sorting.as_ref()
    }

    pub fn initial_sorting(&self) -> Option<&SortingState> {
        self.initial_sorting.as_ref()
    }

    pub fn modifier(&self) -> Option<&SortModifier> {
        self.modifier.as_ref()
    }

    /// Set the active sort.
    ///
    /// Marks the grid dirty when `(column_id, order)` differs from the
    /// current state (including the first call). The modifier is rebuilt
    /// either way so it picks up comparator changes in the column options.
    /// Column ids are not checked here; an unknown column fails when the
    /// modifier is applied.
    pub fn set_sorting(&mut self, order: Option<SortOrder>, column_id: Option<&str>) {
        let next = SortingState::new(order, column_id);

        if self.current_sorting.as_ref() != Some(&next) {
            log::debug!(
                "Sorting changed: {:?} -> {:?}",
                self.current_sorting,
                next
            );
            self.dirty.mark();
            self.current_sorting = Some(next);
        }

        self.modifier = self.create_modifier();
    }

    /// `set_sorting` for untyped input such as `"asc"`, `"desc"` or `"none"`.
    ///
    /// An unrecognized order fails with `InvalidArgument` and leaves the
    /// state untouched.
    pub fn set_sorting_str(&mut self, order: Option<&str>, column_id: Option<&str>) -> Result<()> {
        let order = SortOrder::parse_optional(order)?;
        self.set_sorting(order, column_id);
        Ok(())
    }

    /// Advance a column through unsorted, ascending, descending and back
    /// to unsorted, as a header click would. Another column that was
    /// sorting is replaced and this one starts at ascending.
    pub fn toggle_sorting(&mut self, column_id: &str) -> Result<Option<SortOrder>> {
        let sortable = self
            .options
            .borrow()
            .get(column_id)
            .map_or(true, ColumnOptions::is_sortable);
        if !sortable {
            return Err(QueryError::InvalidArgument(format!(
                "Column '{}' is not sortable",
                column_id
            )));
        }

        let current = self
            .current_sorting
            .as_ref()
            .filter(|state| state.column_id.as_deref() == Some(column_id))
            .and_then(|state| state.order);

        let next = match current {
            None => Some(SortOrder::Ascending),
            Some(SortOrder::Ascending) => Some(SortOrder::Descending),
            Some(SortOrder::Descending) => None,
        };

        self.set_sorting(next, Some(column_id));
        Ok(next)
    }

    /// Derive the sort declared by column options and apply it if it
    /// differs from what the previous load derived.
    ///
    /// The modifier is rebuilt on every load, so a comparator swapped in the
    /// column options is picked up (and marks the grid dirty) even when the
    /// declared sort is unchanged.
    ///
    /// Only one column can sort. When several declare an order, the last
    /// declared one wins and the rest are reported once as a
    /// `SortingConflict` warning.
    pub fn load_options(&mut self) {
        let (derived, conflict) = self.scan_options();

        if conflict != self.reported_conflict {
            if let Some(warning) = &conflict {
                self.diagnostics.warn(warning.clone());
            }
            self.reported_conflict = conflict;
        }

        if self.initial_sorting.as_ref() != Some(&derived) {
            log::debug!("Sorting options loaded: {:?}", derived);
            self.set_sorting(derived.order, derived.column_id.as_deref());
            self.initial_sorting = Some(derived);
        }

        // the comparator of the sorted column may have been swapped
        let modifier = self.create_modifier();
        if modifier != self.modifier {
            log::debug!("Sort modifier changed on reload: {:?}", modifier);
            self.dirty.mark();
            self.modifier = modifier;
        }
    }

    fn scan_options(&self) -> (SortingState, Option<Warning>) {
        let options = self.options.borrow();
        let mut declared = options
            .iter()
            .rev()
            .filter_map(|(id, column)| column.sort_order().map(|order| (id, order)));

        let Some((winner, order)) = declared.next() else {
            return (SortingState::default(), None);
        };

        let ignored: Vec<String> = declared.map(|(id, _)| id.to_string()).collect();
        let state = SortingState::new(Some(order), Some(winner));
        let conflict = (!ignored.is_empty()).then(|| Warning::SortingConflict {
            winner: winner.to_string(),
            ignored,
        });

        (state, conflict)
    }

    fn create_modifier(&self) -> Option<SortModifier> {
        let state = self.current_sorting.as_ref()?;
        let column_id = state.column_id.as_deref()?;
        let order = state.order?;

        let compare = self
            .options
            .borrow()
            .get(column_id)
            .and_then(|column| column.comparator().cloned());

        Some(SortModifier::new(column_id, order).with_compare(compare))
    }
}

impl AspectController for SortingController {
    fn load_options(&mut self) {
        SortingController::load_options(self);
    }

    fn modifier(&self) -> Option<Modifier> {
        self.modifier.clone().map(Modifier::Sort)
    }

    fn is_configured(&self) -> bool {
        self.initial_sorting.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::natural_order;
    use crate::modifier::Comparator;

    struct Fixture {
        options: Rc<RefCell<ColumnOptionsMap>>,
        dirty: DirtyFlag,
        diagnostics: Diagnostics,
        sorting: SortingController,
    }

    fn fixture(columns: Vec<ColumnOptions>) -> Fixture {
        let options = Rc::new(RefCell::new(ColumnOptionsMap::from_columns(columns)));
        let dirty = DirtyFlag::default();
        let diagnostics = Diagnostics::new();
        let sorting = SortingController::new(options.clone(), dirty.clone(), diagnostics.clone());
        Fixture {
            options,
            dirty,
            diagnostics,
            sorting,
        }
    }

    #[test]
    fn test_set_sorting_marks_dirty_only_on_change() {
        let mut f = fixture(vec![]);
        f.sorting.set_sorting(Some(SortOrder::Ascending), Some("v"));
        assert!(f.dirty.is_set());
        let first = f.sorting.modifier().cloned();

        f.dirty.clear();
        f.sorting.set_sorting(Some(SortOrder::Ascending), Some("v"));
        assert!(!f.dirty.is_set());
        assert_eq!(f.sorting.modifier().cloned(), first);

        f.sorting.set_sorting(Some(SortOrder::Descending), Some("v"));
        assert!(f.dirty.is_set());
        f.sorting.set_sorting(Some(SortOrder::Descending), Some("v"));
        assert!(f.dirty.is_set(), "dirty stays set until cleared");
    }

    #[test]
    fn test_first_set_counts_as_change() {
        let mut f = fixture(vec![]);
        f.sorting.set_sorting(None, None);
        assert!(f.dirty.is_set());
        assert_eq!(f.sorting.current_sorting(), Some(&SortingState::default()));
        assert!(f.sorting.modifier().is_none());
    }

    #[test]
    fn test_inert_states_have_no_modifier() {
        let mut f = fixture(vec![]);
        f.sorting.set_sorting(None, Some("v"));
        assert!(f.sorting.modifier().is_none());
        assert!(!f.sorting.current_sorting().unwrap().is_active());

        f.sorting.set_sorting(Some(SortOrder::Ascending), None);
        assert!(f.sorting.modifier().is_none());
    }

    #[test]
    fn test_set_sorting_str_validates() {
        let mut f = fixture(vec![]);
        f.sorting.set_sorting_str(Some("desc"), Some("v")).unwrap();
        assert_eq!(
            f.sorting.modifier(),
            Some(&SortModifier::new("v", SortOrder::Descending))
        );

        f.dirty.clear();
        let err = f.sorting.set_sorting_str(Some("upward"), Some("w"));
        assert!(matches!(err, Err(QueryError::InvalidArgument(_))));
        assert!(!f.dirty.is_set());
        assert_eq!(
            f.sorting.current_sorting(),
            Some(&SortingState::new(Some(SortOrder::Descending), Some("v")))
        );
    }

    #[test]
    fn test_modifier_picks_up_comparator_changes() {
        let mut f = fixture(vec![ColumnOptions::new("v")]);
        f.sorting.set_sorting(Some(SortOrder::Ascending), Some("v"));
        assert!(f.sorting.modifier().unwrap().compare.is_none());

        let reversed = Comparator::new(|a, b| natural_order(b, a));
        f.options.borrow_mut().set_comparator("v", Some(reversed.clone()));
        f.dirty.clear();
        f.sorting.set_sorting(Some(SortOrder::Ascending), Some("v"));

        assert!(!f.dirty.is_set());
        assert_eq!(f.sorting.modifier().unwrap().compare, Some(reversed));
    }

    #[test]
    fn test_reload_picks_up_swapped_comparator() {
        let mut f =
            fixture(vec![ColumnOptions::new("v").with_sort_order(Some(SortOrder::Ascending))]);
        f.sorting.load_options();
        assert!(f.sorting.modifier().unwrap().compare.is_none());

        let reversed = Comparator::new(|a, b| natural_order(b, a));
        f.options.borrow_mut().set_comparator("v", Some(reversed.clone()));
        f.dirty.clear();
        f.sorting.load_options();

        assert_eq!(f.sorting.modifier().unwrap().compare, Some(reversed));
        assert!(f.dirty.is_set());

        f.dirty.clear();
        f.sorting.load_options();
        assert!(!f.dirty.is_set());
    }

    #[test]
    fn test_load_options_last_declared_wins() {
        let mut f = fixture(vec![
            ColumnOptions::new("a").with_sort_order(Some(SortOrder::Ascending)),
            ColumnOptions::new("b").with_sort_order(Some(SortOrder::Descending)),
            ColumnOptions::new("c"),
        ]);
        f.sorting.load_options();

        assert_eq!(
            f.sorting.current_sorting(),
            Some(&SortingState::new(Some(SortOrder::Descending), Some("b")))
        );
        assert_eq!(
            f.diagnostics.warnings(),
            vec![Warning::SortingConflict {
                winner: "b".to_string(),
                ignored: vec!["a".to_string()],
            }]
        );
    }

    #[test]
    fn test_load_options_reports_every_ignored_column() {
        let mut f = fixture(vec![
            ColumnOptions::new("a").with_sort_order(Some(SortOrder::Ascending)),
            ColumnOptions::new("b").with_sort_order(Some(SortOrder::Ascending)),
            ColumnOptions::new("c").with_sort_order(Some(SortOrder::Descending)),
        ]);
        f.sorting.load_options();

        assert_eq!(
            f.diagnostics.take(),
            vec![Warning::SortingConflict {
                winner: "c".to_string(),
                ignored: vec!["b".to_string(), "a".to_string()],
            }]
        );
    }

    #[test]
    fn test_reload_unchanged_options_is_quiet() {
        let mut f = fixture(vec![
            ColumnOptions::new("a").with_sort_order(Some(SortOrder::Ascending)),
            ColumnOptions::new("b").with_sort_order(Some(SortOrder::Ascending)),
        ]);
        f.sorting.load_options();
        f.dirty.clear();

        f.sorting.load_options();
        assert!(!f.dirty.is_set());
        assert_eq!(f.diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_reload_keeps_newer_api_state() {
        let mut f =
            fixture(vec![ColumnOptions::new("a").with_sort_order(Some(SortOrder::Ascending))]);
        f.sorting.load_options();
        f.sorting.set_sorting(Some(SortOrder::Descending), Some("z"));
        f.dirty.clear();

        f.sorting.load_options();
        assert_eq!(
            f.sorting.current_sorting(),
            Some(&SortingState::new(Some(SortOrder::Descending), Some("z")))
        );
        assert!(!f.dirty.is_set());

        // a real configuration change does take over
        f.options
            .borrow_mut()
            .insert(ColumnOptions::new("a").with_sort_order(Some(SortOrder::Descending)));
        f.sorting.load_options();
        assert_eq!(
            f.sorting.current_sorting(),
            Some(&SortingState::new(Some(SortOrder::Descending), Some("a")))
        );
        assert!(f.dirty.is_set());
    }

    #[test]
    fn test_empty_options_yield_no_sort() {
        let mut f = fixture(vec![]);
        assert!(!f.sorting.is_configured());
        f.sorting.load_options();

        assert!(f.sorting.is_configured());
        assert_eq!(f.sorting.initial_sorting(), Some(&SortingState::default()));
        assert!(f.sorting.modifier().is_none());
        assert!(f.diagnostics.is_empty());
    }

    #[test]
    fn test_toggle_cycles_and_respects_sortable() {
        let mut f = fixture(vec![ColumnOptions::new("locked").with_sortable(false)]);

        assert_eq!(f.sorting.toggle_sorting("v").unwrap(), Some(SortOrder::Ascending));
        assert_eq!(f.sorting.toggle_sorting("v").unwrap(), Some(SortOrder::Descending));
        assert_eq!(f.sorting.toggle_sorting("w").unwrap(), Some(SortOrder::Ascending));
        assert_eq!(f.sorting.toggle_sorting("w").unwrap(), Some(SortOrder::Descending));
        assert_eq!(f.sorting.toggle_sorting("w").unwrap(), None);
        assert!(f.sorting.modifier().is_none());

        let before = f.sorting.current_sorting().cloned();
        assert!(matches!(
            f.sorting.toggle_sorting("locked"),
            Err(QueryError::InvalidArgument(_))
        ));
        assert_eq!(f.sorting.current_sorting().cloned(), before);
    }

    #[test]
    fn test_state_serializes_for_ui() {
        let state = SortingState::new(Some(SortOrder::Descending), Some("v"));
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"columnId":"v","order":"desc"}"#
        );
    }
}
