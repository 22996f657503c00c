//! Filtering aspect: which rows are shown at all.
//!
//! Column filters come from column options or from `set_column_filter`; a
//! free-form condition can be added with `set_expression`. All active
//! conditions must hold for a row to stay.

use super::{AspectController, DirtyFlag};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{QueryError, Result};
use crate::expr::{parse_expr, Expr};
use crate::modifier::{FilterModifier, Modifier};
use crate::options::{ColumnFilter, ColumnOptionsMap, FilteringOptions};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

pub struct FilteringController {
    options: Rc<RefCell<ColumnOptionsMap>>,
    dirty: DirtyFlag,
    diagnostics: Diagnostics,
    column_filters: IndexMap<String, ColumnFilter>,
    expression: Option<Expr>,
    initial_filters: Option<IndexMap<String, ColumnFilter>>,
    modifier: Option<FilterModifier>,
    reported_invalid: Vec<Warning>,
}

impl FilteringController {
    pub fn new(
        options: Rc<RefCell<ColumnOptionsMap>>,
        dirty: DirtyFlag,
        diagnostics: Diagnostics,
    ) -> Self {
        FilteringController {
            options,
            dirty,
            diagnostics,
            column_filters: IndexMap::new(),
            expression: None,
            initial_filters: None,
            modifier: None,
            reported_invalid: Vec::new(),
        }
    }

    pub fn column_filters(&self) -> &IndexMap<String, ColumnFilter> {
        &self.column_filters
    }

    pub fn expression(&self) -> Option<&Expr> {
        self.expression.as_ref()
    }

    pub fn modifier(&self) -> Option<&FilterModifier> {
        self.modifier.as_ref()
    }

    /// Set or remove the filter of one column.
    ///
    /// A condition that needs a value but has none is rejected with
    /// `InvalidArgument` before anything changes.
    pub fn set_column_filter(
        &mut self,
        column_id: &str,
        filter: Option<ColumnFilter>,
    ) -> Result<()> {
        let changed = match filter {
            Some(filter) => {
                if filter.to_expr(column_id).is_none() {
                    return Err(QueryError::InvalidArgument(format!(
                        "Filter condition {:?} on column '{}' requires a value",
                        filter.condition, column_id
                    )));
                }
                if self.column_filters.get(column_id) == Some(&filter) {
                    false
                } else {
                    self.column_filters.insert(column_id.to_string(), filter);
                    true
                }
            }
            None => self.column_filters.shift_remove(column_id).is_some(),
        };

        if changed {
            log::debug!("Filter on column '{}' changed", column_id);
            self.dirty.mark();
        }
        self.modifier = self.create_modifier();
        Ok(())
    }

    pub fn clear_column_filter(&mut self, column_id: &str) {
        if self.column_filters.shift_remove(column_id).is_some() {
            self.dirty.mark();
        }
        self.modifier = self.create_modifier();
    }

    /// Drop every column filter and the expression.
    pub fn clear_all(&mut self) {
        if !self.column_filters.is_empty() || self.expression.is_some() {
            self.column_filters.clear();
            self.expression = None;
            self.dirty.mark();
        }
        self.modifier = self.create_modifier();
    }

    /// Set (or clear with `None`) a free-form condition such as
    /// `"v < 9 AND name CONTAINS 'a'"`. Parse errors leave the state as is.
    pub fn set_expression(&mut self, expression: Option<&str>) -> Result<()> {
        let expression = expression.map(parse_expr).transpose()?;

        if expression != self.expression {
            log::debug!(
                "Filter expression changed: {}",
                expression.as_ref().map_or_else(|| "none".to_string(), Expr::to_string)
            );
            self.expression = expression;
            self.dirty.mark();
        }
        self.modifier = self.create_modifier();
        Ok(())
    }

    /// Collect the column filters declared in options and install them if
    /// they differ from what the previous load collected.
    pub fn load_options(&mut self) {
        let (derived, invalid) = self.scan_options();

        if invalid != self.reported_invalid {
            for warning in &invalid {
                self.diagnostics.warn(warning.clone());
            }
            self.reported_invalid = invalid;
        }

        if self.initial_filters.as_ref() != Some(&derived) {
            log::debug!("Filtering options loaded: {} column filter(s)", derived.len());
            if derived != self.column_filters {
                self.column_filters = derived.clone();
                self.dirty.mark();
            }
            self.initial_filters = Some(derived);
        }
        self.modifier = self.create_modifier();
    }

    fn scan_options(&self) -> (IndexMap<String, ColumnFilter>, Vec<Warning>) {
        let options = self.options.borrow();
        let mut filters = IndexMap::new();
        let mut invalid = Vec::new();

        for (id, column) in options.iter() {
            let declared = column
                .filtering
                .as_ref()
                .and_then(FilteringOptions::column_filter);
            let Some(filter) = declared else {
                continue;
            };
            if filter.to_expr(id).is_some() {
                filters.insert(id.to_string(), filter);
            } else {
                invalid.push(Warning::InvalidFilter {
                    column: id.to_string(),
                    reason: format!("condition {:?} requires a value", filter.condition),
                });
            }
        }

        (filters, invalid)
    }

    fn create_modifier(&self) -> Option<FilterModifier> {
        self.column_filters
            .iter()
            .filter_map(|(column, filter)| filter.to_expr(column))
            .chain(self.expression.clone())
            .reduce(Expr::and)
            .map(FilterModifier::new)
    }
}

impl AspectController for FilteringController {
    fn load_options(&mut self) {
        FilteringController::load_options(self);
    }

    fn modifier(&self) -> Option<Modifier> {
        self.modifier.clone().map(Modifier::Filter)
    }

    fn is_configured(&self) -> bool {
        self.initial_filters.is_some()
    }
}
