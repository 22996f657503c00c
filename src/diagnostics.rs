//! Non-fatal warnings reported to the host.
//!
//! Every warning is also written to the `log` facade at `warn` level, so a
//! host that only installs a logger still sees them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// More than one column declares a sort order. Only `winner` drives
    /// sorting; `ignored` lists the other declaring columns, last declared
    /// first.
    SortingConflict { winner: String, ignored: Vec<String> },
    /// A declared column filter could not be turned into a condition and
    /// was skipped.
    InvalidFilter { column: String, reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SortingConflict { winner, ignored } => write!(
                f,
                "Only one column can be sorted at a time; \
                 sorting by the last declared column '{}' and ignoring {}",
                winner,
                ignored
                    .iter()
                    .map(|c| format!("'{}'", c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Warning::InvalidFilter { column, reason } => {
                write!(f, "Skipping filter on column '{}': {}", column, reason)
            }
        }
    }
}

/// Shared diagnostic channel. Clones report into the same list.
///
/// Warnings are kept until the host drains them with `take()`; a host that
/// only reads `warnings()` sees the list grow with every new warning.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Rc<RefCell<Vec<Warning>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&self, warning: Warning) {
        log::warn!("{}", warning);
        self.warnings.borrow_mut().push(warning);
    }

    /// Warnings reported since the last `take()`.
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.borrow().clone()
    }

    /// Drain the reported warnings.
    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.borrow_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.borrow().is_empty()
    }
}
