//! Outcome of a finished run.

use super::run::RunState;
use crate::catalog::SchemaVersion;

/// Version change of one upgraded component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentOutcome {
    /// Component name.
    pub component: String,
    /// Version before the run.
    pub from: SchemaVersion,
    /// Version after the run.
    pub to: SchemaVersion,
    /// Number of migrations that ran.
    pub migrations_applied: usize,
}

/// Result of a migration run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// Final state.
    pub state: RunState,
    /// Whether everything was rolled back at the end.
    pub dry_run: bool,
    /// Upgraded components, dependency order.
    pub components: Vec<ComponentOutcome>,
    /// Components that received their first record.
    pub initialised: Vec<String>,
    /// Scheduled operations flushed from the phase queue.
    pub operations_flushed: usize,
}

impl MigrationReport {
    /// Total migrations applied.
    pub fn migrations_applied(&self) -> usize {
        self.components.iter().map(|c| c.migrations_applied).sum()
    }

    /// Check if the run changed nothing.
    pub fn is_noop(&self) -> bool {
        self.components.is_empty() && self.initialised.is_empty()
    }
}
