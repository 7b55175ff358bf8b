//! Migrations: versioned units of schema change owned by a component.
//!
//! A migration comes in one of two styles:
//!
//! | Style | Hooks | Behavior |
//! |-------|-------|----------|
//! | **Direct** | `upgrade`, `upgrade_cleanup` | Runs operations immediately through the executor |
//! | **Scheduled** | `schedule_upgrades` | Registers phase-tagged operations, flushed after all upgrades |
//!
//! Components declare migrations through [`MigrationDescriptor`]s. A fresh
//! [`Migration`] is instantiated from each descriptor for every run.
//!
//! # Example
//!
//! ```ignore
//! use strata_core::migration::{DirectMigration, MigrationContext, MigrationDescriptor};
//!
//! struct AddEmail;
//!
//! impl DirectMigration for AddEmail {
//!     fn upgrade(&mut self, ctx: &mut MigrationContext<'_>) -> Result<(), BoxError> {
//!         ctx.execute(&SchemaOperation::new("add_column", "user").with_arg("name", "email"))
//!     }
//! }
//!
//! let descriptor = MigrationDescriptor::direct("add_email", || AddEmail);
//! ```

mod declarative;

pub use declarative::{OperationMigration, PhasedMigration};

use crate::catalog::SchemaVersion;
use crate::error::BoxError;
use crate::executor::{SchemaExecutor, SchemaOperation};
use crate::phase::PhaseQueue;
use std::fmt;
use std::sync::Arc;

/// A migration that changes the schema immediately.
pub trait DirectMigration {
    /// Apply the forward changes.
    fn upgrade(&mut self, ctx: &mut MigrationContext<'_>) -> Result<(), BoxError>;

    /// Apply deferred changes once every component in the run has upgraded.
    fn upgrade_cleanup(&mut self, _ctx: &mut MigrationContext<'_>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A migration that only registers phase-tagged operations.
pub trait ScheduledMigration {
    /// Register operations with the run's queue.
    fn schedule_upgrades(&mut self, queue: &mut PhaseQueue) -> Result<(), BoxError>;
}

/// The two migration styles.
pub enum MigrationKind {
    /// Immediate execution.
    Direct(Box<dyn DirectMigration>),
    /// Deferred, phase-ordered execution.
    Scheduled(Box<dyn ScheduledMigration>),
}

impl MigrationKind {
    /// The style of this migration.
    pub fn style(&self) -> MigrationStyle {
        match self {
            MigrationKind::Direct(_) => MigrationStyle::Direct,
            MigrationKind::Scheduled(_) => MigrationStyle::Scheduled,
        }
    }
}

impl fmt::Debug for MigrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MigrationKind::{}", self.style())
    }
}

/// Style tag of a migration, known without instantiating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStyle {
    /// See [`DirectMigration`].
    Direct,
    /// See [`ScheduledMigration`].
    Scheduled,
}

impl fmt::Display for MigrationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStyle::Direct => write!(f, "direct"),
            MigrationStyle::Scheduled => write!(f, "scheduled"),
        }
    }
}

type Factory = Arc<dyn Fn() -> MigrationKind + Send + Sync>;

/// Declaration of a migration inside a component's version history.
#[derive(Clone)]
pub struct MigrationDescriptor {
    name: String,
    style: MigrationStyle,
    factory: Factory,
}

impl MigrationDescriptor {
    /// Declare a direct migration.
    pub fn direct<M, F>(name: impl Into<String>, factory: F) -> Self
    where
        M: DirectMigration + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            style: MigrationStyle::Direct,
            factory: Arc::new(move || MigrationKind::Direct(Box::new(factory()))),
        }
    }

    /// Declare a scheduled migration.
    pub fn scheduled<M, F>(name: impl Into<String>, factory: F) -> Self
    where
        M: ScheduledMigration + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            style: MigrationStyle::Scheduled,
            factory: Arc::new(move || MigrationKind::Scheduled(Box::new(factory()))),
        }
    }

    /// Migration name, unique within its component.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared style.
    pub fn style(&self) -> MigrationStyle {
        self.style
    }

    /// Build a fresh instance.
    pub fn instantiate(&self) -> MigrationKind {
        (self.factory)()
    }
}

impl fmt::Debug for MigrationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDescriptor")
            .field("name", &self.name)
            .field("style", &self.style)
            .finish()
    }
}

/// A migration instantiated for one run.
#[derive(Debug)]
pub struct Migration {
    /// Owning component.
    pub component: String,
    /// Version transition this migration implements.
    pub version: SchemaVersion,
    /// Declaration order within the component.
    pub ordering_index: usize,
    /// Migration name.
    pub name: String,
    /// The instance.
    pub kind: MigrationKind,
}

impl Migration {
    /// Instantiate a descriptor.
    pub fn instantiate(
        component: impl Into<String>,
        version: SchemaVersion,
        ordering_index: usize,
        descriptor: &MigrationDescriptor,
    ) -> Self {
        Self {
            component: component.into(),
            version,
            ordering_index,
            name: descriptor.name().to_string(),
            kind: descriptor.instantiate(),
        }
    }

    /// `component/name` label for logs and errors.
    pub fn label(&self) -> String {
        format!("{}/{}", self.component, self.name)
    }
}

/// Handle passed to direct migrations while they run.
pub struct MigrationContext<'a> {
    component: &'a str,
    migration: &'a str,
    installed: &'a SchemaVersion,
    target: &'a SchemaVersion,
    executor: &'a mut dyn SchemaExecutor,
    executed: usize,
}

impl<'a> MigrationContext<'a> {
    /// Create a context for one hook invocation.
    pub fn new(
        component: &'a str,
        migration: &'a str,
        installed: &'a SchemaVersion,
        target: &'a SchemaVersion,
        executor: &'a mut dyn SchemaExecutor,
    ) -> Self {
        Self {
            component,
            migration,
            installed,
            target,
            executor,
            executed: 0,
        }
    }

    /// Execute an operation immediately.
    pub fn execute(&mut self, operation: &SchemaOperation) -> Result<(), BoxError> {
        tracing::debug!(
            component = self.component,
            migration = self.migration,
            operation = %operation,
            "executing operation"
        );
        self.executor.execute(operation)?;
        self.executed += 1;
        Ok(())
    }

    /// Owning component.
    pub fn component(&self) -> &str {
        self.component
    }

    /// Running migration.
    pub fn migration(&self) -> &str {
        self.migration
    }

    /// Version installed before the run.
    pub fn installed_version(&self) -> &SchemaVersion {
        self.installed
    }

    /// Version the component is moving to.
    pub fn target_version(&self) -> &SchemaVersion {
        self.target
    }

    /// Operations executed through this context.
    pub fn executed(&self) -> usize {
        self.executed
    }
}
