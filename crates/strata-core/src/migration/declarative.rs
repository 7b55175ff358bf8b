//! Migrations described entirely by lists of operations.
//!
//! Used by manifest-declared components, where no component code is linked in.

use super::{DirectMigration, MigrationContext, ScheduledMigration};
use crate::error::BoxError;
use crate::executor::SchemaOperation;
use crate::phase::{Phase, PhaseQueue};

/// A direct migration that executes fixed operation lists.
#[derive(Debug, Clone, Default)]
pub struct OperationMigration {
    upgrade: Vec<SchemaOperation>,
    cleanup: Vec<SchemaOperation>,
}

impl OperationMigration {
    /// Create a migration from its upgrade and cleanup operations.
    pub fn new(upgrade: Vec<SchemaOperation>, cleanup: Vec<SchemaOperation>) -> Self {
        Self { upgrade, cleanup }
    }
}

impl DirectMigration for OperationMigration {
    fn upgrade(&mut self, ctx: &mut MigrationContext<'_>) -> Result<(), BoxError> {
        for op in &self.upgrade {
            ctx.execute(op)?;
        }
        Ok(())
    }

    fn upgrade_cleanup(&mut self, ctx: &mut MigrationContext<'_>) -> Result<(), BoxError> {
        for op in &self.cleanup {
            ctx.execute(op)?;
        }
        Ok(())
    }
}

/// A scheduled migration that queues fixed phase-tagged operations.
#[derive(Debug, Clone, Default)]
pub struct PhasedMigration {
    operations: Vec<(Phase, SchemaOperation)>,
}

impl PhasedMigration {
    /// Create a migration from `(phase, operation)` pairs.
    pub fn new(operations: Vec<(Phase, SchemaOperation)>) -> Self {
        Self { operations }
    }
}

impl ScheduledMigration for PhasedMigration {
    fn schedule_upgrades(&mut self, queue: &mut PhaseQueue) -> Result<(), BoxError> {
        for (phase, op) in &self.operations {
            queue.schedule(*phase, op.clone());
        }
        Ok(())
    }
}
