//! Execution of a planned run: the upgrade pass, the phase flush, and the
//! cleanup pass.

use super::plan::MigrationPlan;
use super::report::ComponentOutcome;
use crate::catalog::{ComponentCatalog, SchemaVersion};
use crate::error::{MigrateError, Stage};
use crate::executor::SchemaExecutor;
use crate::migration::{Migration, MigrationContext, MigrationKind};
use crate::phase::{MigrationOrigin, PhaseQueue};
use std::fmt;

/// Lifecycle of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not started.
    Idle,
    /// Comparing installed and target versions.
    Planning,
    /// Running upgrades in reverse dependency order, then flushing the queue.
    UpgradingPass,
    /// Running cleanups in dependency order.
    CleanupPass,
    /// Staging versions and committing.
    Committing,
    /// Finished successfully.
    Done,
    /// Aborted; nothing was committed.
    Failed,
}

impl RunState {
    /// Check if the run has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Planning => write!(f, "planning"),
            RunState::UpgradingPass => write!(f, "upgrading"),
            RunState::CleanupPass => write!(f, "cleanup"),
            RunState::Committing => write!(f, "committing"),
            RunState::Done => write!(f, "done"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// One component's migrations, instantiated for a run.
#[derive(Debug)]
struct ComponentRun {
    component: String,
    installed: SchemaVersion,
    target: SchemaVersion,
    migrations: Vec<Migration>,
}

/// Mutable state of a run in progress.
#[derive(Debug)]
pub(crate) struct MigrationRun {
    state: RunState,
    /// Components with migrations, dependency order.
    components: Vec<ComponentRun>,
    queue: PhaseQueue,
    operations_flushed: usize,
}

impl MigrationRun {
    pub(crate) fn new() -> Self {
        Self {
            state: RunState::Idle,
            components: Vec::new(),
            queue: PhaseQueue::new(),
            operations_flushed: 0,
        }
    }

    pub(crate) fn state(&self) -> RunState {
        self.state
    }

    pub(crate) fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "run state");
        self.state = next;
    }

    /// Instantiate the migrations selected by `plan`.
    pub(crate) fn load(
        &mut self,
        plan: &MigrationPlan,
        catalog: &ComponentCatalog,
    ) -> Result<(), MigrateError> {
        for component in plan.pending() {
            let Some(installed) = component.installed.clone() else {
                continue;
            };
            let spec = catalog.component(&component.component)?;
            let migrations = spec
                .migrations_between(&installed, &component.target)
                .into_iter()
                .map(|m| {
                    Migration::instantiate(
                        component.component.clone(),
                        m.version.clone(),
                        m.ordering_index,
                        m.descriptor,
                    )
                })
                .collect();

            self.components.push(ComponentRun {
                component: component.component.clone(),
                installed,
                target: component.target.clone(),
                migrations,
            });
        }
        Ok(())
    }

    /// Version changes of every component that ran migrations.
    pub(crate) fn outcomes(&self) -> Vec<ComponentOutcome> {
        self.components
            .iter()
            .filter(|c| !c.migrations.is_empty())
            .map(|c| ComponentOutcome {
                component: c.component.clone(),
                from: c.installed.clone(),
                to: c.target.clone(),
                migrations_applied: c.migrations.len(),
            })
            .collect()
    }

    pub(crate) fn operations_flushed(&self) -> usize {
        self.operations_flushed
    }

    /// Run every upgrade hook in reverse dependency order, then flush the queue.
    pub(crate) fn upgrade_pass(
        &mut self,
        executor: &mut dyn SchemaExecutor,
    ) -> Result<(), MigrateError> {
        self.transition(RunState::UpgradingPass);
        let Self {
            components, queue, ..
        } = self;

        for component in components.iter_mut().rev() {
            for migration in component.migrations.iter_mut() {
                let Migration { name, kind, .. } = migration;
                tracing::info!(
                    component = %component.component,
                    migration = %name,
                    to = %component.target,
                    "upgrading"
                );

                let (stage, result) = match kind {
                    MigrationKind::Direct(direct) => {
                        let mut ctx = MigrationContext::new(
                            &component.component,
                            name.as_str(),
                            &component.installed,
                            &component.target,
                            &mut *executor,
                        );
                        (Stage::Upgrade, direct.upgrade(&mut ctx))
                    }
                    MigrationKind::Scheduled(scheduled) => {
                        queue.set_origin(MigrationOrigin::new(
                            component.component.clone(),
                            name.clone(),
                        ));
                        (Stage::Schedule, scheduled.schedule_upgrades(queue))
                    }
                };

                result.map_err(|source| MigrateError::MigrationFailed {
                    component: component.component.clone(),
                    migration: name.clone(),
                    stage,
                    source,
                })?;
            }
        }

        let queued = queue.len();
        if queued > 0 {
            tracing::info!(operations = queued, "flushing phase queue");
        }
        self.operations_flushed = self.queue.flush(executor).map_err(|e| {
            let origin = e.origin.clone();
            MigrateError::MigrationFailed {
                component: origin.component,
                migration: origin.migration,
                stage: Stage::Flush,
                source: Box::new(e),
            }
        })?;

        Ok(())
    }

    /// Run every cleanup hook in dependency order.
    pub(crate) fn cleanup_pass(
        &mut self,
        executor: &mut dyn SchemaExecutor,
    ) -> Result<(), MigrateError> {
        self.transition(RunState::CleanupPass);

        for component in self.components.iter_mut() {
            for migration in component.migrations.iter_mut() {
                let Migration { name, kind, .. } = migration;
                let MigrationKind::Direct(direct) = kind else {
                    continue;
                };

                let mut ctx = MigrationContext::new(
                    &component.component,
                    name.as_str(),
                    &component.installed,
                    &component.target,
                    &mut *executor,
                );
                direct
                    .upgrade_cleanup(&mut ctx)
                    .map_err(|source| MigrateError::MigrationFailed {
                        component: component.component.clone(),
                        migration: name.clone(),
                        stage: Stage::Cleanup,
                        source,
                    })?;
            }
        }

        Ok(())
    }
}
