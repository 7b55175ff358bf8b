//! Multi-component migration orchestration.
//!
//! A run proceeds in two passes over the catalog:
//!
//! 1. **Upgrade**, components in reverse dependency order. Direct migrations
//!    execute immediately; scheduled migrations fill the [`PhaseQueue`], which
//!    is flushed in phase order once every upgrade has run.
//! 2. **Cleanup**, components in dependency order, for direct migrations.
//!
//! Version records for every upgraded component are then committed in one
//! store transaction. Any failure rolls back the executor and leaves every
//! record untouched.
//!
//! [`PhaseQueue`]: crate::phase::PhaseQueue

mod config;
mod plan;
mod report;
mod run;

pub use config::MigrateConfig;
pub use plan::{ComponentAction, ComponentPlan, MigrationPlan, PlannedMigration};
pub use report::{ComponentOutcome, MigrationReport};
pub use run::RunState;

use crate::catalog::{ComponentCatalog, SchemaVersion};
use crate::error::{MigrateError, Stage};
use crate::executor::SchemaExecutor;
use crate::store::{SchemaVersionStore, VersionTransaction};
use run::MigrationRun;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

/// Drives migration runs over a catalog and a version store.
pub struct MigrationOrchestrator<'a> {
    catalog: &'a ComponentCatalog,
    store: &'a SchemaVersionStore,
    config: MigrateConfig,
}

impl<'a> MigrationOrchestrator<'a> {
    /// Create an orchestrator.
    pub fn new(
        catalog: &'a ComponentCatalog,
        store: &'a SchemaVersionStore,
        config: MigrateConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &MigrateConfig {
        &self.config
    }

    /// Plan a run without executing anything.
    ///
    /// `targets` overrides the target version of the named components; the
    /// rest move to the version of their loaded code.
    pub fn plan(
        &self,
        targets: &BTreeMap<String, SchemaVersion>,
    ) -> Result<MigrationPlan, MigrateError> {
        plan::build_plan(self.catalog, &self.config, targets, |name| {
            self.store.installed_version(name)
        })
    }

    /// Migrate every component to its target version.
    pub fn migrate(
        &self,
        executor: &mut dyn SchemaExecutor,
        targets: &BTreeMap<String, SchemaVersion>,
    ) -> Result<MigrationReport, MigrateError> {
        let span = tracing::info_span!("migrate", dry_run = self.config.dry_run);
        let _enter = span.enter();

        executor.begin().map_err(|source| MigrateError::Executor {
            stage: Stage::Begin,
            source,
        })?;

        // Set once the executor has seen commit or rollback.
        let mut executor_closed = false;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.store.managed_transaction(|tx| {
                let mut run = MigrationRun::new();
                let outcome =
                    self.drive(&mut run, tx, &mut *executor, targets, &mut executor_closed);
                if outcome.is_err() {
                    run.transition(RunState::Failed);
                }
                outcome
            })
        }));

        // The store transaction is already discarded; close the executor
        // before letting the panic continue.
        let result = match result {
            Ok(result) => result,
            Err(payload) => {
                if !executor_closed {
                    if let Err(rollback) = executor.rollback() {
                        tracing::warn!(error = %rollback, "executor rollback failed");
                    }
                }
                tracing::error!("migration run panicked");
                panic::resume_unwind(payload);
            }
        };

        match result {
            Ok(report) => {
                tracing::info!(
                    components = report.components.len(),
                    migrations = report.migrations_applied(),
                    initialised = report.initialised.len(),
                    flushed = report.operations_flushed,
                    dry_run = report.dry_run,
                    "migration run complete"
                );
                Ok(report)
            }
            Err(e) => {
                if !executor_closed {
                    if let Err(rollback) = executor.rollback() {
                        tracing::warn!(error = %rollback, "executor rollback failed");
                    }
                }
                tracing::error!(error = %e, "migration run failed");
                Err(e)
            }
        }
    }

    fn drive(
        &self,
        run: &mut MigrationRun,
        tx: &mut VersionTransaction<'_>,
        executor: &mut dyn SchemaExecutor,
        targets: &BTreeMap<String, SchemaVersion>,
        executor_closed: &mut bool,
    ) -> Result<MigrationReport, MigrateError> {
        run.transition(RunState::Planning);
        let plan = plan::build_plan(self.catalog, &self.config, targets, |name| {
            tx.installed_version(name)
        })?;

        let mut initialised = Vec::new();
        for component in plan.initialising() {
            tracing::info!(
                component = %component.component,
                version = %component.target,
                "initialising"
            );
            tx.initialise(&component.component, &component.target)?;
            initialised.push(component.component.clone());
        }

        run.load(&plan, self.catalog)?;
        run.upgrade_pass(executor)?;
        run.cleanup_pass(executor)?;

        run.transition(RunState::Committing);
        let components = run.outcomes();
        for outcome in &components {
            tx.set_version(&outcome.component, &outcome.to)?;
        }

        let closed = if self.config.dry_run {
            tx.mark_rollback_only();
            executor.rollback()
        } else {
            executor.commit()
        };
        *executor_closed = true;
        closed.map_err(|source| MigrateError::Executor {
            stage: Stage::Commit,
            source,
        })?;

        run.transition(RunState::Done);
        Ok(MigrationReport {
            state: run.state(),
            dry_run: self.config.dry_run,
            components,
            initialised,
            operations_flushed: run.operations_flushed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ComponentSpec;
    use crate::executor::{ExecutorState, RecordingExecutor, SchemaOperation};
    use crate::migration::{MigrationDescriptor, OperationMigration};

    fn v(s: &str) -> SchemaVersion {
        SchemaVersion::parse(s).unwrap()
    }

    fn temp_store() -> SchemaVersionStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        SchemaVersionStore::open(&db).unwrap()
    }

    fn blog_catalog() -> ComponentCatalog {
        let create = OperationMigration::new(vec![SchemaOperation::new("create_table", "post")], vec![]);
        ComponentCatalog::load(&vec![ComponentSpec::parse("blog", "0.1")
            .unwrap()
            .with_migration(
                v("0.1"),
                MigrationDescriptor::direct("create_posts", move || create.clone()),
            )])
        .unwrap()
    }

    #[test]
    fn test_migrate_commits_versions() {
        let catalog = blog_catalog();
        let store = temp_store();
        store.initialise("blog", &v("0.0")).unwrap();

        let orchestrator = MigrationOrchestrator::new(&catalog, &store, MigrateConfig::default());
        let mut exec = RecordingExecutor::new();
        let report = orchestrator.migrate(&mut exec, &BTreeMap::new()).unwrap();

        assert_eq!(report.state, RunState::Done);
        assert_eq!(report.migrations_applied(), 1);
        assert_eq!(report.components[0].from, v("0.0"));
        assert_eq!(store.current_version("blog").unwrap(), v("0.1"));
        assert_eq!(exec.state(), ExecutorState::Committed);
    }

    #[test]
    fn test_dry_run_rolls_back() {
        let catalog = blog_catalog();
        let store = temp_store();
        store.initialise("blog", &v("0.0")).unwrap();

        let orchestrator = MigrationOrchestrator::new(
            &catalog,
            &store,
            MigrateConfig::default().with_dry_run(true),
        );
        let mut exec = RecordingExecutor::new();
        let report = orchestrator.migrate(&mut exec, &BTreeMap::new()).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.migrations_applied(), 1);
        assert_eq!(exec.intents(), vec!["create_table"]);
        assert_eq!(exec.state(), ExecutorState::RolledBack);
        assert_eq!(store.current_version("blog").unwrap(), v("0.0"));
    }

    #[test]
    fn test_fresh_install_initialises() {
        let catalog = blog_catalog();
        let store = temp_store();
        let orchestrator = MigrationOrchestrator::new(&catalog, &store, MigrateConfig::default());

        let plan = orchestrator.plan(&BTreeMap::new()).unwrap();
        assert_eq!(plan.initialising().count(), 1);

        let mut exec = RecordingExecutor::new();
        let report = orchestrator.migrate(&mut exec, &BTreeMap::new()).unwrap();
        assert_eq!(report.initialised, vec!["blog".to_string()]);
        assert!(exec.executed().is_empty());
        assert_eq!(store.current_version("blog").unwrap(), v("0.1"));
    }

    struct Panicking;

    impl crate::migration::DirectMigration for Panicking {
        fn upgrade(
            &mut self,
            _ctx: &mut crate::migration::MigrationContext<'_>,
        ) -> Result<(), crate::error::BoxError> {
            panic!("migration hook panicked");
        }
    }

    #[test]
    fn test_panic_rolls_back_executor() {
        let catalog = ComponentCatalog::load(&vec![ComponentSpec::parse("blog", "0.1")
            .unwrap()
            .with_migration(v("0.1"), MigrationDescriptor::direct("explode", || Panicking))])
        .unwrap();
        let store = temp_store();
        store.initialise("blog", &v("0.0")).unwrap();

        let orchestrator = MigrationOrchestrator::new(&catalog, &store, MigrateConfig::default());
        let mut exec = RecordingExecutor::new();
        let caught = std::panic::catch_unwind(AssertUnwindSafe(|| {
            orchestrator.migrate(&mut exec, &BTreeMap::new())
        }));

        assert!(caught.is_err());
        assert_eq!(exec.state(), ExecutorState::RolledBack);
        assert_eq!(store.current_version("blog").unwrap(), v("0.0"));
    }

    #[test]
    fn test_failure_rolls_back_executor() {
        let catalog = blog_catalog();
        let store = temp_store();
        store.initialise("blog", &v("0.0")).unwrap();

        let orchestrator = MigrationOrchestrator::new(&catalog, &store, MigrateConfig::default());
        let mut exec = RecordingExecutor::new().failing_on("create_table");
        let err = orchestrator.migrate(&mut exec, &BTreeMap::new()).unwrap_err();

        assert_eq!(err.stopped_at(), Some(("blog", "create_posts")));
        assert_eq!(exec.state(), ExecutorState::RolledBack);
        assert_eq!(store.current_version("blog").unwrap(), v("0.0"));
    }
}
