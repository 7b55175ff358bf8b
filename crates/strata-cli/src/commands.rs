//! Command handlers.

use crate::config::{target_map, CliConfig, Command};
use crate::error::CliError;
use crate::executor::TraceExecutor;
use crate::formatter::{Formatter, StatusRow};
use strata_core::{ComponentCatalog, ManifestSource, MigrationOrchestrator, SchemaVersionStore};

/// Load the catalog described by the configured manifest.
fn load_catalog(config: &CliConfig) -> Result<ComponentCatalog, CliError> {
    let source = ManifestSource::from_path(&config.manifest)?;
    let catalog = ComponentCatalog::load(&source)?;
    tracing::debug!(components = catalog.len(), "catalog loaded");
    Ok(catalog)
}

/// Open the version store under the configured data path.
fn open_store(config: &CliConfig) -> Result<(sled::Db, SchemaVersionStore), CliError> {
    let db = sled::open(&config.data_path)?;
    let store = SchemaVersionStore::open(&db)?;
    Ok((db, store))
}

/// Run a command and return its formatted output.
pub fn execute(
    config: &CliConfig,
    command: Command,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let migrate_config = command.migrate_config();

    match command {
        Command::Migrate { targets, .. } => {
            let targets = target_map(targets)?;
            let catalog = load_catalog(config)?;
            let (_db, store) = open_store(config)?;

            let orchestrator = MigrationOrchestrator::new(&catalog, &store, migrate_config);
            let mut executor = TraceExecutor::new();
            let report = orchestrator.migrate(&mut executor, &targets)?;

            Ok(formatter.format_report(&report, executor.operations()))
        }
        Command::Plan { targets, .. } => {
            let targets = target_map(targets)?;
            let catalog = load_catalog(config)?;
            let (_db, store) = open_store(config)?;

            let plan = MigrationOrchestrator::new(&catalog, &store, migrate_config).plan(&targets)?;
            Ok(formatter.format_plan(&plan))
        }
        Command::Status => {
            let catalog = load_catalog(config)?;
            let (_db, store) = open_store(config)?;

            let mut rows = Vec::with_capacity(catalog.len());
            for spec in catalog.all_components() {
                let installed = store.installed_version(&spec.name)?;
                let pending = installed
                    .as_ref()
                    .map(|v| spec.migrations_between(v, &spec.version).len())
                    .unwrap_or(0);
                rows.push(StatusRow {
                    component: spec.name.clone(),
                    code_version: spec.version.clone(),
                    installed,
                    dependencies: spec.dependencies.clone(),
                    pending,
                });
            }

            Ok(formatter.format_status(&rows))
        }
        Command::Order { root } => {
            let catalog = load_catalog(config)?;
            let order = match root.as_deref() {
                Some(root) => catalog.dependency_order_for(root)?,
                None => catalog.dependency_order(),
            };
            Ok(formatter.format_order(&order))
        }
    }
}
