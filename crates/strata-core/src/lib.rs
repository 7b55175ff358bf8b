//! Strata Core - component dependency resolution and schema migration.
//!
//! Installed components declare dependencies on one another and a history
//! of versioned migrations. Strata orders them, decides which migrations
//! must run, and drives them through a two-pass protocol against a
//! pluggable [`SchemaExecutor`], committing the new schema versions of every
//! component atomically.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod error;
pub mod executor;
pub mod graph;
pub mod migration;
pub mod orchestrator;
pub mod phase;
pub mod store;

pub use catalog::{
    CatalogError, ComponentCatalog, ComponentSpec, ManifestSource, MetadataSource, SchemaVersion,
};
pub use error::{BoxError, MigrateError, Stage};
pub use executor::{RecordingExecutor, SchemaExecutor, SchemaOperation};
pub use graph::{DependencyGraph, GraphError};
pub use migration::{
    DirectMigration, Migration, MigrationContext, MigrationDescriptor, MigrationKind,
    MigrationStyle, ScheduledMigration,
};
pub use orchestrator::{
    MigrateConfig, MigrationOrchestrator, MigrationPlan, MigrationReport, RunState,
};
pub use phase::{Phase, PhaseQueue, PHASE_ORDER};
pub use store::{SchemaVersionStore, StoreError, VersionRecord, VersionTransaction};
