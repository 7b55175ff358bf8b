//! JSON package manifest reader.
//!
//! Describes installed components and their migrations declaratively:
//!
//! ```json
//! {
//!   "components": [
//!     {
//!       "name": "blog",
//!       "version": "0.2",
//!       "dependencies": ["auth"],
//!       "history": [
//!         {
//!           "version": "0.2",
//!           "migrations": [
//!             { "style": "direct", "name": "add_tags",
//!               "upgrade": [{ "intent": "create_table", "target": "tag" }] },
//!             { "style": "scheduled", "name": "rekey_posts",
//!               "operations": [{ "phase": "drop_foreign_key", "intent": "drop_fk", "target": "post_author" }] }
//!           ]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use super::component::{ComponentSpec, MetadataSource};
use super::error::CatalogError;
use super::version::SchemaVersion;
use crate::executor::SchemaOperation;
use crate::migration::{MigrationDescriptor, OperationMigration, PhasedMigration};
use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root of a manifest document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Installed components.
    #[serde(default)]
    pub components: Vec<ComponentDef>,
}

/// One component in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Component name.
    pub name: String,
    /// Code version.
    pub version: SchemaVersion,
    /// Dependency names.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Migrations per version.
    #[serde(default)]
    pub history: Vec<VersionDef>,
}

/// Migrations introduced at one version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDef {
    /// Version.
    pub version: SchemaVersion,
    /// Migrations in declaration order.
    #[serde(default)]
    pub migrations: Vec<MigrationDef>,
}

/// A declarative migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum MigrationDef {
    /// Executed immediately in the upgrade and cleanup passes.
    Direct {
        /// Migration name.
        name: String,
        /// Upgrade-pass operations.
        #[serde(default)]
        upgrade: Vec<SchemaOperation>,
        /// Cleanup-pass operations.
        #[serde(default)]
        cleanup: Vec<SchemaOperation>,
    },
    /// Queued by phase and flushed after the upgrade pass.
    Scheduled {
        /// Migration name.
        name: String,
        /// Phase-tagged operations.
        #[serde(default)]
        operations: Vec<PhasedOperationDef>,
    },
}

/// An operation tagged with its phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhasedOperationDef {
    /// Phase tag.
    pub phase: Phase,
    /// The operation.
    #[serde(flatten)]
    pub operation: SchemaOperation,
}

impl MigrationDef {
    fn into_descriptor(self) -> MigrationDescriptor {
        match self {
            MigrationDef::Direct {
                name,
                upgrade,
                cleanup,
            } => {
                let migration = OperationMigration::new(upgrade, cleanup);
                MigrationDescriptor::direct(name, move || migration.clone())
            }
            MigrationDef::Scheduled { name, operations } => {
                let migration = PhasedMigration::new(
                    operations
                        .into_iter()
                        .map(|op| (op.phase, op.operation))
                        .collect(),
                );
                MigrationDescriptor::scheduled(name, move || migration.clone())
            }
        }
    }
}

impl ComponentDef {
    fn into_spec(self) -> Result<ComponentSpec, CatalogError> {
        let mut spec = ComponentSpec::new(self.name, self.version);
        for dep in self.dependencies {
            spec = spec.with_dependency(dep);
        }
        for entry in self.history {
            let mut seen = Vec::with_capacity(entry.migrations.len());
            for migration in entry.migrations {
                let descriptor = migration.into_descriptor();
                if seen.contains(&descriptor.name().to_string()) {
                    return Err(CatalogError::Manifest(format!(
                        "{}: migration {} declared twice for version {}",
                        spec.name,
                        descriptor.name(),
                        entry.version
                    )));
                }
                seen.push(descriptor.name().to_string());
                spec = spec.with_migration(entry.version.clone(), descriptor);
            }
        }
        Ok(spec)
    }
}

/// A [`MetadataSource`] backed by a JSON manifest.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    manifest: Manifest,
}

impl ManifestSource {
    /// Parse a manifest document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let manifest =
            serde_json::from_str(json).map_err(|e| CatalogError::Manifest(e.to_string()))?;
        Ok(Self { manifest })
    }

    /// Read and parse a manifest file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Manifest(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loading manifest");
        Self::from_json(&json)
    }

    /// The parsed manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

impl MetadataSource for ManifestSource {
    fn components(&self) -> Result<Vec<ComponentSpec>, CatalogError> {
        self.manifest
            .components
            .iter()
            .cloned()
            .map(ComponentDef::into_spec)
            .collect()
    }
}
