//! Component catalog for Strata.
//!
//! The catalog holds installed components, their dependencies, versions, and
//! declared migrations, in canonical dependency order.

mod catalog;
mod component;
mod error;
mod manifest;
mod version;

pub use catalog::ComponentCatalog;
pub use component::{ComponentSpec, MetadataSource, MigrationRef, VersionEntry};
pub use error::CatalogError;
pub use manifest::{
    ComponentDef, Manifest, ManifestSource, MigrationDef, PhasedOperationDef, VersionDef,
};
pub use version::SchemaVersion;
