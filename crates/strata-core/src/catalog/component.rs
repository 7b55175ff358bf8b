//! Component definitions.

use super::error::CatalogError;
use super::version::SchemaVersion;
use crate::migration::MigrationDescriptor;

/// Migrations introduced at one version.
#[derive(Debug, Clone)]
pub struct VersionEntry {
    /// The version these migrations move the schema to.
    pub version: SchemaVersion,
    /// Migrations in declaration order.
    pub migrations: Vec<MigrationDescriptor>,
}

/// A migration selected from a component's history.
#[derive(Debug, Clone, Copy)]
pub struct MigrationRef<'a> {
    /// Version the migration belongs to.
    pub version: &'a SchemaVersion,
    /// Declaration order across the whole history.
    pub ordering_index: usize,
    /// The declaration.
    pub descriptor: &'a MigrationDescriptor,
}

/// An installed component as described by package metadata.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    /// Unique component name.
    pub name: String,
    /// Version of the currently loaded code.
    pub version: SchemaVersion,
    /// Names of the components this one depends on, in declaration order.
    pub dependencies: Vec<String>,
    /// Version history, ascending by version.
    pub history: Vec<VersionEntry>,
}

impl ComponentSpec {
    /// Create a component without dependencies or migrations.
    pub fn new(name: impl Into<String>, version: SchemaVersion) -> Self {
        Self {
            name: name.into(),
            version,
            dependencies: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Parse the version and create a component.
    pub fn parse(name: impl Into<String>, version: &str) -> Result<Self, CatalogError> {
        Ok(Self::new(name, SchemaVersion::parse(version)?))
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
        self
    }

    /// Add a migration introduced at `version`.
    ///
    /// Entries stay sorted by version; migrations for the same version keep
    /// their declaration order.
    pub fn with_migration(mut self, version: SchemaVersion, migration: MigrationDescriptor) -> Self {
        match self.history.binary_search_by(|e| e.version.cmp(&version)) {
            Ok(idx) => self.history[idx].migrations.push(migration),
            Err(idx) => self.history.insert(
                idx,
                VersionEntry {
                    version,
                    migrations: vec![migration],
                },
            ),
        }
        self
    }

    /// Add several migrations introduced at `version`.
    pub fn with_migrations(
        self,
        version: SchemaVersion,
        migrations: impl IntoIterator<Item = MigrationDescriptor>,
    ) -> Self {
        migrations
            .into_iter()
            .fold(self, |spec, m| spec.with_migration(version.clone(), m))
    }

    /// Total number of declared migrations.
    pub fn migration_count(&self) -> usize {
        self.history.iter().map(|e| e.migrations.len()).sum()
    }

    /// Migrations with `installed < version <= target`, in declaration order.
    pub fn migrations_between(
        &self,
        installed: &SchemaVersion,
        target: &SchemaVersion,
    ) -> Vec<MigrationRef<'_>> {
        let mut selected = Vec::new();
        let mut ordering_index = 0;

        for entry in &self.history {
            for descriptor in &entry.migrations {
                if &entry.version > installed && &entry.version <= target {
                    selected.push(MigrationRef {
                        version: &entry.version,
                        ordering_index,
                        descriptor,
                    });
                }
                ordering_index += 1;
            }
        }

        selected
    }
}

/// Supplies installed components from package metadata.
pub trait MetadataSource {
    /// Read every installed component.
    fn components(&self) -> Result<Vec<ComponentSpec>, CatalogError>;
}

impl MetadataSource for Vec<ComponentSpec> {
    fn components(&self) -> Result<Vec<ComponentSpec>, CatalogError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::OperationMigration;

    fn v(s: &str) -> SchemaVersion {
        SchemaVersion::parse(s).unwrap()
    }

    fn noop(name: &str) -> MigrationDescriptor {
        MigrationDescriptor::direct(name.to_string(), OperationMigration::default)
    }

    fn names(refs: &[MigrationRef<'_>]) -> Vec<String> {
        refs.iter().map(|r| r.descriptor.name().to_string()).collect()
    }

    #[test]
    fn test_history_sorted_by_version() {
        let spec = ComponentSpec::parse("blog", "0.3")
            .unwrap()
            .with_migration(v("0.3"), noop("c"))
            .with_migration(v("0.1"), noop("a"))
            .with_migration(v("0.2"), noop("b"))
            .with_migration(v("0.1"), noop("a2"));

        let versions: Vec<String> = spec.history.iter().map(|e| e.version.to_string()).collect();
        assert_eq!(versions, vec!["0.1", "0.2", "0.3"]);
        assert_eq!(spec.migration_count(), 4);
        assert_eq!(names(&spec.migrations_between(&v("0"), &v("0.3"))), vec!["a", "a2", "b", "c"]);
    }

    #[test]
    fn test_selection_is_half_open() {
        let spec = ComponentSpec::parse("blog", "0.3")
            .unwrap()
            .with_migrations(v("0.1"), [noop("a")])
            .with_migrations(v("0.2"), [noop("b1"), noop("b2")])
            .with_migrations(v("0.3"), [noop("c")]);

        let selected = spec.migrations_between(&v("0.1"), &v("0.2"));
        assert_eq!(names(&selected), vec!["b1", "b2"]);
        assert_eq!(selected[0].ordering_index, 1);
        assert_eq!(selected[1].ordering_index, 2);

        assert!(spec.migrations_between(&v("0.3"), &v("0.3")).is_empty());
        assert_eq!(names(&spec.migrations_between(&v("0.2"), &v("9"))), vec!["c"]);
    }

    #[test]
    fn test_duplicate_dependency_ignored() {
        let spec = ComponentSpec::parse("blog", "1")
            .unwrap()
            .with_dependency("auth")
            .with_dependency("auth");
        assert_eq!(spec.dependencies, vec!["auth".to_string()]);
    }
}
