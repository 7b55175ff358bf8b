//! The persistent schema version store.

use super::error::StoreError;
use super::record::VersionRecord;
use super::transaction::VersionTransaction;
use crate::catalog::SchemaVersion;

/// Persists the installed schema version of every component.
///
/// Records live in their own sled tree, keyed by component name. All
/// mutation goes through [`VersionTransaction`]; the single-call helpers
/// below each run in their own managed transaction.
#[derive(Debug, Clone)]
pub struct SchemaVersionStore {
    tree: sled::Tree,
}

impl SchemaVersionStore {
    /// Tree name for version records.
    pub const TREE_NAME: &'static str = "schema:versions";

    /// Open or create the version store.
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        let tree = db.open_tree(Self::TREE_NAME)?;
        Ok(Self { tree })
    }

    pub(crate) fn tree(&self) -> &sled::Tree {
        &self.tree
    }

    /// Load a component's committed record.
    pub fn load(&self, component: &str) -> Result<Option<VersionRecord>, StoreError> {
        match self.tree.get(component.as_bytes())? {
            Some(bytes) => Ok(Some(VersionRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// The committed version, or `None` if the component was never initialised.
    pub fn installed_version(&self, component: &str) -> Result<Option<SchemaVersion>, StoreError> {
        self.load(component)?
            .map(|r| r.schema_version())
            .transpose()
    }

    /// The committed version, failing if the component is unknown.
    pub fn current_version(&self, component: &str) -> Result<SchemaVersion, StoreError> {
        self.installed_version(component)?
            .ok_or_else(|| StoreError::UnknownComponent(component.to_string()))
    }

    /// Record a component's first version.
    pub fn initialise(&self, component: &str, version: &SchemaVersion) -> Result<(), StoreError> {
        self.managed_transaction(|tx| tx.initialise(component, version))
    }

    /// Update an initialised component's version.
    pub fn set_version(&self, component: &str, version: &SchemaVersion) -> Result<(), StoreError> {
        self.managed_transaction(|tx| tx.set_version(component, version))
    }

    /// Remove a component's record. Returns false if there was none.
    pub fn teardown(&self, component: &str) -> Result<bool, StoreError> {
        self.managed_transaction(|tx| tx.teardown(component))
    }

    /// All committed records, ordered by component name.
    pub fn records(&self) -> Result<Vec<VersionRecord>, StoreError> {
        let mut records = Vec::new();
        for result in self.tree.iter() {
            let (_, value) = result?;
            records.push(VersionRecord::from_bytes(&value)?);
        }
        Ok(records)
    }

    /// Flush changes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.tree.flush()?;
        Ok(())
    }

    /// Start a transaction. Nothing is written until it commits.
    pub fn begin(&self) -> VersionTransaction<'_> {
        VersionTransaction::new(self)
    }

    /// Run `f` inside a transaction.
    ///
    /// Staged writes are committed when `f` succeeds and discarded when it
    /// fails or marks the transaction rollback-only.
    pub fn managed_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut VersionTransaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut tx = self.begin();
        match f(&mut tx) {
            Ok(value) => {
                if tx.is_rollback_only() {
                    tx.rollback();
                } else {
                    tx.commit()?;
                }
                Ok(value)
            }
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }
}
