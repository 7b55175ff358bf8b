//! Staged, atomically committed version updates.

use super::error::StoreError;
use super::record::VersionRecord;
use super::versions::SchemaVersionStore;
use crate::catalog::SchemaVersion;
use sled::transaction::TransactionError;
use std::collections::BTreeMap;

/// A transaction over the version store.
///
/// Writes are staged in memory and applied in a single sled transaction on
/// [`commit`](Self::commit). Reads see staged writes first. Dropping the
/// transaction without committing discards everything.
pub struct VersionTransaction<'a> {
    store: &'a SchemaVersionStore,
    /// Component -> staged record (`None` stages a removal).
    staged: BTreeMap<String, Option<VersionRecord>>,
    rollback_only: bool,
}

impl<'a> VersionTransaction<'a> {
    pub(crate) fn new(store: &'a SchemaVersionStore) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
            rollback_only: false,
        }
    }

    /// Read a component's record, including staged writes.
    pub fn record(&self, component: &str) -> Result<Option<VersionRecord>, StoreError> {
        match self.staged.get(component) {
            Some(staged) => Ok(staged.clone()),
            None => self.store.load(component),
        }
    }

    /// The installed version, or `None` if the component was never initialised.
    pub fn installed_version(&self, component: &str) -> Result<Option<SchemaVersion>, StoreError> {
        self.record(component)?
            .map(|r| r.schema_version())
            .transpose()
    }

    /// The installed version, failing if the component is unknown.
    pub fn current_version(&self, component: &str) -> Result<SchemaVersion, StoreError> {
        self.installed_version(component)?
            .ok_or_else(|| StoreError::UnknownComponent(component.to_string()))
    }

    /// Stage the first version record of a component.
    pub fn initialise(&mut self, component: &str, version: &SchemaVersion) -> Result<(), StoreError> {
        if let Some(existing) = self.record(component)? {
            return Err(StoreError::AlreadyInitialised {
                component: component.to_string(),
                version: existing.version,
            });
        }
        self.staged.insert(
            component.to_string(),
            Some(VersionRecord::new(component, version)),
        );
        Ok(())
    }

    /// Stage a new version for an initialised component.
    pub fn set_version(&mut self, component: &str, version: &SchemaVersion) -> Result<(), StoreError> {
        if self.record(component)?.is_none() {
            return Err(StoreError::UnknownComponent(component.to_string()));
        }
        self.staged.insert(
            component.to_string(),
            Some(VersionRecord::new(component, version)),
        );
        Ok(())
    }

    /// Stage removal of a component's record. Returns false if there was none.
    pub fn teardown(&mut self, component: &str) -> Result<bool, StoreError> {
        if self.record(component)?.is_none() {
            return Ok(false);
        }
        self.staged.insert(component.to_string(), None);
        Ok(true)
    }

    /// Number of staged writes.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Make the enclosing managed transaction discard its writes on success.
    pub fn mark_rollback_only(&mut self) {
        self.rollback_only = true;
    }

    /// Check if this transaction will be discarded.
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }

    /// Apply all staged writes atomically and flush them to disk.
    ///
    /// Returns the number of records written or removed.
    pub fn commit(self) -> Result<usize, StoreError> {
        if self.staged.is_empty() {
            return Ok(0);
        }

        let mut encoded = Vec::with_capacity(self.staged.len());
        for (component, record) in &self.staged {
            let bytes = record.as_ref().map(VersionRecord::to_bytes).transpose()?;
            encoded.push((component.as_bytes(), bytes));
        }

        let result: Result<(), TransactionError<StoreError>> =
            self.store.tree().transaction(|tx| {
                for (key, value) in &encoded {
                    match value {
                        Some(bytes) => {
                            tx.insert(*key, bytes.as_slice())?;
                        }
                        None => {
                            tx.remove(*key)?;
                        }
                    }
                }
                Ok(())
            });

        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(StoreError::Storage(e)),
        }

        self.store.flush()?;
        tracing::debug!(records = encoded.len(), "committed version records");
        Ok(encoded.len())
    }

    /// Discard all staged writes.
    pub fn rollback(self) {
        if !self.staged.is_empty() {
            tracing::debug!(discarded = self.staged.len(), "rolled back version records");
        }
    }
}
