//! Core error types.

use crate::catalog::{CatalogError, SchemaVersion};
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Boxed error returned by migrations and schema executors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where in a run an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the executor's transaction.
    Begin,
    /// A direct migration's `upgrade`.
    Upgrade,
    /// A scheduled migration's `schedule_upgrades`.
    Schedule,
    /// Flushing the phase queue.
    Flush,
    /// A direct migration's `upgrade_cleanup`.
    Cleanup,
    /// Committing the executor's transaction.
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Begin => write!(f, "begin"),
            Stage::Upgrade => write!(f, "upgrade"),
            Stage::Schedule => write!(f, "schedule_upgrades"),
            Stage::Flush => write!(f, "flush"),
            Stage::Cleanup => write!(f, "upgrade_cleanup"),
            Stage::Commit => write!(f, "commit"),
        }
    }
}

/// Errors raised by a migration run.
///
/// Every variant aborts the run and discards its version updates.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Catalog error (including dependency cycles).
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Version store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A target or installed record names a component that cannot be migrated.
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// The requested target is older than the installed version.
    #[error("cannot downgrade {component} from {installed} to {target}")]
    DowngradeUnsupported {
        /// The component.
        component: String,
        /// The installed version.
        installed: SchemaVersion,
        /// The requested target.
        target: SchemaVersion,
    },

    /// The requested target is newer than the loaded code.
    #[error("cannot migrate {component} to {target}: code is at {code}")]
    TargetBeyondCode {
        /// The component.
        component: String,
        /// The requested target.
        target: SchemaVersion,
        /// The version of the loaded code.
        code: SchemaVersion,
    },

    /// A migration hook, or an operation it scheduled, failed.
    #[error("migration {component}/{migration} failed during {stage}: {source}")]
    MigrationFailed {
        /// Owning component.
        component: String,
        /// Migration name.
        migration: String,
        /// Where it failed.
        stage: Stage,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// The schema executor failed outside of any migration.
    #[error("schema executor failed during {stage}: {source}")]
    Executor {
        /// Where it failed.
        stage: Stage,
        /// The underlying error.
        #[source]
        source: BoxError,
    },
}

impl MigrateError {
    /// The component and migration at which a run stopped, if a migration failed.
    pub fn stopped_at(&self) -> Option<(&str, &str)> {
        match self {
            MigrateError::MigrationFailed {
                component,
                migration,
                ..
            } => Some((component.as_str(), migration.as_str())),
            _ => None,
        }
    }

    /// Check if this error reports a dependency cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, MigrateError::Catalog(e) if e.is_cycle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Schedule.to_string(), "schedule_upgrades");
        assert_eq!(Stage::Cleanup.to_string(), "upgrade_cleanup");
    }

    #[test]
    fn test_migration_failed_reports_location() {
        let err = MigrateError::MigrationFailed {
            component: "blog".to_string(),
            migration: "add_tags".to_string(),
            stage: Stage::Upgrade,
            source: "column exists".into(),
        };
        assert_eq!(err.stopped_at(), Some(("blog", "add_tags")));
        assert_eq!(
            err.to_string(),
            "migration blog/add_tags failed during upgrade: column exists"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_store_errors_have_no_location() {
        let err = MigrateError::from(StoreError::UnknownComponent("ghost".to_string()));
        assert!(err.stopped_at().is_none());
        assert!(!err.is_cycle());
    }
}
