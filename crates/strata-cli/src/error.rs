//! CLI error types.

use strata_core::{CatalogError, MigrateError, StoreError};
use thiserror::Error;

/// Errors surfaced by `strata` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The manifest could not be loaded into a catalog.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A migration run failed.
    #[error("migration failed: {0}")]
    Migrate(#[from] MigrateError),

    /// Version store error.
    #[error("version store error: {0}")]
    Store(#[from] StoreError),

    /// The data directory could not be opened.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Invalid arguments.
    #[error("configuration error: {0}")]
    Config(String),
}
