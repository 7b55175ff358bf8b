//! Catalog error types.

use crate::graph::GraphError;
use thiserror::Error;

/// Errors raised while loading or querying the component catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Two components share a name.
    #[error("duplicate component: {0}")]
    DuplicateComponent(String),

    /// A component declares a dependency on a component that is not installed.
    #[error("component {component} depends on unknown component {dependency}")]
    UnknownDependency {
        /// The component declaring the dependency.
        component: String,
        /// The missing dependency.
        dependency: String,
    },

    /// Lookup of a component that is not in the catalog.
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// A version string could not be parsed.
    #[error("invalid version: {0:?}")]
    InvalidVersion(String),

    /// The dependency relation could not be ordered.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The metadata manifest could not be read.
    #[error("manifest error: {0}")]
    Manifest(String),
}

impl CatalogError {
    /// Check if this error reports a dependency cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, CatalogError::Graph(GraphError::CycleDetected { .. }))
    }
}
