//! Version store error types.

use thiserror::Error;

/// Errors raised by the schema version store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No version record exists for the component.
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// A version record already exists for the component.
    #[error("component {component} already initialised at version {version}")]
    AlreadyInitialised {
        /// The component.
        component: String,
        /// The version already recorded.
        version: String,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
