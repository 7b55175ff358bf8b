//! Schema version persistence.
//!
//! One record per component holds its installed schema version. Updates are
//! staged in a [`VersionTransaction`] and committed atomically.

mod error;
mod record;
mod transaction;
mod versions;

pub use error::StoreError;
pub use record::{current_timestamp, VersionRecord};
pub use transaction::VersionTransaction;
pub use versions::SchemaVersionStore;
