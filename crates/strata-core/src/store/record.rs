//! Persisted version records.

use super::error::StoreError;
use crate::catalog::SchemaVersion;
use rkyv::{Archive, Deserialize, Serialize};

/// Current time in microseconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// The installed schema version of one component.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Component name (the record key).
    pub component_name: String,
    /// Installed version string.
    pub version: String,
    /// When the record was last written (microseconds since epoch).
    pub updated_at: u64,
}

impl VersionRecord {
    /// Create a record stamped with the current time.
    pub fn new(component_name: impl Into<String>, version: &SchemaVersion) -> Self {
        Self {
            component_name: component_name.into(),
            version: version.to_string(),
            updated_at: current_timestamp(),
        }
    }

    /// Parse the stored version.
    pub fn schema_version(&self) -> Result<SchemaVersion, StoreError> {
        SchemaVersion::parse(&self.version).map_err(|e| {
            StoreError::Deserialization(format!("{}: {}", self.component_name, e))
        })
    }

    /// Serialize the record to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        // sled values carry no alignment guarantee.
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| StoreError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_bytes() {
        let record = VersionRecord::new("blog", &SchemaVersion::parse("0.1").unwrap());
        assert!(record.updated_at > 0);

        let restored = VersionRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, record);
        assert_eq!(restored.schema_version().unwrap().to_string(), "0.1");
    }

    #[test]
    fn test_corrupt_version_string() {
        let record = VersionRecord {
            component_name: "blog".to_string(),
            version: "garbage".to_string(),
            updated_at: 0,
        };
        assert!(matches!(
            record.schema_version(),
            Err(StoreError::Deserialization(_))
        ));
    }

    #[test]
    fn test_corrupt_bytes() {
        assert!(VersionRecord::from_bytes(b"not a record").is_err());
    }
}
