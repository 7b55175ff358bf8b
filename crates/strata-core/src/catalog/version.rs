//! Dotted schema versions.

use super::error::CatalogError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A dotted numeric schema version such as `0.1` or `1.4.2`.
///
/// Comparison is numeric per component with missing trailing components
/// treated as zero, so `1.0` and `1` compare equal. The printed form keeps
/// the number of components that was parsed.
#[derive(Debug, Clone)]
pub struct SchemaVersion {
    parts: Vec<u64>,
}

impl SchemaVersion {
    /// Create a version from its numeric components.
    ///
    /// An empty slice is treated as `0`.
    pub fn new(parts: &[u64]) -> Self {
        if parts.is_empty() {
            return Self { parts: vec![0] };
        }
        Self {
            parts: parts.to_vec(),
        }
    }

    /// Parse a version string.
    pub fn parse(s: &str) -> Result<Self, CatalogError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::InvalidVersion(s.to_string()));
        }

        let invalid = || CatalogError::InvalidVersion(s.to_string());
        let parts = trimmed
            .split('.')
            .map(|p| {
                // Plain decimal digits only, no sign or leading zeros.
                if p.is_empty()
                    || !p.bytes().all(|b| b.is_ascii_digit())
                    || (p.len() > 1 && p.starts_with('0'))
                {
                    return Err(invalid());
                }
                p.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { parts })
    }

    /// The numeric components.
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    fn part(&self, idx: usize) -> u64 {
        self.parts.get(idx).copied().unwrap_or(0)
    }
}

impl PartialEq for SchemaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SchemaVersion {}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.part(i).cmp(&other.part(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl FromStr for SchemaVersion {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SchemaVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SchemaVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SchemaVersion {
        SchemaVersion::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(v("0.1").to_string(), "0.1");
        assert_eq!(v("1.4.2").to_string(), "1.4.2");
        assert_eq!(v(" 3 ").to_string(), "3");
        assert_eq!(v("0.1").parts(), &[0, 1]);
        assert_eq!(v("10.0").to_string(), "10.0");
    }

    #[test]
    fn test_invalid_versions() {
        for bad in ["", "a.b", "1..2", "1.-1", "v1", "+1.2", "1.+0", "01", "1.02", "1. 2"] {
            assert!(
                matches!(SchemaVersion::parse(bad), Err(CatalogError::InvalidVersion(_))),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("0.0") < v("0.1"));
        assert!(v("0.9") < v("0.10"));
        assert!(v("1.2") < v("1.2.1"));
        assert!(v("2") > v("1.99.99"));
        assert_eq!(v("1.0"), v("1"));
        assert_eq!(v("1.0.0").cmp(&v("1")), Ordering::Equal);
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&v("0.10")).unwrap();
        assert_eq!(json, "\"0.10\"");
        let back: SchemaVersion = serde_json::from_str("\"2.1\"").unwrap();
        assert_eq!(back, v("2.1"));
        assert!(serde_json::from_str::<SchemaVersion>("\"x\"").is_err());
    }
}
