//! Checksums for snapshot content

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum of a snapshot file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, content: &[u8]) -> bool {
        Self::from_bytes(content) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = br#"{"data": {"classTables": []}}"#;
        assert_eq!(Checksum::from_bytes(content), Checksum::from_bytes(content));
        assert_eq!(Checksum::from_bytes(content).as_str().len(), 64);
    }

    #[test]
    fn test_checksum_verification() {
        let checksum = Checksum::from_bytes(b"snapshot");
        assert!(checksum.verify(b"snapshot"));
        assert!(!checksum.verify(b"different content"));
    }
}
