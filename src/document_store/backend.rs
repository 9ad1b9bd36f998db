//! # Blob Backend Trait

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use url::Url;

use super::errors::BackendResult;

/// User metadata attached to a blob. Values are strings, as in blob services.
pub type Metadata = BTreeMap<String, String>;

/// Listing entry for one stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub metadata: Metadata,
    /// SHA-256 of the content, hex encoded
    pub checksum: String,
}

impl ObjectInfo {
    pub fn new(key: &str, data: &[u8], metadata: Metadata) -> Self {
        Self {
            key: key.to_string(),
            size: data.len() as u64,
            metadata,
            checksum: Self::calculate_checksum(data),
        }
    }

    /// Calculate checksum for data
    pub fn calculate_checksum(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }
}

/// Capability set of a blob container.
///
/// Keys are flat names. `set_metadata` must never create an object, and an
/// existence check followed by the metadata write must be atomic with
/// respect to `delete` on the same key.
#[async_trait]
pub trait BlobBackend: Send + Sync + std::fmt::Debug {
    /// Base URI of the container; object locations are resolved against it
    fn container_url(&self) -> &Url;

    /// Write an object, replacing content and metadata of any existing one
    async fn put(&self, key: &str, data: Bytes) -> BackendResult<ObjectInfo>;

    /// Read an object's content
    async fn get(&self, key: &str) -> BackendResult<Bytes>;

    /// Delete an object. Returns `NotFound` if it does not exist.
    async fn delete(&self, key: &str) -> BackendResult<()>;

    /// List all objects in enumeration order
    async fn list(&self) -> BackendResult<Vec<ObjectInfo>>;

    async fn get_metadata(&self, key: &str) -> BackendResult<Metadata>;

    /// Replace an existing object's metadata. Returns `NotFound` if absent.
    async fn set_metadata(&self, key: &str, metadata: Metadata) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        let checksum = ObjectInfo::calculate_checksum(b"test");
        assert_eq!(checksum.len(), 64);
        assert_eq!(
            checksum,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_object_info_size() {
        let info = ObjectInfo::new("a.pdf", b"hello", Metadata::new());
        assert_eq!(info.key, "a.pdf");
        assert_eq!(info.size, 5);
        assert!(info.metadata.is_empty());
    }
}
