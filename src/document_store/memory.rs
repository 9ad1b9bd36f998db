//! # In-Memory Backend
//!
//! Blob container held in process memory. Used for tests and development.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use super::backend::{BlobBackend, Metadata, ObjectInfo};
use super::errors::{BackendError, BackendResult};

#[derive(Debug)]
struct StoredBlob {
    data: Bytes,
    info: ObjectInfo,
}

/// In-memory blob container
#[derive(Debug)]
pub struct MemoryBackend {
    container_url: Url,
    blobs: RwLock<BTreeMap<String, StoredBlob>>,
    offline: AtomicBool,
    failing_keys: RwLock<BTreeSet<String>>,
}

impl MemoryBackend {
    pub fn new(container_url: Url) -> Self {
        Self {
            container_url,
            blobs: RwLock::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
            failing_keys: RwLock::new(BTreeSet::new()),
        }
    }

    /// Simulate the service becoming unreachable (or reachable again)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make every write touching `key` fail with an I/O error
    pub fn fail_writes_for(&self, key: &str) {
        if let Ok(mut keys) = self.failing_keys.write() {
            keys.insert(key.to_string());
        }
    }

    fn check_online(&self) -> BackendResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable(format!(
                "{} is offline",
                self.container_url
            )))
        } else {
            Ok(())
        }
    }

    fn check_writable(&self, key: &str) -> BackendResult<()> {
        let keys = self
            .failing_keys
            .read()
            .map_err(|_| BackendError::Io("Lock poisoned".to_string()))?;
        if keys.contains(key) {
            return Err(BackendError::Io(format!("injected write failure for {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobBackend for MemoryBackend {
    fn container_url(&self) -> &Url {
        &self.container_url
    }

    async fn put(&self, key: &str, data: Bytes) -> BackendResult<ObjectInfo> {
        self.check_online()?;
        self.check_writable(key)?;

        let info = ObjectInfo::new(key, &data, Metadata::new());
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BackendError::Io("Lock poisoned".to_string()))?;
        blobs.insert(
            key.to_string(),
            StoredBlob {
                data,
                info: info.clone(),
            },
        );
        debug!(key, size = info.size, "memory put");
        Ok(info)
    }

    async fn get(&self, key: &str) -> BackendResult<Bytes> {
        self.check_online()?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BackendError::Io("Lock poisoned".to_string()))?;
        blobs
            .get(key)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| BackendError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        self.check_online()?;
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BackendError::Io("Lock poisoned".to_string()))?;
        if blobs.remove(key).is_none() {
            return Err(BackendError::NotFound(key.to_string()));
        }
        debug!(key, "memory delete");
        Ok(())
    }

    async fn list(&self) -> BackendResult<Vec<ObjectInfo>> {
        self.check_online()?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BackendError::Io("Lock poisoned".to_string()))?;
        Ok(blobs.values().map(|blob| blob.info.clone()).collect())
    }

    async fn get_metadata(&self, key: &str) -> BackendResult<Metadata> {
        self.check_online()?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BackendError::Io("Lock poisoned".to_string()))?;
        blobs
            .get(key)
            .map(|blob| blob.info.metadata.clone())
            .ok_or_else(|| BackendError::NotFound(key.to_string()))
    }

    async fn set_metadata(&self, key: &str, metadata: Metadata) -> BackendResult<()> {
        self.check_online()?;
        self.check_writable(key)?;

        // Existence check and write happen under the same lock.
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BackendError::Io("Lock poisoned".to_string()))?;
        let blob = blobs
            .get_mut(key)
            .ok_or_else(|| BackendError::NotFound(key.to_string()))?;
        blob.info.metadata = metadata;
        Ok(())
    }
}
