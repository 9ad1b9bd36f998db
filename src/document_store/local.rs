//! # Local Filesystem Backend
//!
//! Layout under the root directory:
//!
//! ```text
//! blobs/<key>        content
//! meta/<key>.json    checksum and user metadata
//! tmp/               staging area; files are renamed into place
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::backend::{BlobBackend, Metadata, ObjectInfo};
use super::errors::{BackendError, BackendResult};

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetaFile {
    checksum: String,
    #[serde(default)]
    metadata: Metadata,
}

/// Local filesystem storage backend
#[derive(Debug)]
pub struct LocalBackend {
    root: PathBuf,
    container_url: Url,
    /// Serializes put, delete and set_metadata
    write_lock: Mutex<()>,
}

impl LocalBackend {
    /// Open (creating if needed) a container rooted at `root`
    pub async fn open(root: impl AsRef<Path>) -> BackendResult<Self> {
        let root = root.as_ref();
        for dir in ["blobs", "meta", "tmp"] {
            fs::create_dir_all(root.join(dir)).await?;
        }
        let root = fs::canonicalize(root).await?;

        let container_url = Url::from_directory_path(root.join("blobs")).map_err(|_| {
            BackendError::Io(format!("cannot express {} as a URL", root.display()))
        })?;

        info!(path = %root.display(), "Opened local container");

        Ok(Self {
            root,
            container_url,
            write_lock: Mutex::new(()),
        })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join("blobs").join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join("meta").join(format!("{}.json", key))
    }

    fn temp_path(&self) -> PathBuf {
        self.root.join("tmp").join(Uuid::new_v4().to_string())
    }

    async fn exists(&self, key: &str) -> BackendResult<bool> {
        match fs::metadata(self.blob_path(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_meta(&self, key: &str) -> BackendResult<MetaFile> {
        match fs::read(self.meta_path(key)).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|e| BackendError::Io(format!("corrupt metadata for {}: {}", key, e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MetaFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn stage(&self, data: &[u8]) -> BackendResult<PathBuf> {
        let path = self.temp_path();
        fs::write(&path, data).await?;
        Ok(path)
    }

    async fn stage_meta(&self, meta: &MetaFile) -> BackendResult<PathBuf> {
        let raw = serde_json::to_vec(meta).map_err(|e| BackendError::Io(e.to_string()))?;
        self.stage(&raw).await
    }

    /// Put the previous content back, or remove the new object when there
    /// was none.
    async fn restore_blob(&self, key: &str, previous: Option<&Path>) {
        let blob_path = self.blob_path(key);
        let restored = match previous {
            Some(link) => fs::rename(link, &blob_path).await,
            None => match fs::remove_file(&blob_path).await {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(e) = restored {
            warn!(key, error = %e, "Failed to restore previous content");
        }
    }

    async fn discard(&self, staged: &[PathBuf]) {
        for path in staged {
            if let Err(e) = fs::remove_file(path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove staged file");
            }
        }
    }
}

fn not_found_or_io(key: &str, e: std::io::Error) -> BackendError {
    if e.kind() == std::io::ErrorKind::NotFound {
        BackendError::NotFound(key.to_string())
    } else {
        BackendError::Io(e.to_string())
    }
}

#[async_trait]
impl BlobBackend for LocalBackend {
    fn container_url(&self) -> &Url {
        &self.container_url
    }

    async fn put(&self, key: &str, data: Bytes) -> BackendResult<ObjectInfo> {
        let info = ObjectInfo::new(key, &data, Metadata::new());
        let meta = MetaFile {
            checksum: info.checksum.clone(),
            metadata: Metadata::new(),
        };

        let staged_blob = self.stage(&data).await?;
        let staged_meta = match self.stage_meta(&meta).await {
            Ok(path) => path,
            Err(e) => {
                self.discard(&[staged_blob]).await;
                return Err(e);
            }
        };

        let _guard = self.write_lock.lock().await;
        let blob_path = self.blob_path(key);

        // Keep a link to the previous content until the metadata is in place.
        let previous = match self.exists(key).await {
            Ok(false) => None,
            Ok(true) => {
                let link = self.temp_path();
                match fs::hard_link(&blob_path, &link).await {
                    Ok(()) => Some(link),
                    Err(e) => {
                        self.discard(&[staged_blob, staged_meta]).await;
                        return Err(e.into());
                    }
                }
            }
            Err(e) => {
                self.discard(&[staged_blob, staged_meta]).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&staged_blob, &blob_path).await {
            let mut leftovers = vec![staged_blob, staged_meta];
            leftovers.extend(previous);
            self.discard(&leftovers).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&staged_meta, self.meta_path(key)).await {
            self.restore_blob(key, previous.as_deref()).await;
            self.discard(&[staged_meta]).await;
            return Err(e.into());
        }
        if let Some(link) = previous {
            self.discard(&[link]).await;
        }

        debug!(key, size = info.size, "local put");
        Ok(info)
    }

    async fn get(&self, key: &str) -> BackendResult<Bytes> {
        fs::read(self.blob_path(key))
            .await
            .map(Bytes::from)
            .map_err(|e| not_found_or_io(key, e))
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        let _guard = self.write_lock.lock().await;
        fs::remove_file(self.blob_path(key))
            .await
            .map_err(|e| not_found_or_io(key, e))?;

        match fs::remove_file(self.meta_path(key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            // Orphaned metadata is ignored by list and replaced by put.
            Err(e) => warn!(key, error = %e, "Failed to remove metadata"),
        }

        debug!(key, "local delete");
        Ok(())
    }

    async fn list(&self) -> BackendResult<Vec<ObjectInfo>> {
        let mut entries = fs::read_dir(self.root.join("blobs"))
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                // Deleted between read_dir and stat.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let Some(key) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %entry.path().display(), "Skipping non UTF-8 blob name");
                continue;
            };

            let meta = match self.read_meta(&key).await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(key = %key, error = %e, "Ignoring unreadable metadata");
                    MetaFile::default()
                }
            };

            objects.push(ObjectInfo {
                key,
                size: file_meta.len(),
                metadata: meta.metadata,
                checksum: meta.checksum,
            });
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn get_metadata(&self, key: &str) -> BackendResult<Metadata> {
        if !self.exists(key).await? {
            return Err(BackendError::NotFound(key.to_string()));
        }
        Ok(self.read_meta(key).await?.metadata)
    }

    async fn set_metadata(&self, key: &str, metadata: Metadata) -> BackendResult<()> {
        let _guard = self.write_lock.lock().await;
        if !self.exists(key).await? {
            return Err(BackendError::NotFound(key.to_string()));
        }

        let checksum = self.read_meta(key).await?.checksum;
        let staged = self.stage_meta(&MetaFile { checksum, metadata }).await?;
        if let Err(e) = fs::rename(&staged, self.meta_path(key)).await {
            self.discard(&[staged]).await;
            return Err(e.into());
        }
        Ok(())
    }
}
