//! # Document Store
//!
//! Orchestrates document operations against a [`BlobBackend`] and reports
//! every outcome through an [`OperationResult`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{info, warn};

use super::backend::{BlobBackend, Metadata, ObjectInfo};
use super::config::{ConfigError, StoreConfig};
use super::entity::{validate_name, DocumentEntity};
use super::errors::{BackendError, StoreError};
use super::result::OperationResult;

/// Metadata key holding a document's persisted order
pub const ORDER_METADATA_KEY: &str = "order";

/// Non-empty batch of entities with distinct names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderBatch(Vec<DocumentEntity>);

impl ReorderBatch {
    pub fn new(entities: Vec<DocumentEntity>) -> Result<Self, StoreError> {
        if entities.is_empty() {
            return Err(StoreError::ValidationFailed(
                "reorder requires at least one document".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(entities.len());
        for entity in &entities {
            if !seen.insert(entity.name()) {
                return Err(StoreError::ValidationFailed(format!(
                    "document '{}' appears more than once in the batch",
                    entity.name()
                )));
            }
        }
        Ok(Self(entities))
    }

    pub fn entities(&self) -> &[DocumentEntity] {
        &self.0
    }
}

impl From<DocumentEntity> for ReorderBatch {
    fn from(entity: DocumentEntity) -> Self {
        Self(vec![entity])
    }
}

impl TryFrom<Vec<DocumentEntity>> for ReorderBatch {
    type Error = StoreError;

    fn try_from(entities: Vec<DocumentEntity>) -> Result<Self, Self::Error> {
        Self::new(entities)
    }
}

/// Document store capability set
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store `content` under `name`, replacing any existing document.
    ///
    /// The stream is read to the end and dropped before returning.
    async fn upload<R>(&self, name: &str, content: R) -> OperationResult<DocumentEntity>
    where
        R: AsyncRead + Unpin + Send;

    /// Remove a document. Fails with `NotFound` if it does not exist.
    async fn delete(&self, name: &str) -> OperationResult<()>;

    /// All documents, ordered by their persisted order
    async fn get_all(&self) -> OperationResult<Vec<DocumentEntity>>;

    /// Persist the order of every entity in `batch`, all or nothing
    async fn reorder(&self, batch: ReorderBatch) -> OperationResult<Vec<DocumentEntity>>;

    async fn download(&self, name: &str) -> OperationResult<Bytes>;
}

/// Document store over any blob backend
#[derive(Debug)]
pub struct BlobDocumentStore<B: ?Sized = dyn BlobBackend> {
    backend: Arc<B>,
    max_document_size: u64,
}

impl<B: ?Sized> Clone for BlobDocumentStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            max_document_size: self.max_document_size,
        }
    }
}

impl BlobDocumentStore {
    /// Open the backend named by `config`
    pub async fn open(config: &StoreConfig) -> Result<Self, ConfigError> {
        let backend = config.open_backend().await?;
        Ok(Self::new(backend, config))
    }
}

impl<B: BlobBackend + ?Sized> BlobDocumentStore<B> {
    pub fn new(backend: Arc<B>, config: &StoreConfig) -> Self {
        Self {
            backend,
            max_document_size: config.max_document_size,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Entity for `name` located inside this store's container
    pub(crate) fn entity_for(
        &self,
        name: &str,
        size: u64,
        order: Option<i64>,
    ) -> Result<DocumentEntity, StoreError> {
        let mut location = self.backend.container_url().clone();
        location
            .path_segments_mut()
            .map_err(|_| {
                StoreError::ValidationFailed(format!(
                    "container URL '{}' cannot hold documents",
                    self.backend.container_url()
                ))
            })?
            .pop_if_empty()
            .push(name);
        DocumentEntity::create(name, size, location.as_str(), order)
    }

    async fn read_content<R>(&self, name: &str, content: &mut R) -> Result<Vec<u8>, StoreError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut data = Vec::new();
        let read = if self.max_document_size > 0 {
            (&mut *content)
                .take(self.max_document_size.saturating_add(1))
                .read_to_end(&mut data)
                .await
        } else {
            content.read_to_end(&mut data).await
        };
        read.map_err(|e| StoreError::WriteFailed(format!("reading content of '{}': {}", name, e)))?;

        if self.max_document_size > 0 && data.len() as u64 > self.max_document_size {
            drain(name, content).await;
            return Err(StoreError::ValidationFailed(format!(
                "document '{}' exceeds the maximum size of {} bytes",
                name, self.max_document_size
            )));
        }
        Ok(data)
    }

    async fn try_upload<R>(&self, name: &str, content: &mut R) -> Result<DocumentEntity, StoreError>
    where
        R: AsyncRead + Unpin + Send,
    {
        if let Err(e) = validate_name(name) {
            drain(name, content).await;
            return Err(e);
        }
        let data = self.read_content(name, content).await?;

        let info = self
            .backend
            .put(name, Bytes::from(data))
            .await
            .map_err(StoreError::from_backend_write)?;

        self.entity_for(name, info.size, None)
    }

    async fn try_get_all(&self) -> Result<Vec<DocumentEntity>, StoreError> {
        let objects = self.backend.list().await.map_err(StoreError::from_backend)?;

        let mut entities: Vec<DocumentEntity> = objects
            .iter()
            .filter_map(|object| {
                match self.entity_for(&object.key, object.size, persisted_order(object)) {
                    Ok(entity) => Some(entity),
                    Err(e) => {
                        warn!(key = %object.key, error = %e, "Skipping unrepresentable object");
                        None
                    }
                }
            })
            .collect();

        // Stable: unordered documents keep enumeration order after ordered ones.
        entities.sort_by_key(|entity| (entity.order().is_none(), entity.order()));
        Ok(entities)
    }

    async fn try_reorder(&self, batch: &ReorderBatch) -> Result<Vec<DocumentEntity>, StoreError> {
        let entities = batch.entities();

        // Every target must exist before anything is written.
        let mut previous = Vec::with_capacity(entities.len());
        for entity in entities {
            let metadata = self
                .backend
                .get_metadata(entity.name())
                .await
                .map_err(StoreError::from_backend)?;
            previous.push(metadata);
        }

        for (index, (entity, prior)) in entities.iter().zip(&previous).enumerate() {
            let mut metadata = prior.clone();
            match entity.order() {
                Some(order) => {
                    metadata.insert(ORDER_METADATA_KEY.to_string(), order.to_string());
                }
                None => {
                    metadata.remove(ORDER_METADATA_KEY);
                }
            }

            // set_metadata re-checks existence, so a racing delete surfaces here.
            if let Err(e) = self.backend.set_metadata(entity.name(), metadata).await {
                self.restore_metadata(&entities[..index], &previous[..index])
                    .await;
                return Err(match e {
                    BackendError::NotFound(key) => StoreError::NotFound(key),
                    other => StoreError::from_backend_write(other),
                });
            }
        }

        self.try_get_all().await
    }

    async fn restore_metadata(&self, applied: &[DocumentEntity], previous: &[Metadata]) {
        for (entity, prior) in applied.iter().zip(previous) {
            match self.backend.set_metadata(entity.name(), prior.clone()).await {
                Ok(()) | Err(BackendError::NotFound(_)) => {}
                Err(e) => {
                    warn!(name = entity.name(), error = %e, "Failed to restore order metadata")
                }
            }
        }
    }
}

/// Read the rest of a stream that will not be stored
async fn drain<R>(name: &str, content: &mut R)
where
    R: AsyncRead + Unpin + Send,
{
    if let Err(e) = tokio::io::copy(content, &mut tokio::io::sink()).await {
        warn!(name, error = %e, "Failed to drain rejected content");
    }
}

fn persisted_order(object: &ObjectInfo) -> Option<i64> {
    let raw = object.metadata.get(ORDER_METADATA_KEY)?;
    match raw.trim().parse() {
        Ok(order) => Some(order),
        Err(_) => {
            warn!(key = %object.key, value = %raw, "Ignoring unparseable order metadata");
            None
        }
    }
}

fn log_failure(operation: &str, name: &str, error: &StoreError) {
    warn!(operation, name, code = error.code(), error = %error, "Document operation failed");
}

#[async_trait]
impl<B: BlobBackend + ?Sized> DocumentStore for BlobDocumentStore<B> {
    async fn upload<R>(&self, name: &str, mut content: R) -> OperationResult<DocumentEntity>
    where
        R: AsyncRead + Unpin + Send,
    {
        let result = self.try_upload(name, &mut content).await;
        drop(content);

        match &result {
            Ok(entity) => info!(name, size = entity.size(), "Uploaded document"),
            Err(e) => log_failure("upload", name, e),
        }
        result.into()
    }

    async fn delete(&self, name: &str) -> OperationResult<()> {
        let result = match validate_name(name) {
            Ok(()) => self
                .backend
                .delete(name)
                .await
                .map_err(StoreError::from_backend),
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => info!(name, "Deleted document"),
            Err(e) => log_failure("delete", name, e),
        }
        result.into()
    }

    async fn get_all(&self) -> OperationResult<Vec<DocumentEntity>> {
        let result = self.try_get_all().await;
        if let Err(e) = &result {
            log_failure("get_all", "*", e);
        }
        result.into()
    }

    async fn reorder(&self, batch: ReorderBatch) -> OperationResult<Vec<DocumentEntity>> {
        let result = self.try_reorder(&batch).await;

        match &result {
            Ok(_) => info!(count = batch.entities().len(), "Reordered documents"),
            Err(e) => {
                let names: Vec<&str> = batch.entities().iter().map(DocumentEntity::name).collect();
                log_failure("reorder", &names.join(","), e);
            }
        }
        result.into()
    }

    async fn download(&self, name: &str) -> OperationResult<Bytes> {
        let result = match validate_name(name) {
            Ok(()) => self.backend.get(name).await.map_err(StoreError::from_backend),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            log_failure("download", name, e);
        }
        result.into()
    }
}
