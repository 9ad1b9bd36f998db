//! # Document Store Module
//!
//! Document CRUD and reordering over pluggable blob backends.
//!
//! Every operation returns an [`OperationResult`]; failures never cross the
//! store boundary as `Err` or panics.

pub mod backend;
pub mod config;
pub mod entity;
pub mod errors;
pub mod local;
pub mod memory;
pub mod result;
pub mod store;

pub use backend::{BlobBackend, Metadata, ObjectInfo};
pub use config::{BackendKind, ConfigError, StoreConfig};
pub use entity::{validate_name, DocumentEntity};
pub use errors::{BackendError, BackendResult, StoreError};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use result::OperationResult;
pub use store::{BlobDocumentStore, DocumentStore, ReorderBatch, ORDER_METADATA_KEY};
