//! # Document Store Errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for backend primitives
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors surfaced by the document store.
///
/// Never returned as `Err` from a store operation; they travel inside an
/// [`OperationResult`](super::result::OperationResult).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Reserved for overwrite-guard policies; uploads currently overwrite.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::ValidationFailed(_) => "DOCSTORE_VALIDATION_FAILED",
            StoreError::NotFound(_) => "DOCSTORE_NOT_FOUND",
            StoreError::BackendUnavailable(_) => "DOCSTORE_BACKEND_UNAVAILABLE",
            StoreError::WriteFailed(_) => "DOCSTORE_WRITE_FAILED",
            StoreError::Conflict(_) => "DOCSTORE_CONFLICT",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::ValidationFailed(_) => 400,
            StoreError::NotFound(_) => 404,
            StoreError::Conflict(_) => 409,
            StoreError::WriteFailed(_) => 500,
            StoreError::BackendUnavailable(_) => 503,
        }
    }

    /// Map a backend fault seen on a read or metadata path
    pub(crate) fn from_backend(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(key) => StoreError::NotFound(key),
            BackendError::Unavailable(msg) | BackendError::Io(msg) => {
                StoreError::BackendUnavailable(msg)
            }
        }
    }

    /// Map a backend fault seen while persisting content
    pub(crate) fn from_backend_write(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(msg) => StoreError::BackendUnavailable(msg),
            BackendError::NotFound(key) => {
                StoreError::WriteFailed(format!("container missing while writing {}", key))
            }
            BackendError::Io(msg) => StoreError::WriteFailed(msg),
        }
    }
}

/// Errors reported by blob backend primitives
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Service unreachable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreError::NotFound("a.pdf".into()).status_code(), 404);
        assert_eq!(StoreError::ValidationFailed("x".into()).status_code(), 400);
        assert_eq!(StoreError::BackendUnavailable("down".into()).status_code(), 503);
    }

    #[test]
    fn test_backend_mapping() {
        assert_eq!(
            StoreError::from_backend(BackendError::NotFound("a".into())),
            StoreError::NotFound("a".into())
        );
        assert_eq!(
            StoreError::from_backend(BackendError::Io("disk".into())),
            StoreError::BackendUnavailable("disk".into())
        );
        assert_eq!(
            StoreError::from_backend_write(BackendError::Io("disk".into())),
            StoreError::WriteFailed("disk".into())
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(StoreError::NotFound("a.pdf".into())).unwrap();
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["message"], "a.pdf");
    }
}
