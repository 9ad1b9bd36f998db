//! # Operation Result Envelope

use serde::Serialize;

use super::errors::StoreError;

/// Uniform success/failure envelope returned by every store operation.
///
/// Exactly one of `result` and `error` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult<T> {
    successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<StoreError>,
}

impl<T> OperationResult<T> {
    pub fn success(value: T) -> Self {
        Self {
            successful: true,
            result: Some(value),
            error: None,
        }
    }

    pub fn failure(error: StoreError) -> Self {
        Self {
            successful: false,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.successful
    }

    /// Payload of a successful operation
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// Reason of a failed operation
    pub fn error(&self) -> Option<&StoreError> {
        self.error.as_ref()
    }

    /// Human-readable failure description
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        OperationResult {
            successful: self.successful,
            result: self.result.map(f),
            error: self.error,
        }
    }

    pub fn into_result(self) -> Result<T, StoreError> {
        match (self.result, self.error) {
            (Some(value), None) => Ok(value),
            (_, Some(error)) => Err(error),
            (None, None) => Err(StoreError::BackendUnavailable(
                "operation produced no outcome".to_string(),
            )),
        }
    }
}

impl<T> From<Result<T, StoreError>> for OperationResult<T> {
    fn from(result: Result<T, StoreError>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(error) => Self::failure(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let result = OperationResult::success(3u64);
        assert!(result.is_successful());
        assert_eq!(result.result(), Some(&3));
        assert!(result.error().is_none());
        assert_eq!(result.into_result(), Ok(3));
    }

    #[test]
    fn test_failure_envelope() {
        let result: OperationResult<u64> =
            OperationResult::failure(StoreError::NotFound("gone.pdf".into()));
        assert!(!result.is_successful());
        assert!(result.result().is_none());
        assert_eq!(
            result.error_message().as_deref(),
            Some("Document not found: gone.pdf")
        );
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let ok = serde_json::to_value(OperationResult::success(vec![1, 2])).unwrap();
        assert_eq!(ok, json!({ "successful": true, "result": [1, 2] }));

        let failed: OperationResult<()> =
            OperationResult::failure(StoreError::WriteFailed("disk full".into()));
        let failed = serde_json::to_value(failed).unwrap();
        assert_eq!(
            failed,
            json!({
                "successful": false,
                "error": { "kind": "write_failed", "message": "disk full" }
            })
        );
    }

    #[test]
    fn test_from_result() {
        let result: OperationResult<()> = Err(StoreError::Conflict("x".into())).into();
        assert!(!result.is_successful());
        assert_eq!(result.map(|_| 1).error(), Some(&StoreError::Conflict("x".into())));
    }
}
