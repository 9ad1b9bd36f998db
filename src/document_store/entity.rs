//! # Document Entity
//!
//! Immutable metadata record for one stored document.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use super::errors::StoreError;

/// Metadata of a stored document.
///
/// Built only through [`DocumentEntity::create`]; deserialization runs the
/// same validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDocumentEntity")]
pub struct DocumentEntity {
    name: String,
    size: u64,
    location: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<i64>,
}

impl DocumentEntity {
    /// Create a validated document entity
    pub fn create(
        name: impl Into<String>,
        size: u64,
        location: impl AsRef<str>,
        order: Option<i64>,
    ) -> Result<Self, StoreError> {
        let name = name.into();
        validate_name(&name)?;

        let location = Url::parse(location.as_ref()).map_err(|e| {
            StoreError::ValidationFailed(format!(
                "location '{}' is not an absolute URI: {}",
                location.as_ref(),
                e
            ))
        })?;
        if location.cannot_be_a_base() {
            return Err(StoreError::ValidationFailed(format!(
                "location '{}' is not a resource reference",
                location
            )));
        }

        Ok(Self {
            name,
            size,
            location,
            order,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn order(&self) -> Option<i64> {
        self.order
    }

    /// Copy of this entity at a different position
    pub fn with_order(&self, order: Option<i64>) -> Self {
        Self {
            order,
            ..self.clone()
        }
    }
}

/// Check that `name` is a filename-like token usable as a store key
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::ValidationFailed(
            "document name must not be empty".to_string(),
        ));
    }
    if name == "." || name == ".." {
        return Err(StoreError::ValidationFailed(format!(
            "document name '{}' is reserved",
            name
        )));
    }
    if name.contains(['/', '\\']) {
        return Err(StoreError::ValidationFailed(format!(
            "document name '{}' must not contain path separators",
            name
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(StoreError::ValidationFailed(format!(
            "document name {:?} contains control characters",
            name
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
struct RawDocumentEntity {
    name: String,
    #[serde(deserialize_with = "deserialize_size")]
    size: u64,
    location: String,
    #[serde(default)]
    order: Option<i64>,
}

impl TryFrom<RawDocumentEntity> for DocumentEntity {
    type Error = StoreError;

    fn try_from(raw: RawDocumentEntity) -> Result<Self, Self::Error> {
        DocumentEntity::create(raw.name, raw.size, raw.location, raw.order)
    }
}

/// Accepts the full `u64` range and reports negative sizes by value
fn deserialize_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    struct SizeVisitor;

    impl<'de> Visitor<'de> for SizeVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative document size")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
            u64::try_from(value)
                .map_err(|_| E::custom(format!("size must not be negative, got {}", value)))
        }
    }

    deserializer.deserialize_u64(SizeVisitor)
}
