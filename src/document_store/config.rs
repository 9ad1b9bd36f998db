//! # Store Configuration
//!
//! Passed explicitly at store construction; nothing is read from the
//! environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::backend::BlobBackend;
use super::local::LocalBackend;
use super::memory::MemoryBackend;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to open backend: {0}")]
    Backend(String),
}

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process container (for testing and development)
    #[default]
    Memory,
    /// Filesystem container under `root_dir`
    Local,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "local" | "filesystem" => Ok(BackendKind::Local),
            _ => Err(ConfigError::Invalid(format!("Unknown backend type: {}", s))),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Blob service endpoint the container lives under
    #[serde(default = "default_service_uri")]
    pub service_uri: String,

    #[serde(default)]
    pub container_prefix: String,

    #[serde(default = "default_container_name")]
    pub container_name: String,

    /// Root directory for the local backend
    #[serde(default)]
    pub root_dir: Option<PathBuf>,

    /// Maximum document size in bytes (0 = unlimited)
    #[serde(default = "default_max_document_size")]
    pub max_document_size: u64,
}

fn default_service_uri() -> String {
    "http://127.0.0.1:10000/devstoreaccount1".to_string()
}

fn default_container_name() -> String {
    "documents".to_string()
}

fn default_max_document_size() -> u64 {
    100 * 1024 * 1024 // 100MB
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            service_uri: default_service_uri(),
            container_prefix: String::new(),
            container_name: default_container_name(),
            root_dir: None,
            max_document_size: default_max_document_size(),
        }
    }
}

impl StoreConfig {
    /// Config for a local backend rooted at `root_dir`
    pub fn local(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Local,
            root_dir: Some(root_dir.into()),
            ..Default::default()
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: StoreConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.container_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "container_name must not be empty".to_string(),
            ));
        }
        if self.container_name.contains('/') || self.container_prefix.contains('/') {
            return Err(ConfigError::Invalid(
                "container_prefix and container_name must not contain '/'".to_string(),
            ));
        }
        self.container_url()?;

        if self.backend == BackendKind::Local && self.root_dir.is_none() {
            return Err(ConfigError::Invalid(
                "root_dir is required for the local backend".to_string(),
            ));
        }
        Ok(())
    }

    /// `{service_uri}/{container_prefix}{container_name}/`
    pub fn container_url(&self) -> Result<Url, ConfigError> {
        let raw = format!(
            "{}/{}{}/",
            self.service_uri.trim_end_matches('/'),
            self.container_prefix,
            self.container_name
        );
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::Invalid(format!("service_uri '{}': {}", self.service_uri, e)))?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!(
                "service_uri '{}' is not a hierarchical URI",
                self.service_uri
            )));
        }
        Ok(url)
    }

    /// Build the configured backend
    pub async fn open_backend(&self) -> Result<Arc<dyn BlobBackend>, ConfigError> {
        self.validate()?;
        match self.backend {
            BackendKind::Memory => {
                Ok(Arc::new(MemoryBackend::new(self.container_url()?)) as Arc<dyn BlobBackend>)
            }
            BackendKind::Local => {
                let root = self.root_dir.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("root_dir is required for the local backend".to_string())
                })?;
                let backend = LocalBackend::open(root)
                    .await
                    .map_err(|e| ConfigError::Backend(e.to_string()))?;
                Ok(Arc::new(backend) as Arc<dyn BlobBackend>)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.max_document_size, 100 * 1024 * 1024);
        config.validate().unwrap();
    }

    #[test]
    fn test_container_url() {
        let config = StoreConfig {
            container_prefix: "test-".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.container_url().unwrap().as_str(),
            "http://127.0.0.1:10000/devstoreaccount1/test-documents/"
        );
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("MEMORY".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("filesystem".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert!("s3".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_local_requires_root() {
        let config = StoreConfig {
            backend: BackendKind::Local,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_service_uri() {
        let config = StoreConfig {
            service_uri: "not a uri".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("docstore.json");
        std::fs::write(
            &path,
            r#"{ "backend": "local", "root_dir": "/var/lib/docstore", "max_document_size": 0 }"#,
        )
        .unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Local);
        assert_eq!(config.max_document_size, 0);
        assert_eq!(config.container_name, "documents");
    }

    #[tokio::test]
    async fn test_open_local_backend() {
        let temp = TempDir::new().unwrap();
        let backend = StoreConfig::local(temp.path()).open_backend().await.unwrap();
        assert_eq!(backend.container_url().scheme(), "file");
    }
}
