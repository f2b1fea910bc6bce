//! Blob storage configuration.

use serde::{Deserialize, Serialize};

/// Which object store implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Local,
    Memory,
}

/// Blob storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store implementation
    #[serde(default)]
    pub backend: StorageBackend,
    /// Bucket name (S3 only)
    #[serde(default)]
    pub bucket: String,
    /// AWS region (S3 only)
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores such as MinIO
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Allow plain HTTP to the endpoint
    #[serde(default)]
    pub allow_http: bool,
    /// Key prefix prepended to every object
    #[serde(default)]
    pub prefix: Option<String>,
    /// Root directory for the local backend
    #[serde(default = "default_local_root")]
    pub local_root: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_local_root() -> String {
    "./data/logs".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: String::new(),
            region: default_region(),
            endpoint: None,
            allow_http: false,
            prefix: None,
            local_root: default_local_root(),
        }
    }
}

impl StorageConfig {
    /// In-memory store, for development and tests.
    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            ..Self::default()
        }
    }

    /// Human-readable location for logs.
    pub fn describe(&self) -> String {
        match self.backend {
            StorageBackend::S3 => format!("s3://{}", self.bucket),
            StorageBackend::Local => format!("file://{}", self.local_root),
            StorageBackend::Memory => "memory://".to_string(),
        }
    }
}
