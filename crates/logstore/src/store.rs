//! Object store construction.

use crate::config::{StorageBackend, StorageConfig};
use chatlog_core::{Error, Result};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Builds the configured object store.
///
/// S3 credentials come from the standard AWS environment variables.
pub fn build_object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        StorageBackend::S3 => build_s3(config)?,
        StorageBackend::Local => build_local(config)?,
        StorageBackend::Memory => Arc::new(InMemory::new()),
    };

    info!(location = %config.describe(), "Object store configured");
    Ok(store)
}

fn build_s3(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    if config.bucket.trim().is_empty() {
        return Err(Error::config("storage.bucket is required for the s3 backend"));
    }

    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(&config.bucket)
        .with_region(&config.region);

    if let Some(endpoint) = &config.endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_virtual_hosted_style_request(false);
    }
    if config.allow_http {
        builder = builder.with_allow_http(true);
    }

    let store = builder
        .build()
        .map_err(|e| Error::config(format!("failed to build S3 client: {}", e)))?;
    Ok(Arc::new(store))
}

fn build_local(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let root = PathBuf::from(config.local_root.trim());
    if root.as_os_str().is_empty() {
        return Err(Error::config("storage.local_root is required for the local backend"));
    }

    std::fs::create_dir_all(&root).map_err(|e| {
        Error::config(format!(
            "failed to create storage directory '{}': {}",
            root.display(),
            e
        ))
    })?;
    let root = root.canonicalize().map_err(|e| {
        Error::config(format!("failed to resolve '{}': {}", root.display(), e))
    })?;

    let store = LocalFileSystem::new_with_prefix(&root)
        .map_err(|e| Error::config(format!("local store: {}", e)))?;
    Ok(Arc::new(store))
}
