//! Channel batch upload.

use async_trait::async_trait;
use bytes::Bytes;
use chatlog_core::{blob_key, encode_lines, Error, LogLine, Result};
use chrono::{DateTime, Utc};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;

/// Lines drained from one channel in one flush cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushBatch {
    pub channel: String,
    pub lines: Vec<LogLine>,
}

impl FlushBatch {
    pub fn new(channel: impl Into<String>, lines: Vec<LogLine>) -> Self {
        Self {
            channel: channel.into(),
            lines,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// An uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenObject {
    pub channel: String,
    pub key: String,
    pub lines: usize,
    pub bytes: usize,
}

/// Destination for flushed channel batches.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Writes one batch as one object.
    async fn write_batch(&self, batch: &FlushBatch) -> Result<WrittenObject>;
}

/// Writes each batch as a newline-delimited object under a
/// `channel=<c>/date_string=<d>/` prefix.
#[derive(Clone)]
pub struct BlobLogWriter {
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
}

impl BlobLogWriter {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<String>) -> Self {
        Self { store, prefix }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Uploads `batch` with the key derived from `now`.
    pub async fn write_batch_at(
        &self,
        batch: &FlushBatch,
        now: DateTime<Utc>,
    ) -> Result<WrittenObject> {
        let key = blob_key(self.prefix.as_deref(), &batch.channel, now);
        let body = Bytes::from(encode_lines(&batch.lines));
        let bytes = body.len();

        self.store
            .put(&ObjectPath::from(key.as_str()), body.into())
            .await
            .map_err(|e| Error::storage(format!("put {} failed: {}", key, e)))?;

        debug!(
            channel = %batch.channel,
            key = %key,
            lines = batch.len(),
            bytes = bytes,
            "Uploaded channel batch"
        );

        Ok(WrittenObject {
            channel: batch.channel.clone(),
            key,
            lines: batch.len(),
            bytes,
        })
    }
}

#[async_trait]
impl LogSink for BlobLogWriter {
    async fn write_batch(&self, batch: &FlushBatch) -> Result<WrittenObject> {
        self.write_batch_at(batch, Utc::now()).await
    }
}
