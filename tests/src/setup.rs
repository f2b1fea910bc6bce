//! Common test setup functions.

use api::{router, state::AppState};
use axum::Router;
use futures::TryStreamExt;
use logstore::{BlobLogWriter, ChannelBuffer};
use object_store::memory::InMemory;
use object_store::ObjectStore;
use query_client::{ExecutorConfig, QueryConfig, QueryExecutor};
use std::sync::Arc;
use std::time::Duration;
use worker::{FlushWorker, PartitionWorker, ReportWorker};

use crate::fixtures::CHANNELS;
use crate::mocks::{FailingSink, MockPublisher, MockQueryService};

/// Test context wiring the production components to in-process fakes.
///
/// - The real Axum router over a real `ChannelBuffer`
/// - `BlobLogWriter` over an in-memory object store, behind a `FailingSink`
/// - `QueryExecutor` over a scripted `MockQueryService`
pub struct TestContext {
    pub buffer: Arc<ChannelBuffer>,
    pub store: Arc<dyn ObjectStore>,
    pub sink: Arc<FailingSink>,
    pub query: MockQueryService,
    pub publisher: MockPublisher,
    pub query_config: QueryConfig,
    pub router: Router,
}

impl TestContext {
    /// Create a new test context with the fixture channels registered.
    pub fn new() -> Self {
        let buffer = Arc::new(ChannelBuffer::with_channels(CHANNELS));
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let writer = Arc::new(BlobLogWriter::new(store.clone(), None));
        let sink = Arc::new(FailingSink::new(writer));

        let query_config = QueryConfig {
            database: "chatlogs".into(),
            table: "messages".into(),
            output_location: "s3://results/".into(),
            top_n: 5,
            ..QueryConfig::default()
        };

        let router = router(AppState::new(buffer.clone()));

        Self {
            buffer,
            store,
            sink,
            query: MockQueryService::new(),
            publisher: MockPublisher::new(),
            query_config,
            router,
        }
    }

    /// Executor with short poll interval and timeout.
    pub fn executor(&self, retry_budget: u32) -> QueryExecutor {
        QueryExecutor::new(
            Arc::new(self.query.clone()),
            ExecutorConfig {
                poll_interval: Duration::from_millis(10),
                timeout: Duration::from_secs(5),
                retry_budget,
            },
        )
    }

    pub fn flush_worker(&self, requeue: bool) -> FlushWorker {
        FlushWorker::new(self.buffer.clone(), self.sink.clone()).with_requeue(requeue)
    }

    pub fn partition_worker(&self) -> PartitionWorker {
        PartitionWorker::new(self.executor(3), self.buffer.clone(), &self.query_config)
    }

    pub fn report_worker(&self, publish_delay: Duration) -> ReportWorker {
        ReportWorker::new(
            self.executor(3),
            Arc::new(self.publisher.clone()),
            self.buffer.clone(),
            &self.query_config,
            publish_delay,
        )
    }

    /// Every stored object as `(key, body)`, sorted by key.
    pub async fn objects(&self) -> Vec<(String, String)> {
        let metas: Vec<_> = self
            .store
            .list(None)
            .try_collect()
            .await
            .unwrap_or_default();

        let mut objects = Vec::new();
        for meta in metas {
            let Ok(result) = self.store.get(&meta.location).await else {
                continue;
            };
            let Ok(body) = result.bytes().await else {
                continue;
            };
            objects.push((
                meta.location.to_string(),
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }
        objects.sort();
        objects
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
