//! Partition registration worker.

use chatlog_core::{PartitionKey, Result};
use chrono::{DateTime, Utc};
use logstore::ChannelBuffer;
use query_client::{partition_statement, QueryConfig, QueryExecutor, QueryService, ResultShape};
use std::collections::BTreeSet;
use std::sync::Arc;
use telemetry::metrics;
use tracing::{debug, info};

/// Registers `(channel, date)` partitions with the query service.
pub struct PartitionWorker {
    executor: QueryExecutor,
    buffer: Arc<ChannelBuffer>,
    database: String,
    table: String,
    table_location: Option<String>,
}

impl PartitionWorker {
    pub fn new(executor: QueryExecutor, buffer: Arc<ChannelBuffer>, config: &QueryConfig) -> Self {
        Self {
            executor,
            buffer,
            database: config.database.clone(),
            table: config.table.clone(),
            table_location: config.table_location.clone(),
        }
    }

    pub fn service(&self) -> &Arc<dyn QueryService> {
        self.executor.service()
    }

    /// Registers today's partition for every channel. Returns the number of
    /// partitions in the statement.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let keys: Vec<PartitionKey> = self
            .buffer
            .channels()
            .into_iter()
            .map(|channel| PartitionKey::for_time(channel, now))
            .collect();
        self.register(&keys).await
    }

    /// Registers the given keys in one statement.
    pub async fn register(&self, keys: &[PartitionKey]) -> Result<usize> {
        let Some(statement) = partition_statement(
            &self.database,
            &self.table,
            keys,
            self.table_location.as_deref(),
        ) else {
            debug!("No channels, skipping partition registration");
            return Ok(0);
        };

        let count = keys.iter().collect::<BTreeSet<_>>().len();
        self.executor.execute(&statement, ResultShape::Ack).await?;

        metrics().partitions_registered.inc_by(count as u64);
        info!(
            partitions = count,
            table = %format!("{}.{}", self.database, self.table),
            "Partitions registered"
        );
        Ok(count)
    }
}
