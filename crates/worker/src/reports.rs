//! Top chatters report worker.

use crate::publisher::ChatPublisher;
use crate::schedule::Schedule;
use chatlog_core::Error;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use logstore::ChannelBuffer;
use query_client::{
    format_top_chatters, QueryConfig, QueryExecutor, ReportWindow, ResultShape, Row,
    TopChattersQuery,
};
use serde::{Deserialize, Serialize};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// A named report: window length plus when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTrigger {
    pub name: String,
    /// Window length in days.
    pub days: u32,
    pub schedule: Schedule,
}

impl ReportTrigger {
    pub fn new(name: impl Into<String>, days: u32, schedule: Schedule) -> Self {
        Self {
            name: name.into(),
            days,
            schedule,
        }
    }

    /// Daily report at 00:01:00 and weekly report on Mondays at 00:05:00.
    pub fn defaults() -> Vec<Self> {
        let daily_at = NaiveTime::from_hms_opt(0, 1, 0).unwrap_or_default();
        let weekly_at = NaiveTime::from_hms_opt(0, 5, 0).unwrap_or_default();
        vec![
            Self::new("daily", 1, Schedule::daily(daily_at)),
            Self::new("weekly", 7, Schedule::weekly(Weekday::Mon, weekly_at)),
        ]
    }
}

/// Outcome of one report run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub published: Vec<String>,
    pub empty: Vec<String>,
    pub failed: Vec<String>,
}

/// Runs per-channel top chatters queries and publishes the results.
pub struct ReportWorker {
    executor: QueryExecutor,
    publisher: Arc<dyn ChatPublisher>,
    buffer: Arc<ChannelBuffer>,
    database: String,
    table: String,
    top_n: u32,
    publish_delay: Duration,
}

impl ReportWorker {
    pub fn new(
        executor: QueryExecutor,
        publisher: Arc<dyn ChatPublisher>,
        buffer: Arc<ChannelBuffer>,
        config: &QueryConfig,
        publish_delay: Duration,
    ) -> Self {
        Self {
            executor,
            publisher,
            buffer,
            database: config.database.clone(),
            table: config.table.clone(),
            top_n: config.top_n,
            publish_delay,
        }
    }

    /// Runs `trigger` for a firing at `now`.
    ///
    /// Channel queries run concurrently; results are published one channel
    /// at a time with `publish_delay` between messages.
    pub async fn run_at(&self, trigger: &ReportTrigger, now: DateTime<Utc>) -> ReportSummary {
        let window = ReportWindow::ending_before(now, trigger.days);
        let mut summary = ReportSummary::default();

        let mut queries = JoinSet::new();
        for channel in self.buffer.channels() {
            let query = TopChattersQuery {
                database: &self.database,
                table: &self.table,
                start: window.start.date_naive(),
                end: window.end.date_naive(),
                channel: Some(channel.as_str()),
                limit: self.top_n,
            }
            .render();
            let executor = self.executor.clone();
            queries.spawn(async move {
                let result = AssertUnwindSafe(executor.execute(&query, ResultShape::Rows))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(Error::internal(format!(
                            "report query for {} panicked",
                            channel
                        )))
                    });
                (channel, result.map(|output| output.into_rows()))
            });
        }

        let mut results: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        while let Some(joined) = queries.join_next().await {
            match joined {
                Ok((channel, Ok(rows))) => {
                    results.insert(channel, rows);
                }
                Ok((channel, Err(e))) => {
                    error!(report = %trigger.name, channel = %channel, error = %e, "Report query failed");
                    summary.failed.push(channel);
                }
                Err(e) => {
                    error!(report = %trigger.name, error = %e, "Report task aborted");
                }
            }
        }

        let days = window.days();
        let mut first = true;
        for (channel, rows) in results {
            let Some(message) = format_top_chatters(&rows, days) else {
                debug!(report = %trigger.name, channel = %channel, "No chatters in window, nothing to publish");
                summary.empty.push(channel);
                continue;
            };

            if !first {
                tokio::time::sleep(self.publish_delay).await;
            }
            first = false;

            match self.publisher.say(&channel, &message).await {
                Ok(()) => {
                    metrics().reports_published.inc();
                    summary.published.push(channel);
                }
                Err(e) => {
                    metrics().publish_errors.inc();
                    warn!(report = %trigger.name, channel = %channel, error = %e, "Failed to publish report");
                    summary.failed.push(channel);
                }
            }
        }

        info!(
            report = %trigger.name,
            published = summary.published.len(),
            empty = summary.empty.len(),
            failed = summary.failed.len(),
            "Report run complete"
        );
        summary
    }
}
