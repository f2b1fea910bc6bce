//! Worker scheduler for background tasks.

use chatlog_core::{Error, Result};
use chrono::{NaiveTime, Utc};
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::flush::{log_flush_report, FlushReport, FlushWorker};
use crate::partitions::PartitionWorker;
use crate::reports::{ReportTrigger, ReportWorker};
use crate::schedule::Schedule;

/// Worker configuration (the `worker` config section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Seconds between flush cycles
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Put failed batches back into the buffer instead of dropping them
    #[serde(default)]
    pub requeue_failed_batches: bool,
    /// When today's partitions are registered (also once at startup)
    #[serde(default = "default_partition_schedule")]
    pub partition_schedule: Schedule,
    /// Report triggers
    #[serde(default = "ReportTrigger::defaults")]
    pub reports: Vec<ReportTrigger>,
    /// Pause between report messages, in milliseconds
    #[serde(default = "default_publish_delay_ms")]
    pub publish_delay_ms: u64,
    /// Seconds between metrics snapshots and health refreshes
    #[serde(default = "default_metrics_log_interval_secs")]
    pub metrics_log_interval_secs: u64,
}

fn default_flush_interval_secs() -> u64 {
    900
}

fn default_partition_schedule() -> Schedule {
    Schedule::daily(NaiveTime::from_hms_opt(0, 0, 30).unwrap_or_default())
}

fn default_publish_delay_ms() -> u64 {
    2000
}

fn default_metrics_log_interval_secs() -> u64 {
    60
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval_secs(),
            requeue_failed_batches: false,
            partition_schedule: default_partition_schedule(),
            reports: ReportTrigger::defaults(),
            publish_delay_ms: default_publish_delay_ms(),
            metrics_log_interval_secs: default_metrics_log_interval_secs(),
        }
    }
}

impl WorkerSettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn publish_delay(&self) -> Duration {
        Duration::from_millis(self.publish_delay_ms)
    }

    pub fn metrics_log_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_log_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.flush_interval_secs == 0 {
            return Err(Error::config("worker.flush_interval_secs must be positive"));
        }
        if self.metrics_log_interval_secs == 0 {
            return Err(Error::config(
                "worker.metrics_log_interval_secs must be positive",
            ));
        }
        if let Some(trigger) = self.reports.iter().find(|t| t.days == 0) {
            return Err(Error::config(format!(
                "report '{}' must cover at least one day",
                trigger.name
            )));
        }
        Ok(())
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    settings: WorkerSettings,
    flush: FlushWorker,
    partitions: PartitionWorker,
    reports: ReportWorker,
    store: Arc<dyn ObjectStore>,
}

impl WorkerScheduler {
    pub fn new(
        settings: WorkerSettings,
        flush: FlushWorker,
        partitions: PartitionWorker,
        reports: ReportWorker,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            settings,
            flush,
            partitions,
            reports,
            store,
        }
    }

    /// Runs one flush cycle outside the schedule.
    pub async fn flush_now(&self) -> FlushReport {
        let report = self.flush.run_cycle().await;
        log_flush_report(&report);
        report
    }

    /// Starts all background workers.
    ///
    /// Every loop exits once `shutdown` flips to `true`; the flush loop runs
    /// one last cycle first.
    pub fn start(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        let rx = shutdown.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_flush_loop(rx).await;
        }));

        let scheduler = self.clone();
        let rx = shutdown.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_partition_loop(rx).await;
        }));

        for trigger in self.settings.reports.clone() {
            let scheduler = self.clone();
            let rx = shutdown.clone();
            handles.push(tokio::spawn(async move {
                scheduler.run_report_loop(trigger, rx).await;
            }));
        }

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log(shutdown).await;
        }));

        info!(
            flush_interval_secs = self.settings.flush_interval_secs,
            reports = self.settings.reports.len(),
            "Background workers started"
        );
        handles
    }

    async fn run_flush_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.settings.flush_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            self.flush_now().await;
        }

        info!("Running final flush");
        self.flush_now().await;
    }

    async fn run_partition_loop(&self, mut shutdown: watch::Receiver<bool>) {
        if let Err(e) = self.partitions.run_at(Utc::now()).await {
            error!(error = %e, "Startup partition registration failed");
        }

        let schedule = self.settings.partition_schedule;
        while wait_for(&schedule, &mut shutdown).await {
            if let Err(e) = self.partitions.run_at(Utc::now()).await {
                error!(error = %e, "Partition registration failed");
            }
        }
    }

    async fn run_report_loop(&self, trigger: ReportTrigger, mut shutdown: watch::Receiver<bool>) {
        while wait_for(&trigger.schedule, &mut shutdown).await {
            self.reports.run_at(&trigger, Utc::now()).await;
        }
    }

    async fn run_metrics_log(&self, mut shutdown: watch::Receiver<bool>) {
        use telemetry::metrics;

        let mut ticker = interval(self.settings.metrics_log_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            logstore::health::check_connection(self.store.as_ref()).await;
            query_client::health::check_connection(self.partitions.service().as_ref()).await;

            let snapshot = metrics().snapshot();
            info!(
                events_received = snapshot.events_received,
                events_rejected = snapshot.events_rejected,
                buffered_lines = snapshot.buffered_lines,
                uploads = snapshot.uploads_succeeded,
                upload_errors = snapshot.upload_errors,
                lines_dropped = snapshot.lines_dropped,
                queries_succeeded = snapshot.queries_succeeded,
                query_retries = snapshot.query_retries,
                queries_exhausted = snapshot.queries_exhausted,
                query_timeouts = snapshot.query_timeouts,
                reports_published = snapshot.reports_published,
                "Metrics snapshot"
            );
        }
    }
}

/// Sleeps until the next firing of `schedule`. Returns `false` if shutdown
/// was signalled first.
async fn wait_for(schedule: &Schedule, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    let delay = schedule.until_next(Utc::now());
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = shutdown.changed() => false,
    }
}
