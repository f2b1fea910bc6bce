//! Flush worker: drains every channel buffer and uploads each batch.

use chatlog_core::Error;
use futures::FutureExt;
use logstore::{ChannelBuffer, FlushBatch, LogSink, WrittenObject};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{health, metrics};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Summary of one flush cycle.
#[derive(Debug, Default)]
pub struct FlushReport {
    pub written: Vec<WrittenObject>,
    /// `(channel, error)` per failed upload.
    pub failed: Vec<(String, String)>,
    pub lines_written: usize,
    pub lines_dropped: usize,
    pub lines_requeued: usize,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.failed.is_empty()
    }
}

/// Drains the buffer and uploads one object per non-empty channel.
pub struct FlushWorker {
    buffer: Arc<ChannelBuffer>,
    sink: Arc<dyn LogSink>,
    requeue_failed: bool,
}

impl FlushWorker {
    pub fn new(buffer: Arc<ChannelBuffer>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            buffer,
            sink,
            requeue_failed: false,
        }
    }

    /// Puts failed batches back at the head of their channel instead of
    /// dropping them.
    pub fn with_requeue(mut self, requeue_failed: bool) -> Self {
        self.requeue_failed = requeue_failed;
        self
    }

    /// Runs one cycle. Returns once every upload has finished.
    pub async fn run_cycle(&self) -> FlushReport {
        let started = Instant::now();
        let drained = self.buffer.drain_all();
        metrics().flush_cycles.inc();

        let mut uploads = JoinSet::new();
        for (channel, lines) in drained {
            if lines.is_empty() {
                continue;
            }
            let sink = self.sink.clone();
            let batch = FlushBatch::new(channel, lines);
            uploads.spawn(async move {
                let started = Instant::now();
                let result = AssertUnwindSafe(sink.write_batch(&batch))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(Error::internal(format!(
                            "upload task for {} panicked",
                            batch.channel
                        )))
                    });
                metrics()
                    .upload_latency_ms
                    .observe(started.elapsed().as_millis() as u64);
                (batch, result)
            });
        }

        let mut report = FlushReport::default();
        while let Some(joined) = uploads.join_next().await {
            let (batch, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    error!(error = %e, "Upload task aborted, batch lost");
                    continue;
                }
            };

            match result {
                Ok(written) => {
                    metrics().uploads_succeeded.inc();
                    metrics().bytes_uploaded.inc_by(written.bytes as u64);
                    metrics().lines_uploaded.inc_by(written.lines as u64);
                    health().blob_store.set_healthy();
                    report.lines_written += written.lines;
                    report.written.push(written);
                }
                Err(e) => {
                    metrics().upload_errors.inc();
                    health().blob_store.set_unhealthy(e.to_string());
                    self.handle_failed(batch, e.to_string(), &mut report);
                }
            }
        }

        metrics()
            .flush_cycle_latency_ms
            .observe(started.elapsed().as_millis() as u64);
        report
    }

    fn handle_failed(&self, batch: FlushBatch, reason: String, report: &mut FlushReport) {
        let count = batch.len();
        let channel = batch.channel.clone();

        if self.requeue_failed {
            match self.buffer.requeue(&channel, batch.lines) {
                Ok(()) => {
                    metrics().lines_requeued.inc_by(count as u64);
                    report.lines_requeued += count;
                    warn!(channel = %channel, lines = count, error = %reason, "Upload failed, batch requeued");
                }
                Err(e) => {
                    metrics().lines_dropped.inc_by(count as u64);
                    report.lines_dropped += count;
                    error!(channel = %channel, lines = count, error = %e, "Upload failed and requeue failed, batch lost");
                }
            }
        } else {
            metrics().lines_dropped.inc_by(count as u64);
            report.lines_dropped += count;
            error!(channel = %channel, lines = count, error = %reason, "Upload failed, batch lost");
        }

        report.failed.push((channel, reason));
    }
}

/// Logs a cycle summary.
pub fn log_flush_report(report: &FlushReport) {
    if report.is_empty() {
        debug!("Flush cycle: nothing to upload");
        return;
    }

    if report.failed.is_empty() {
        info!(
            objects = report.written.len(),
            lines = report.lines_written,
            "Flush cycle complete"
        );
    } else {
        warn!(
            objects = report.written.len(),
            failed = report.failed.len(),
            lines = report.lines_written,
            dropped = report.lines_dropped,
            requeued = report.lines_requeued,
            "Flush cycle complete with failures"
        );
    }
}
