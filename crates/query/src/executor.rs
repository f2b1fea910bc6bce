//! Submit, poll, and retry loop for asynchronous queries.
//!
//! A job moves `Submitted -> {Queued, Running} -> {Succeeded, Failed,
//! Cancelled}`. A failed or cancelled job is replaced by a fresh submission
//! while the retry budget lasts. Timeouts and submission rejections end the
//! execution immediately.

use crate::config::QueryConfig;
use crate::service::{QueryId, QueryService, QueryState, Row};
use chatlog_core::{Error, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{debug, info, warn};

/// Executor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub retry_budget: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
            retry_budget: 3,
        }
    }
}

impl From<&QueryConfig> for ExecutorConfig {
    fn from(config: &QueryConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            timeout: config.timeout(),
            retry_budget: config.retry_budget,
        }
    }
}

/// What a successful query hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// DDL and similar; completion is all that matters.
    Ack,
    /// A result set, header row first.
    Rows,
}

/// Client-side view of a job's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl From<QueryState> for JobState {
    fn from(state: QueryState) -> Self {
        match state {
            QueryState::Queued => Self::Queued,
            QueryState::Running => Self::Running,
            QueryState::Succeeded => Self::Succeeded,
            QueryState::Failed => Self::Failed,
            QueryState::Cancelled => Self::Cancelled,
        }
    }
}

/// One submission of a query.
#[derive(Debug, Clone)]
pub struct QueryJob {
    pub handle: QueryId,
    pub query: String,
    pub shape: ResultShape,
    pub remaining_retries: u32,
    pub state: JobState,
    pub submitted_at: Instant,
}

/// How waiting on a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed { reason: Option<String> },
    Cancelled { reason: Option<String> },
    TimedOut,
}

/// Output of a successful execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutput {
    Ack,
    /// All rows across pages, header row included.
    Rows(Vec<Row>),
}

impl QueryOutput {
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Ack => Vec::new(),
            Self::Rows(rows) => rows,
        }
    }
}

/// Runs queries to completion against a [`QueryService`].
#[derive(Clone)]
pub struct QueryExecutor {
    service: Arc<dyn QueryService>,
    config: ExecutorConfig,
}

impl QueryExecutor {
    pub fn new(service: Arc<dyn QueryService>, config: ExecutorConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<dyn QueryService> {
        &self.service
    }

    /// Hands a query to the service. Rejections are not retried.
    pub async fn submit(
        &self,
        query: &str,
        shape: ResultShape,
        remaining_retries: u32,
    ) -> Result<QueryJob> {
        let handle = self.service.start_query(query).await.map_err(|e| {
            metrics().query_submission_errors.inc();
            match e {
                Error::Submission(_) => e,
                other => Error::submission(other.to_string()),
            }
        })?;
        metrics().queries_submitted.inc();
        debug!(query_id = %handle, remaining_retries, "Query submitted");

        Ok(QueryJob {
            handle,
            query: query.to_string(),
            shape,
            remaining_retries,
            state: JobState::Submitted,
            submitted_at: Instant::now(),
        })
    }

    /// Polls `job` until it reaches a terminal state or the timeout elapses.
    ///
    /// Poll errors are logged and retried on the next tick.
    pub async fn await_completion(&self, job: &mut QueryJob) -> Outcome {
        match tokio::time::timeout(self.config.timeout, self.poll_until_terminal(job)).await {
            Ok(outcome) => outcome,
            Err(_) => Outcome::TimedOut,
        }
    }

    async fn poll_until_terminal(&self, job: &mut QueryJob) -> Outcome {
        loop {
            tokio::time::sleep(self.config.poll_interval).await;

            let status = match self.service.poll_query(&job.handle).await {
                Ok(status) => status,
                Err(e) => {
                    metrics().query_poll_errors.inc();
                    warn!(query_id = %job.handle, error = %e, "Query status check failed, will poll again");
                    continue;
                }
            };

            job.state = status.state.into();
            match status.state {
                QueryState::Queued | QueryState::Running => continue,
                QueryState::Succeeded => return Outcome::Succeeded,
                QueryState::Failed => {
                    return Outcome::Failed {
                        reason: status.reason,
                    }
                }
                QueryState::Cancelled => {
                    return Outcome::Cancelled {
                        reason: status.reason,
                    }
                }
            }
        }
    }

    /// Runs `query` until it succeeds, the retry budget is spent, or a
    /// submission times out.
    pub async fn execute(&self, query: &str, shape: ResultShape) -> Result<QueryOutput> {
        let started = Instant::now();
        metrics().queries_in_flight.inc();
        let result = self.execute_inner(query, shape).await;
        metrics().queries_in_flight.dec();
        metrics()
            .query_latency_ms
            .observe(started.elapsed().as_millis() as u64);
        result
    }

    async fn execute_inner(&self, query: &str, shape: ResultShape) -> Result<QueryOutput> {
        let mut remaining = self.config.retry_budget;
        let mut attempts = 0u32;

        loop {
            let mut job = self.submit(query, shape, remaining).await?;
            attempts += 1;

            let (last_state, reason) = match self.await_completion(&mut job).await {
                Outcome::Succeeded => {
                    metrics().queries_succeeded.inc();
                    info!(
                        query_id = %job.handle,
                        attempts,
                        elapsed_ms = job.submitted_at.elapsed().as_millis() as u64,
                        "Query succeeded"
                    );
                    return match shape {
                        ResultShape::Ack => Ok(QueryOutput::Ack),
                        ResultShape::Rows => self.fetch_all(&job.handle).await.map(QueryOutput::Rows),
                    };
                }
                Outcome::TimedOut => {
                    metrics().query_timeouts.inc();
                    warn!(query_id = %job.handle, waited = ?self.config.timeout, "Query timed out");
                    return Err(Error::TimedOut {
                        query_id: job.handle,
                        waited: self.config.timeout,
                    });
                }
                Outcome::Failed { reason } => (QueryState::Failed, reason),
                Outcome::Cancelled { reason } => (QueryState::Cancelled, reason),
            };

            if job.remaining_retries == 0 {
                metrics().queries_exhausted.inc();
                warn!(
                    query_id = %job.handle,
                    attempts,
                    state = %last_state,
                    reason = reason.as_deref().unwrap_or(""),
                    "Query retry budget exhausted"
                );
                return Err(Error::RetriesExhausted {
                    attempts,
                    last_state: last_state.to_string(),
                    reason,
                });
            }

            remaining = job.remaining_retries - 1;
            metrics().query_retries.inc();
            warn!(
                query_id = %job.handle,
                state = %last_state,
                reason = reason.as_deref().unwrap_or(""),
                remaining_retries = remaining,
                "Query did not succeed, resubmitting"
            );
        }
    }

    /// Reads every page of a succeeded query's result set.
    async fn fetch_all(&self, id: &str) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut next_token = None;

        loop {
            let page = self.service.fetch_results(id, next_token).await?;
            rows.extend(page.rows);
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(rows)
    }
}
