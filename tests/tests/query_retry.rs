//! Query executor tests against the scripted query service: retry budget,
//! poll errors, timeouts and partition registration.

use chatlog_core::{Error, PartitionKey};
use integration_tests::{fixtures, mocks::MockQueryService, setup::TestContext};
use query_client::{
    ExecutorConfig, QueryExecutor, QueryOutput, QueryState, QueryStatus, ResultShape,
};
use std::sync::Arc;
use std::time::Duration;

fn failed(reason: &str) -> chatlog_core::Result<QueryStatus> {
    Ok(QueryStatus::new(QueryState::Failed).with_reason(reason))
}

fn running() -> chatlog_core::Result<QueryStatus> {
    Ok(QueryStatus::new(QueryState::Running))
}

fn succeeded() -> chatlog_core::Result<QueryStatus> {
    Ok(QueryStatus::new(QueryState::Succeeded))
}

#[tokio::test(start_paused = true)]
async fn test_retry_then_succeed() {
    let ctx = TestContext::new();
    ctx.query.push_run(vec![running(), failed("HIVE_METASTORE_ERROR")]);
    ctx.query
        .push_run(vec![Ok(QueryStatus::new(QueryState::Cancelled))]);
    ctx.query.push_run(vec![running(), running(), succeeded()]);

    let output = ctx
        .executor(3)
        .execute("SELECT 1", ResultShape::Ack)
        .await
        .expect("third submission succeeds");

    assert_eq!(output, QueryOutput::Ack);
    assert_eq!(ctx.query.submission_count(), 3);
    assert!(ctx.query.submitted().iter().all(|q| q == "SELECT 1"));
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_exhausted() {
    let ctx = TestContext::new();
    ctx.query.fail_matching("doomed");

    let err = ctx
        .executor(2)
        .execute("SELECT 'doomed'", ResultShape::Rows)
        .await
        .unwrap_err();

    // One initial submission plus two retries
    assert_eq!(ctx.query.submission_count(), 3);
    match err {
        Error::RetriesExhausted {
            attempts,
            last_state,
            reason,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_state, "failed");
            assert_eq!(reason.as_deref(), Some("mock failure"));
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_zero_budget_submits_once() {
    let ctx = TestContext::new();
    ctx.query.fail_matching("SELECT");

    let result = ctx.executor(0).execute("SELECT 2", ResultShape::Ack).await;

    assert!(matches!(result, Err(Error::RetriesExhausted { attempts: 1, .. })));
    assert_eq!(ctx.query.submission_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_errors_do_not_consume_budget() {
    let ctx = TestContext::new();
    ctx.query.push_run(vec![
        Err(Error::poll("throttled")),
        Err(Error::poll("throttled")),
        running(),
        succeeded(),
    ]);

    let output = ctx.executor(0).execute("SELECT 3", ResultShape::Ack).await;

    assert!(output.is_ok());
    assert_eq!(ctx.query.submission_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_not_retried() {
    let query = MockQueryService::new();
    // Never leaves RUNNING
    query.push_run(Vec::new());

    let executor = QueryExecutor::new(
        Arc::new(query.clone()),
        ExecutorConfig {
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(2),
            retry_budget: 5,
        },
    );

    let err = executor
        .execute("SELECT slow", ResultShape::Ack)
        .await
        .unwrap_err();

    match err {
        Error::TimedOut { query_id, waited } => {
            assert_eq!(query_id, "mock-1");
            assert_eq!(waited, Duration::from_secs(2));
        }
        other => panic!("expected TimedOut, got {:?}", other),
    }
    assert_eq!(query.submission_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_submission_rejection_is_not_retried() {
    let ctx = TestContext::new();
    ctx.query.set_reject(true);

    let err = ctx
        .executor(3)
        .execute("SELECT 4", ResultShape::Ack)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Submission(_)));
    assert_eq!(ctx.query.submission_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rows_include_header() {
    let ctx = TestContext::new();
    ctx.query
        .rows_for("FROM chatlogs.messages", fixtures::top_chatter_rows(&[("alice", 9)]));

    let rows = ctx
        .executor(0)
        .execute("SELECT count(*) FROM chatlogs.messages", ResultShape::Rows)
        .await
        .unwrap()
        .into_rows();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["message_count", "username"]);
    assert_eq!(rows[1], vec!["9", "alice"]);
}

#[tokio::test(start_paused = true)]
async fn test_partition_registration_covers_every_channel() {
    let ctx = TestContext::new();

    let count = ctx
        .partition_worker()
        .run_at(fixtures::fixed_time())
        .await
        .unwrap();
    assert_eq!(count, 2);

    let submitted = ctx.query.submitted();
    assert_eq!(submitted.len(), 1, "One statement for all channels");
    let statement = &submitted[0];
    assert!(statement.starts_with("ALTER TABLE chatlogs.messages ADD IF NOT EXISTS"));
    assert!(statement.contains("PARTITION (channel = 'haruiswaifu', date_string = '2024-03-07')"));
    assert!(statement.contains("PARTITION (channel = 'jinnytty', date_string = '2024-03-07')"));
}

#[tokio::test(start_paused = true)]
async fn test_partition_registration_is_idempotent() {
    let ctx = TestContext::new();
    let worker = ctx.partition_worker();

    worker.run_at(fixtures::fixed_time()).await.unwrap();
    worker.run_at(fixtures::fixed_time()).await.unwrap();

    // Two jobs, identical statements relying on IF NOT EXISTS
    let submitted = ctx.query.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0], submitted[1]);
}

#[tokio::test(start_paused = true)]
async fn test_partition_registration_deduplicates_keys() {
    let ctx = TestContext::new();
    let date = fixtures::fixed_time().date_naive();
    let keys = vec![
        PartitionKey::new("jinnytty", date),
        PartitionKey::new("jinnytty", date),
    ];

    let count = ctx.partition_worker().register(&keys).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(ctx.query.submitted()[0].matches("PARTITION (").count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_partition_registration_failure_surfaces() {
    let ctx = TestContext::new();
    ctx.query.fail_matching("ALTER TABLE");

    let result = ctx.partition_worker().run_at(fixtures::fixed_time()).await;

    assert!(matches!(result, Err(Error::RetriesExhausted { attempts: 4, .. })));
}
