//! End-to-end tests for the ingest pipeline.
//!
//! POST /events → ChannelBuffer → FlushWorker → in-memory blob store
//!
//! Uploads go through the real `BlobLogWriter`, so the stored keys and
//! bodies are exactly what the production writer produces.

use axum::http::StatusCode;
use axum_test::TestServer;
use chatlog_core::ValidationErrorCode;
use integration_tests::{fixtures, setup::TestContext};

/// Full pipeline test: POST /events (array format) → flush → stored blob
#[tokio::test]
async fn test_ingest_array_format_e2e() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let payload = fixtures::array_payload(fixtures::chat_events("jinnytty", 5));

    let response = server
        .post("/events")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["received"], 5);
    assert!(body.get("errors").is_none());

    assert_eq!(ctx.buffer.pending()["jinnytty"], 5);

    let report = ctx.flush_worker(false).run_cycle().await;
    assert_eq!(report.lines_written, 5);
    assert!(report.failed.is_empty());

    let objects = ctx.objects().await;
    assert_eq!(objects.len(), 1, "Expected one blob for one channel");

    let (key, body) = &objects[0];
    assert!(key.starts_with("channel=jinnytty/date_string="));
    assert!(key.ends_with(".log"));
    assert_eq!(body.lines().count(), 5);
    assert!(body.ends_with('\n'));

    for line in body.lines() {
        let record: serde_json::Value = serde_json::from_str(line).expect("line is JSON");
        assert_eq!(record["channel"], "jinnytty");
        assert!(record["time"].as_str().is_some_and(|t| t.ends_with('Z')));
    }

    assert_eq!(ctx.buffer.pending_total(), 0, "Buffer should be drained");
}

/// POST /events (object format) with mixed channel spellings
#[tokio::test]
async fn test_ingest_object_format_normalizes_channels() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let events = vec![
        fixtures::chat_event("#JinnyTTY", "alice", "hi"),
        fixtures::chat_event("  HarUisWaifu ", "bob", "hello"),
        fixtures::chat_event("jinnytty", "carol", "hey"),
    ];
    let payload = fixtures::object_payload(events);

    let response = server
        .post("/events")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["received"], 3);

    let pending = ctx.buffer.pending();
    assert_eq!(pending["jinnytty"], 2);
    assert_eq!(pending["haruiswaifu"], 1);
}

/// POST /events (single event)
#[tokio::test]
async fn test_ingest_single_event_e2e() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let event = fixtures::chat_event("haruiswaifu", "dave", "line one\nline two");
    let payload = fixtures::single_payload(event);

    let response = server
        .post("/events")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["received"], 1);

    ctx.flush_worker(false).run_cycle().await;

    let objects = ctx.objects().await;
    assert_eq!(objects.len(), 1);

    // Embedded newlines stay escaped, one record per line
    let (_, body) = &objects[0];
    assert_eq!(body.lines().count(), 1);
    let record: serde_json::Value = serde_json::from_str(body.trim_end()).unwrap();
    assert_eq!(record["message"], "line one\nline two");
    assert_eq!(record["username"], "dave");
}

/// Events for unregistered channels are reported, the rest are buffered
#[tokio::test]
async fn test_ingest_unregistered_channel_partial() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let events = vec![
        fixtures::chat_event("jinnytty", "alice", "kept"),
        fixtures::chat_event("somebodyelse", "bob", "dropped"),
    ];

    let response = server
        .post("/events")
        .content_type("application/json")
        .bytes(fixtures::array_payload(events).into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["received"], 1);

    let errors = body["errors"].as_array().expect("errors should be listed");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("somebodyelse"));

    assert_eq!(ctx.buffer.pending_total(), 1);
    assert!(!ctx.buffer.is_registered("somebodyelse"));
}

/// Invalid events are rejected individually
#[tokio::test]
async fn test_ingest_invalid_events_partial() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let events = vec![
        fixtures::chat_event("jinnytty", "", "no author"),
        fixtures::chat_event("jinny tty", "alice", "bad channel"),
        fixtures::chat_event("jinnytty", "alice", "fine"),
    ];

    let response = server
        .post("/events")
        .content_type("application/json")
        .bytes(fixtures::array_payload(events).into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["received"], 1);
    assert_eq!(body["errors"].as_array().map(|e| e.len()), Some(2));
}

/// Batches above the event limit are rejected outright
#[tokio::test]
async fn test_ingest_oversized_batch_rejected() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let payload = fixtures::array_payload(fixtures::oversized_batch());

    let response = server
        .post("/events")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], ValidationErrorCode::BatchTooLarge.code());

    assert_eq!(ctx.buffer.pending_total(), 0, "Nothing should be buffered");
}

/// Malformed JSON is a 400
#[tokio::test]
async fn test_ingest_malformed_json_rejected() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/events")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], ValidationErrorCode::InvalidFormat.code());
}

/// GET /channels reports pending counts per registered channel
#[tokio::test]
async fn test_channels_endpoint() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .post("/events")
        .content_type("application/json")
        .bytes(fixtures::array_payload(fixtures::chat_events("haruiswaifu", 4)).into())
        .await
        .assert_status_ok();

    let response = server.get("/channels").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["channels"]["haruiswaifu"], 4);
    assert_eq!(body["channels"]["jinnytty"], 0);
    assert_eq!(body["total_pending"], 4);
}
