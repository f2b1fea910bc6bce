//! Flush pipeline tests: buffer drain, per-channel upload isolation,
//! requeue of failed batches and the stored key layout.

use integration_tests::{fixtures, setup::TestContext};

fn fill(ctx: &TestContext, channel: &str, n: usize) {
    for i in 0..n {
        ctx.buffer
            .append(channel, fixtures::log_line(channel, &format!("line {}", i)))
            .expect("append to registered channel");
    }
}

#[tokio::test]
async fn test_one_object_per_channel() {
    let ctx = TestContext::new();
    fill(&ctx, "jinnytty", 3);
    fill(&ctx, "haruiswaifu", 2);

    let report = ctx.flush_worker(false).run_cycle().await;
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.lines_written, 5);

    let objects = ctx.objects().await;
    assert_eq!(objects.len(), 2);

    let harui = objects
        .iter()
        .find(|(k, _)| k.starts_with("channel=haruiswaifu/"))
        .expect("haruiswaifu object");
    assert_eq!(harui.1.lines().count(), 2);

    let jinny = objects
        .iter()
        .find(|(k, _)| k.starts_with("channel=jinnytty/"))
        .expect("jinnytty object");
    let messages: Vec<String> = jinny
        .1
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["message"].to_string())
        .collect();
    assert_eq!(messages, vec!["\"line 0\"", "\"line 1\"", "\"line 2\""]);
}

#[tokio::test]
async fn test_empty_channels_are_skipped() {
    let ctx = TestContext::new();
    fill(&ctx, "jinnytty", 1);

    let report = ctx.flush_worker(false).run_cycle().await;
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.written[0].channel, "jinnytty");

    let report = ctx.flush_worker(false).run_cycle().await;
    assert!(report.is_empty(), "Second cycle has nothing to upload");
    assert_eq!(ctx.objects().await.len(), 1);
}

#[tokio::test]
async fn test_failed_channel_does_not_block_others() {
    let ctx = TestContext::new();
    ctx.sink.fail_channel("jinnytty");
    fill(&ctx, "jinnytty", 4);
    fill(&ctx, "haruiswaifu", 2);

    let report = ctx.flush_worker(false).run_cycle().await;

    assert_eq!(report.written.len(), 1);
    assert_eq!(report.written[0].channel, "haruiswaifu");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "jinnytty");
    assert_eq!(report.lines_dropped, 4);
    assert_eq!(report.lines_requeued, 0);

    // Best effort: the failed batch is gone
    assert_eq!(ctx.buffer.pending_total(), 0);
    assert_eq!(ctx.objects().await.len(), 1);
}

#[tokio::test]
async fn test_requeued_batch_is_uploaded_next_cycle_in_order() {
    let ctx = TestContext::new();
    let worker = ctx.flush_worker(true);

    ctx.sink.fail_channel("jinnytty");
    fill(&ctx, "jinnytty", 2);

    let report = worker.run_cycle().await;
    assert_eq!(report.lines_requeued, 2);
    assert_eq!(ctx.buffer.pending()["jinnytty"], 2);

    // Lines arriving after the failure queue behind the requeued batch
    ctx.buffer
        .append("jinnytty", fixtures::log_line("jinnytty", "late"))
        .unwrap();

    ctx.sink.heal();
    let report = worker.run_cycle().await;
    assert!(report.failed.is_empty());
    assert_eq!(report.lines_written, 3);

    let objects = ctx.objects().await;
    assert_eq!(objects.len(), 1);
    let messages: Vec<String> = objects[0]
        .1
        .lines()
        .map(|l| {
            serde_json::from_str::<serde_json::Value>(l).unwrap()["message"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(messages, vec!["line 0", "line 1", "late"]);
}

#[tokio::test]
async fn test_key_layout_matches_partition_prefix() {
    let ctx = TestContext::new();
    fill(&ctx, "haruiswaifu", 1);

    let report = ctx.flush_worker(false).run_cycle().await;
    let written = &report.written[0];

    let today = chrono::Utc::now().date_naive();
    let expected_prefix = format!(
        "channel=haruiswaifu/date_string={}/",
        today.format("%Y-%m-%d")
    );
    // A cycle spanning midnight may stamp the next day
    let tomorrow = today.succ_opt().unwrap();
    let alt_prefix = format!(
        "channel=haruiswaifu/date_string={}/",
        tomorrow.format("%Y-%m-%d")
    );
    assert!(
        written.key.starts_with(&expected_prefix) || written.key.starts_with(&alt_prefix),
        "unexpected key {}",
        written.key
    );
    assert!(written.key.ends_with(".log"));
    assert_eq!(written.lines, 1);
    assert!(written.bytes > 0);
}

#[tokio::test]
async fn test_concurrent_ingest_during_flush_is_not_lost() {
    let ctx = TestContext::new();
    fill(&ctx, "jinnytty", 50);

    let worker = ctx.flush_worker(false);
    let buffer = ctx.buffer.clone();

    let writer = tokio::spawn(async move {
        for i in 0..50 {
            buffer
                .append("jinnytty", fixtures::log_line("jinnytty", &format!("more {}", i)))
                .unwrap();
            tokio::task::yield_now().await;
        }
    });

    let first = worker.run_cycle().await;
    writer.await.unwrap();
    let second = worker.run_cycle().await;

    assert_eq!(first.lines_written + second.lines_written, 100);
    assert_eq!(ctx.buffer.pending_total(), 0);
}
