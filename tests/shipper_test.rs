mod common;

use chrono::{DateTime, Utc};
use common::{wait_until, GatedSink, PanickingSink, RecordingSink};
use log_shipper::{
    fields, Context, Fields, FlushMode, Lifecycle, LogEntry, LogLevel, Logger, LoggerError,
    Offer, ShipperConfig,
};
use std::sync::Arc;
use tokio::time::Duration;

fn async_config() -> ShipperConfig {
    ShipperConfig {
        service_name: "demo-api".into(),
        batch_size: 50,
        flush_interval: Duration::from_secs(3),
        buffer_size: 500,
        retry_backoff: Duration::from_millis(10),
        ..Default::default()
    }
}

#[tokio::test]
async fn rapid_entries_are_sent_one_call_each_in_order() {
    let sink = RecordingSink::new();
    let logger = Logger::with_sink(async_config(), sink.clone()).unwrap();
    let ctx = Context::background();

    for i in 0..10 {
        logger.info(&ctx, format!("entry {i}"), fields! { "i" => i });
    }

    wait_until(|| sink.calls() == 10).await;
    logger.close().await.unwrap();

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 10);
    assert!(payloads.iter().all(|p| p.lines().count() == 1));
    let expected: Vec<String> = (0..10).map(|i| format!("entry {i}")).collect();
    assert_eq!(sink.messages(), expected);
}

#[tokio::test]
async fn close_flushes_pending_batch_exactly_once_and_is_idempotent() {
    let sink = RecordingSink::new();
    let config = ShipperConfig {
        flush_mode: FlushMode::Batched,
        flush_interval: Duration::from_secs(3600),
        ..async_config()
    };
    let logger = Logger::with_sink(config, sink.clone()).unwrap();
    let ctx = Context::background();

    logger.info(&ctx, "one", Fields::new());
    logger.warn(&ctx, "two", Fields::new());
    logger.error(&ctx, "three", Fields::new());

    logger.close().await.unwrap();
    assert_eq!(logger.state(), Lifecycle::Closed);
    assert_eq!(sink.calls(), 1);
    assert_eq!(sink.messages(), vec!["one", "two", "three"]);

    // closing again, from a derived logger too, changes nothing
    logger.close().await.unwrap();
    logger.with_service("other").close().await.unwrap();
    assert_eq!(sink.calls(), 1);

    let late = logger.entry(&ctx, LogLevel::Info, "late", Fields::new());
    assert_eq!(logger.offer(late), Offer::Dropped);
    assert!(matches!(logger.batch_log(Vec::new()), Err(LoggerError::Closed)));
    logger.flush().await.unwrap();
}

#[tokio::test]
async fn full_buffer_drops_and_later_entries_keep_order() {
    let sink = GatedSink::new();
    let config = ShipperConfig {
        buffer_size: 2,
        ..async_config()
    };
    let logger = Logger::with_sink(config, sink.clone()).unwrap();
    let ctx = Context::background();
    let offer = |msg: &str| logger.offer(logger.entry(&ctx, LogLevel::Info, msg, Fields::new()));

    assert_eq!(offer("e0"), Offer::Enqueued);
    // the worker picked e0 up and is stuck delivering it
    sink.started.notified().await;

    assert_eq!(offer("e1"), Offer::Enqueued);
    assert_eq!(offer("e2"), Offer::Enqueued);
    assert_eq!(offer("e3"), Offer::Dropped);
    assert_eq!(logger.pending(), 2);

    sink.open();
    wait_until(|| sink.inner.calls() == 3).await;

    assert_eq!(offer("e4"), Offer::Enqueued);
    wait_until(|| sink.inner.calls() == 4).await;
    logger.close().await.unwrap();

    assert_eq!(sink.inner.messages(), vec!["e0", "e1", "e2", "e4"]);
    let stats = logger.stats();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.enqueued, 4);
}

#[tokio::test(start_paused = true)]
async fn batched_mode_fills_batches_and_interval_flushes_the_rest() {
    let sink = RecordingSink::new();
    let config = ShipperConfig {
        flush_mode: FlushMode::Batched,
        batch_size: 3,
        flush_interval: Duration::from_millis(200),
        ..async_config()
    };
    let logger = Logger::with_sink(config, sink.clone()).unwrap();
    let ctx = Context::background();

    for msg in ["a", "b", "c", "d"] {
        logger.info(&ctx, msg, Fields::new());
    }

    wait_until(|| sink.calls() == 2).await;
    let payloads = sink.payloads();
    assert_eq!(payloads[0].lines().count(), 3);
    assert_eq!(payloads[1].lines().count(), 1);
    assert_eq!(sink.messages(), vec!["a", "b", "c", "d"]);

    logger.close().await.unwrap();
    assert_eq!(sink.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_drop_the_batch_silently() {
    let sink = RecordingSink::failing();
    let config = ShipperConfig {
        max_retries: 2,
        ..async_config()
    };
    let logger = Logger::with_sink(config, sink.clone()).unwrap();

    logger.error(&Context::background(), "lost", Fields::new());

    wait_until(|| logger.stats().failed_batches == 1).await;
    assert_eq!(sink.calls(), 3);
    assert_eq!(logger.stats().attempts, 3);

    // the shipper keeps going after a dropped batch
    logger.info(&Context::background(), "next", Fields::new());
    wait_until(|| logger.stats().failed_batches == 2).await;
    logger.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn timestamp_is_taken_when_the_entry_is_created() {
    let sink = RecordingSink::new();
    let config = ShipperConfig {
        flush_mode: FlushMode::Batched,
        flush_interval: Duration::from_secs(3),
        ..async_config()
    };
    let logger = Logger::with_sink(config, sink.clone()).unwrap();

    let entry = logger.entry(&Context::background(), LogLevel::Info, "stamped", Fields::new());
    let created = entry.timestamp;
    std::thread::sleep(std::time::Duration::from_millis(20));
    let offered_at = Utc::now();
    assert_eq!(logger.offer(entry), Offer::Enqueued);

    // only the interval trigger ships the partial batch
    tokio::time::sleep(Duration::from_secs(3)).await;
    wait_until(|| sink.calls() == 1).await;

    let line: serde_json::Value = serde_json::from_str(sink.payloads()[0].trim_end()).unwrap();
    let sent: DateTime<Utc> = DateTime::parse_from_rfc3339(line["_time"].as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc);
    assert_eq!(sent, created);
    assert!(sent < offered_at);

    logger.close().await.unwrap();
}

#[tokio::test]
async fn flush_waits_for_the_backlog_to_drain() {
    let sink = RecordingSink::new();
    let logger = Logger::with_sink(async_config(), sink.clone()).unwrap();
    let ctx = Context::background().with_user_id("u-7");

    for i in 0..20 {
        logger.debug(&ctx, format!("m{i}"), Fields::new());
    }
    logger.flush().await.unwrap();
    assert_eq!(logger.pending(), 0);

    logger.close().await.unwrap();
    assert_eq!(sink.messages().len(), 20);
}

#[tokio::test]
async fn batch_log_reports_a_full_buffer() {
    let sink = GatedSink::new();
    let config = ShipperConfig {
        buffer_size: 2,
        ..async_config()
    };
    let logger = Logger::with_sink(config, sink.clone()).unwrap();

    logger.info(&Context::background(), "blocker", Fields::new());
    sink.started.notified().await;

    let entries: Vec<LogEntry> = (0..3)
        .map(|i| LogEntry::new(LogLevel::Info, format!("b{i}"), "batch"))
        .collect();
    assert!(matches!(logger.batch_log(entries), Err(LoggerError::BufferFull)));

    sink.open();
    logger.close().await.unwrap();
    assert_eq!(sink.inner.messages(), vec!["blocker", "b0", "b1"]);
}

#[tokio::test]
async fn entries_below_min_level_are_discarded() {
    let sink = RecordingSink::new();
    let config = ShipperConfig {
        min_level: LogLevel::Warn,
        ..async_config()
    };
    let logger = Logger::with_sink(config, sink.clone()).unwrap();
    let ctx = Context::background();

    logger.debug(&ctx, "debug", Fields::new());
    logger.info(&ctx, "info", Fields::new());
    logger.warn(&ctx, "warn", Fields::new());
    logger.fatal(&ctx, "fatal", Fields::new());
    logger.close().await.unwrap();

    assert_eq!(sink.messages(), vec!["warn", "fatal"]);
    assert_eq!(logger.stats().offered, 2);
}

#[test]
fn sync_mode_delivers_before_returning() {
    let sink = RecordingSink::new();
    let config = ShipperConfig {
        async_mode: false,
        ..async_config()
    };
    let logger = Logger::with_sink(config, sink.clone()).unwrap();
    let ctx = Context::background().with_trace_id("trace_abc123");

    logger.info(&ctx, "Create new User", fields! { "username" => "johndoe" });

    assert_eq!(sink.calls(), 1);
    let line: serde_json::Value = serde_json::from_str(sink.payloads()[0].trim_end()).unwrap();
    assert_eq!(line["trace_id"], "trace_abc123");
    assert_eq!(line["fields"]["username"], "johndoe");
    assert_eq!(logger.pending(), 0);
}

#[tokio::test]
async fn sync_mode_reports_delivery_failure_from_batch_log() {
    let sink = RecordingSink::failing();
    let config = ShipperConfig {
        async_mode: false,
        max_retries: 1,
        retry_backoff: Duration::from_millis(1),
        ..async_config()
    };
    let logger = Logger::with_sink(config, sink.clone()).unwrap();

    let entry = logger.entry(&Context::background(), LogLevel::Error, "boom", Fields::new());
    let err = logger.batch_log(vec![entry.clone()]).unwrap_err();
    assert!(matches!(err, LoggerError::Delivery { attempts: 2, .. }));
    assert_eq!(sink.calls(), 2);

    // the per-level path swallows the same failure
    assert_eq!(logger.offer(entry), Offer::Dropped);
    assert_eq!(sink.calls(), 4);

    logger.close().await.unwrap();
    logger.close().await.unwrap();
    assert_eq!(logger.state(), Lifecycle::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_share_one_worker() {
    let sink = RecordingSink::new();
    let logger = Arc::new(Logger::with_sink(async_config(), sink.clone()).unwrap());

    let mut handles = Vec::new();
    for producer in 0..4 {
        let child = logger.with_fields(fields! { "producer" => producer });
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                child.info(&Context::background(), format!("p{producer}-{i}"), Fields::new());
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    logger.close().await.unwrap();
    let messages = sink.messages();
    assert_eq!(messages.len(), 100);

    // per-producer order survives the shared queue
    for producer in 0..4 {
        let prefix = format!("p{producer}-");
        let seen: Vec<&String> = messages.iter().filter(|m| m.starts_with(&prefix)).collect();
        let expected: Vec<String> = (0..25).map(|i| format!("{prefix}{i}")).collect();
        assert_eq!(seen, expected.iter().collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn a_panicked_worker_closes_the_shipper() {
    let logger = Logger::with_sink(async_config(), Arc::new(PanickingSink)).unwrap();
    assert_eq!(logger.state(), Lifecycle::Running);

    logger.error(&Context::background(), "boom", Fields::new());
    wait_until(|| logger.state() == Lifecycle::Closed).await;

    assert_eq!(logger.offer(logger.entry(&Context::background(), LogLevel::Info, "late", Fields::new())), Offer::Dropped);
    assert!(matches!(logger.batch_log(Vec::new()), Err(LoggerError::Closed)));
    // already closed: nothing left to stop
    logger.close().await.unwrap();
    logger.flush().await.unwrap();
}

#[tokio::test]
async fn unbounded_retry_count_is_rejected_at_construction() {
    let config = ShipperConfig {
        max_retries: u32::MAX,
        ..async_config()
    };
    let err = Logger::with_sink(config, RecordingSink::new()).unwrap_err();
    assert!(matches!(err, LoggerError::InvalidConfig(_)));
}
