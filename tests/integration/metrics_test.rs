//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 指标收集集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{setup_logging, RecordingTransport};
use savesync::metrics::{get_metrics_string, GLOBAL_METRICS};
use savesync::{FailureKind, SaveData, SyncOptions};
use serial_test::serial;
use std::sync::Arc;

fn save_data(store: &str, transport: &Arc<RecordingTransport>) -> SaveData {
    SaveData::new(5, store, "Entry", transport.clone(), SyncOptions::default())
}

#[tokio::test]
#[serial]
async fn test_reload_and_flush_are_counted() {
    setup_logging();

    let store = "MetricsStoreA";
    let transport = Arc::new(RecordingTransport::new());
    let save_data = save_data(store, &transport);

    save_data.reload().await.unwrap();
    save_data.set("coins", 1).await.unwrap();
    save_data.set("gems", 2).await.unwrap();

    assert_eq!(GLOBAL_METRICS.request_count(store, "reload", "success"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(store, "write", "success"), 2);
    assert_eq!(GLOBAL_METRICS.request_count(store, "notify", "success"), 2);

    let output = get_metrics_string();
    assert!(output.contains(
        "datastore_requests_total{store=\"MetricsStoreA\", operation=\"write\", result=\"success\"} 2"
    ));
    assert!(output.contains(
        "datastore_operation_duration_seconds_count{store=\"MetricsStoreA\", operation=\"reload\"} 1"
    ));
}

#[tokio::test]
#[serial]
async fn test_failures_are_counted() {
    setup_logging();

    let store = "MetricsStoreB";
    let transport = Arc::new(RecordingTransport::new());
    let save_data = save_data(store, &transport);

    transport.fail_reads(Some(FailureKind::EntryNotFound));
    save_data.reload().await.unwrap();
    transport.fail_reads(Some(FailureKind::Unauthorized));
    assert!(save_data.reload().await.is_err());
    transport.fail_writes(Some(FailureKind::Generic));
    assert!(save_data.set("coins", 1).await.is_err());

    assert_eq!(GLOBAL_METRICS.request_count(store, "reload", "empty"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(store, "reload", "error"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(store, "write", "error"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(store, "notify", "success"), 0);
}

#[tokio::test]
#[serial]
async fn test_store_names_with_colons_are_reported() {
    setup_logging();

    let store = "Guild:Store";
    let transport = Arc::new(RecordingTransport::new());
    let save_data = save_data(store, &transport);

    save_data.reload().await.unwrap();
    save_data.set("coins", 1).await.unwrap();

    assert_eq!(GLOBAL_METRICS.request_count(store, "reload", "success"), 1);
    let output = get_metrics_string();
    assert!(output.contains(
        "datastore_requests_total{store=\"Guild:Store\", operation=\"notify\", result=\"success\"} 1"
    ));
    assert!(output.contains(
        "datastore_operation_duration_seconds_sum{store=\"Guild:Store\", operation=\"write\"}"
    ));
}
