//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 远程失败传播测试（使用 mockall 模拟传输）

#[path = "../common/mod.rs"]
mod common;

use async_trait::async_trait;
use common::setup_logging;
use mockall::{mock, Sequence};
use savesync::error::{ClassifiedError, ErrorResponse};
use savesync::{
    DataStoreTransport, FailureKind, Result, SaveData, SaveDataWrite, SyncError, SyncOptions,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

mock! {
    pub Transport {}

    #[async_trait]
    impl DataStoreTransport for Transport {
        async fn read(&self, store_name: &str, store_key: &str) -> Result<Option<Map<String, Value>>>;
        async fn write_snapshot(
            &self,
            store_name: &str,
            store_key: &str,
            snapshot: &Map<String, Value>,
        ) -> Result<()>;
        async fn notify(&self, topic: &str, message: &str) -> Result<()>;
    }
}

fn remote(kind: FailureKind, status: u16) -> SyncError {
    ClassifiedError::with_kind(kind, status).into()
}

fn save_data(mock: MockTransport) -> SaveData {
    SaveData::new(9, "PlayerStore", "Player_1", Arc::new(mock), SyncOptions::default())
}

#[tokio::test]
async fn test_reload_unauthorized_propagates() {
    setup_logging();

    let mut mock = MockTransport::new();
    mock.expect_read()
        .times(1)
        .returning(|_, _| Err(remote(FailureKind::Unauthorized, 401)));
    mock.expect_write_snapshot().never();
    mock.expect_notify().never();

    let err = save_data(mock).reload().await.unwrap_err();
    assert_eq!(err.kind(), Some(FailureKind::Unauthorized));
    assert_eq!(err.to_string(), "API key is invalid or expired.");
}

#[tokio::test]
async fn test_reload_missing_store_is_empty() {
    setup_logging();

    let mut mock = MockTransport::new();
    mock.expect_read()
        .times(1)
        .returning(|_, _| Err(remote(FailureKind::StoreNotFound, 404)));

    let save_data = save_data(mock);
    save_data.reload().await.unwrap();
    assert!(save_data.snapshot().is_empty());
}

#[tokio::test]
async fn test_write_failure_keeps_raw_response() {
    setup_logging();

    let mut mock = MockTransport::new();
    mock.expect_write_snapshot().times(1).returning(|_, _, _| {
        let body = ErrorResponse {
            error: "INTERNAL".to_string(),
            message: "try again later".to_string(),
            error_details: Vec::new(),
        };
        Err(ClassifiedError::from_response(503, Some(body)).into())
    });
    mock.expect_notify().never();

    let err = save_data(mock).set("coins", 1).await.unwrap_err();
    match err {
        SyncError::Remote(e) => {
            assert_eq!(e.kind, FailureKind::Generic);
            assert_eq!(e.status, 503);
            assert_eq!(e.body.unwrap().message, "try again later");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_snapshot_written_before_notify() {
    setup_logging();

    let mut seq = Sequence::new();
    let mut mock = MockTransport::new();
    mock.expect_write_snapshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|store_name, store_key, snapshot| {
            assert_eq!(store_name.to_string(), "PlayerStore");
            assert_eq!(store_key.to_string(), "Player_1");
            assert_eq!(json!(snapshot), json!({"coins": 1, "gems": 2}));
            Ok(())
        });
    mock.expect_notify()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|topic, message| {
            assert_eq!(topic.to_string(), "NexusBulkMessagingService");
            let message: Value = serde_json::from_str(&message.to_string()).unwrap();
            assert_eq!(
                message,
                json!({"NSD_Player_1": [
                    r#"{"Action":"Set","Key":"coins","Keys":null,"Value":1}"#,
                    r#"{"Action":"Set","Key":"gems","Keys":null,"Value":2}"#,
                ]})
            );
            Ok(())
        });

    save_data(mock)
        .update(|data| {
            data.set("coins", 1)?;
            data.set("gems", 2)?;
            Ok(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_aborted_update_makes_no_calls() {
    setup_logging();

    let mut mock = MockTransport::new();
    mock.expect_read().never();
    mock.expect_write_snapshot().never();
    mock.expect_notify().never();

    let err = save_data(mock)
        .update(|data| {
            data.set("coins", 1)?;
            Err(SyncError::aborted(std::io::Error::new(
                std::io::ErrorKind::Other,
                "validation failed",
            )))
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Transaction aborted: validation failed");
}

#[tokio::test]
async fn test_one_notify_per_batch() {
    setup_logging();

    let mut mock = MockTransport::new();
    mock.expect_write_snapshot().times(1).returning(|_, _, _| Ok(()));
    mock.expect_notify().times(3).returning(|_, _| Ok(()));

    let sizes = [10, 10, 200, 150, 150, 150, 10];
    save_data(mock)
        .update(|data| {
            for (i, size) in sizes.iter().enumerate() {
                data.set(&format!("testKey{}", i + 1), "0".repeat(*size))?;
            }
            Ok(())
        })
        .await
        .unwrap();
}
