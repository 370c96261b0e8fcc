//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了测试的通用工具函数和设置。

#![allow(dead_code)]

use async_trait::async_trait;
use savesync::error::{ClassifiedError, FailureKind};
use savesync::{DataStoreTransport, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(EnvFilter::new("debug"))
            .try_init()
            .ok();
    });
}

/// 返回分类对应的典型状态码
pub fn status_for(kind: FailureKind) -> u16 {
    match kind {
        FailureKind::Unauthorized => 401,
        FailureKind::InsufficientScope => 403,
        FailureKind::StoreNotFound | FailureKind::EntryNotFound => 404,
        FailureKind::Generic => 500,
    }
}

fn failure(kind: FailureKind) -> savesync::SyncError {
    ClassifiedError::with_kind(kind, status_for(kind)).into()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// 记录所有调用的内存传输
///
/// 读取返回预设的数据或失败；写入和通知按调用顺序记录下来
#[derive(Default)]
pub struct RecordingTransport {
    reads: AtomicUsize,
    writes: AtomicUsize,
    notifies: AtomicUsize,
    read_data: Mutex<Option<Map<String, Value>>>,
    read_failure: Mutex<Option<FailureKind>>,
    write_failure: Mutex<Option<FailureKind>>,
    notify_failure: Mutex<Option<FailureKind>>,
    read_delay: Option<Duration>,
    snapshots: Mutex<Vec<(String, String, Map<String, Value>)>>,
    messages: Mutex<Vec<(String, String)>>,
    credentials: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 远程已有数据
    pub fn with_data(self, data: Value) -> Self {
        if let Value::Object(map) = data {
            *lock(&self.read_data) = Some(map);
        }
        self
    }

    /// 读取时先等待一段时间，用于制造并发
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn fail_reads(&self, kind: Option<FailureKind>) {
        *lock(&self.read_failure) = kind;
    }

    pub fn fail_writes(&self, kind: Option<FailureKind>) {
        *lock(&self.write_failure) = kind;
    }

    pub fn fail_notifies(&self, kind: Option<FailureKind>) {
        *lock(&self.notify_failure) = kind;
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn notify_count(&self) -> usize {
        self.notifies.load(Ordering::SeqCst)
    }

    pub fn remote_calls(&self) -> usize {
        self.read_count() + self.write_count() + self.notify_count()
    }

    /// 写入过的快照（数据存储名称, 条目键, 数据）
    pub fn snapshots(&self) -> Vec<(String, String, Map<String, Value>)> {
        lock(&self.snapshots).clone()
    }

    /// 发送过的通知（主题, 消息）
    pub fn messages(&self) -> Vec<(String, String)> {
        lock(&self.messages).clone()
    }

    /// 通过 set_credential 收到的凭据
    pub fn credentials(&self) -> Vec<String> {
        lock(&self.credentials).clone()
    }
}

#[async_trait]
impl DataStoreTransport for RecordingTransport {
    async fn read(&self, _store_name: &str, _store_key: &str) -> Result<Option<Map<String, Value>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        let read_failure = *lock(&self.read_failure);
        match read_failure {
            Some(kind) => Err(failure(kind)),
            None => Ok(lock(&self.read_data).clone()),
        }
    }

    async fn write_snapshot(
        &self,
        store_name: &str,
        store_key: &str,
        snapshot: &Map<String, Value>,
    ) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = *lock(&self.write_failure) {
            return Err(failure(kind));
        }
        lock(&self.snapshots).push((
            store_name.to_string(),
            store_key.to_string(),
            snapshot.clone(),
        ));
        Ok(())
    }

    async fn notify(&self, topic: &str, message: &str) -> Result<()> {
        self.notifies.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = *lock(&self.notify_failure) {
            return Err(failure(kind));
        }
        lock(&self.messages).push((topic.to_string(), message.to_string()));
        Ok(())
    }

    fn set_credential(&self, credential: SecretString) {
        lock(&self.credentials).push(credential.expose_secret().to_string());
    }
}

/// 解析一条通知消息
///
/// 返回字段名和其中每个条目解析后的 JSON
pub fn decode_message(message: &str) -> (String, Vec<Value>) {
    let outer: Map<String, Value> = serde_json::from_str(message).expect("message is a JSON object");
    assert_eq!(outer.len(), 1, "message has exactly one field");
    let (field, entries) = outer.into_iter().next().expect("one field");
    let entries = entries
        .as_array()
        .expect("entries are an array")
        .iter()
        .map(|e| serde_json::from_str(e.as_str().expect("entry is a string")).expect("entry is JSON"))
        .collect();
    (field, entries)
}
