//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步层的指标收集功能。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{span, Level};

type RequestKey = (String, String, String);
type OperationKey = (String, String);

/// 指标收集器
///
/// 用于收集远程请求次数、耗时和缓存规模
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// 请求总数统计
    /// key: (store, op, result)
    pub requests_total: Arc<Mutex<HashMap<RequestKey, u64>>>,
    /// 操作耗时（累积时间和计数）
    /// key: (store, op) -> (total_duration_secs, count)
    pub operation_duration: Arc<Mutex<HashMap<OperationKey, (f64, u64)>>>,
    /// 每个所有者缓存的存档数量
    pub cached_save_data: Arc<Mutex<HashMap<u64, usize>>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Metrics {
    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `store` - 数据存储名称
    /// * `op` - 操作类型（reload/write/notify）
    /// * `result` - 操作结果（success/empty/error）
    pub fn record_request(&self, store: &str, op: &str, result: &str) {
        let span = span!(Level::DEBUG, "datastore_request", store, op, result);
        let _enter = span.enter();
        let key = (store.to_string(), op.to_string(), result.to_string());
        *lock(&self.requests_total).entry(key).or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, store: &str, op: &str, duration_secs: f64) {
        let key = (store.to_string(), op.to_string());
        let mut map = lock(&self.operation_duration);
        let entry = map.entry(key).or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 设置所有者缓存的存档数量
    pub fn set_cached_save_data(&self, owner_id: u64, count: usize) {
        lock(&self.cached_save_data).insert(owner_id, count);
    }

    /// 查询某个请求计数
    pub fn request_count(&self, store: &str, op: &str, result: &str) -> u64 {
        let key = (store.to_string(), op.to_string(), result.to_string());
        lock(&self.requests_total).get(&key).copied().unwrap_or(0)
    }
}

/// 获取指标字符串
///
/// 将所有指标格式化为文本，用于监控系统采集
pub fn get_metrics_string() -> String {
    let metrics = &GLOBAL_METRICS;
    let reqs = lock(&metrics.requests_total);
    let dur = lock(&metrics.operation_duration);
    let cached = lock(&metrics.cached_save_data);

    let mut output = String::new();
    for ((store, op, result), v) in reqs.iter() {
        output.push_str(&format!(
            "datastore_requests_total{{store=\"{}\", operation=\"{}\", result=\"{}\"}} {}\n",
            store, op, result, v
        ));
    }
    for ((store, op), (total, count)) in dur.iter() {
        output.push_str(&format!(
            "datastore_operation_duration_seconds_sum{{store=\"{}\", operation=\"{}\"}} {}\n",
            store, op, total
        ));
        output.push_str(&format!(
            "datastore_operation_duration_seconds_count{{store=\"{}\", operation=\"{}\"}} {}\n",
            store, op, count
        ));
    }
    for (owner, count) in cached.iter() {
        output.push_str(&format!(
            "datastore_cached_save_data{{owner=\"{}\"}} {}\n",
            owner, count
        ));
    }
    output
}
