//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了单个数据存储条目的同步器，负责重新加载、本地读写和远程刷新。

use super::{encode_value, MemorySaveData, SaveDataRead, SaveDataWrite, TransactionSaveData};
use crate::config::{DEFAULT_NOTIFY_TOPIC, DEFAULT_TOPIC_PREFIX};
use crate::error::{Result, SyncError};
use crate::manager::EvictionHandle;
use crate::metrics::GLOBAL_METRICS;
use crate::sync::{BulkMessageEntries, UpdateEntry, DEFAULT_BATCH_BUDGET};
use crate::transport::DataStoreTransport;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// 同步选项
///
/// 控制刷新时变更通知的分组和命名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// 单批消息的序列化大小预算
    pub batch_budget: usize,
    /// 单个值允许内联到 Set 条目的最大序列化大小
    pub record_budget: usize,
    /// 通知主题
    pub notify_topic: String,
    /// 通知字段前缀
    pub topic_prefix: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_budget: DEFAULT_BATCH_BUDGET,
            record_budget: DEFAULT_BATCH_BUDGET,
            notify_topic: DEFAULT_NOTIFY_TOPIC.to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
        }
    }
}

/// 存档数据同步器
///
/// 持有一个 (所有者, 数据存储名称, 条目键) 对应的内存数据。读取从不访问网络；
/// 每次写入都会立即刷新：先整体写入快照，再按批次发送变更通知。
///
/// 同一实例上的并发刷新不保证顺序，对同一个键的写入顺序需要调用方自行保证。
pub struct SaveData {
    /// 所有者（游戏）id
    owner_id: u64,
    /// 数据存储名称
    store_name: String,
    /// 条目键
    store_key: String,
    /// 远程传输
    transport: Arc<dyn DataStoreTransport>,
    /// 同步选项
    options: SyncOptions,
    /// 本地数据
    data: RwLock<MemorySaveData>,
    /// 注册表提供的驱逐句柄
    eviction: Mutex<Option<EvictionHandle>>,
}

impl SaveData {
    /// 创建新的存档数据同步器（内容为空，需要调用 reload 加载）
    pub fn new(
        owner_id: u64,
        store_name: impl Into<String>,
        store_key: impl Into<String>,
        transport: Arc<dyn DataStoreTransport>,
        options: SyncOptions,
    ) -> Self {
        Self {
            owner_id,
            store_name: store_name.into(),
            store_key: store_key.into(),
            transport,
            options,
            data: RwLock::new(MemorySaveData::new()),
            eviction: Mutex::new(None),
        }
    }

    pub fn owner_id(&self) -> u64 {
        self.owner_id
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn store_key(&self) -> &str {
        &self.store_key
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn read_data(&self) -> RwLockReadGuard<'_, MemorySaveData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_data(&self) -> RwLockWriteGuard<'_, MemorySaveData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 从远程重新加载数据
    ///
    /// 数据存储或条目不存在时清空本地数据并视为成功；
    /// 其他失败原样返回，本地数据保持不变。
    #[instrument(skip(self), level = "debug", fields(owner = self.owner_id, store = %self.store_name, key = %self.store_key))]
    pub async fn reload(&self) -> Result<()> {
        let start = Instant::now();
        let result = self.transport.read(&self.store_name, &self.store_key).await;
        GLOBAL_METRICS.record_duration(&self.store_name, "reload", start.elapsed().as_secs_f64());

        match result {
            Ok(values) => {
                let mut data = self.write_data();
                match values {
                    Some(values) => data.replace_all(values),
                    None => data.clear(),
                }
                GLOBAL_METRICS.record_request(&self.store_name, "reload", "success");
                debug!("SaveData reloaded: {} keys", data.len());
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                self.write_data().clear();
                GLOBAL_METRICS.record_request(&self.store_name, "reload", "empty");
                debug!("SaveData has no remote data yet: {}", e);
                Ok(())
            }
            Err(e) => {
                GLOBAL_METRICS.record_request(&self.store_name, "reload", "error");
                warn!("SaveData reload failed: {}", e);
                Err(e)
            }
        }
    }

    /// 获取值
    ///
    /// 只读取本地数据，键不存在时返回类型默认值
    pub fn get<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        self.read_data().get(key)
    }

    /// 获取原始值的副本
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.read_data().get_value(key).cloned()
    }

    /// 返回当前全部数据的副本
    pub fn snapshot(&self) -> Map<String, Value> {
        self.read_data().values().clone()
    }

    /// 设置值并立即刷新该键
    ///
    /// 刷新失败时错误返回给调用方，但本地值不会回滚。
    ///
    /// # 参数
    ///
    /// * `key` - 键
    /// * `value` - 值，序列化为 null 时删除该键
    pub async fn set<T: Serialize + Send>(&self, key: &str, value: T) -> Result<()> {
        let encoded = encode_value(key, &value)?;
        self.write_data().set_value(key, encoded);
        self.flush(&[key.to_string()]).await
    }

    /// 在事务中更新多个键，并用一次刷新提交
    ///
    /// 事务函数返回错误时丢弃全部缓冲写入，不发出任何远程请求，错误原样返回。
    /// 事务函数执行期间持有本地数据的写锁，函数内不能再访问本实例。
    ///
    /// # 参数
    ///
    /// * `update_function` - 在事务存档数据上执行读写的函数
    pub async fn update<F>(&self, update_function: F) -> Result<()>
    where
        F: FnOnce(&mut TransactionSaveData<'_>) -> Result<()> + Send,
    {
        let updated_keys = {
            let mut data = self.write_data();
            let mut transaction = TransactionSaveData::new(&mut *data);
            if let Err(e) = update_function(&mut transaction) {
                debug!(
                    "SaveData update aborted, {} staged keys discarded: {}",
                    transaction.pending(),
                    e
                );
                return Err(e);
            }
            transaction.apply()
        };
        self.flush(&updated_keys).await
    }

    /// 将当前数据刷新到远程
    ///
    /// 先整体写入全部数据，再为 `keys` 中的每个键发送变更通知。
    /// 序列化后过大的键合并为末尾的一个 Fetch 条目。`keys` 为空时不做任何事。
    #[instrument(skip(self, keys), level = "debug", fields(owner = self.owner_id, store = %self.store_name, key = %self.store_key, keys = keys.len()))]
    pub async fn flush(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let (snapshot, messages) = {
            let data = self.read_data();
            (data.values().clone(), self.build_messages(&data, keys)?)
        };

        // 保存新的数据
        let start = Instant::now();
        let result = self
            .transport
            .write_snapshot(&self.store_name, &self.store_key, &snapshot)
            .await;
        GLOBAL_METRICS.record_duration(&self.store_name, "write", start.elapsed().as_secs_f64());
        if let Err(e) = result {
            GLOBAL_METRICS.record_request(&self.store_name, "write", "error");
            warn!("SaveData snapshot write failed: {}", e);
            return Err(e);
        }
        GLOBAL_METRICS.record_request(&self.store_name, "write", "success");

        // 发送变更通知
        for message in &messages {
            if let Err(e) = self
                .transport
                .notify(&self.options.notify_topic, message)
                .await
            {
                GLOBAL_METRICS.record_request(&self.store_name, "notify", "error");
                warn!("SaveData change notification failed: {}", e);
                return Err(e);
            }
            GLOBAL_METRICS.record_request(&self.store_name, "notify", "success");
        }

        debug!(
            "SaveData flushed {} keys in {} messages",
            keys.len(),
            messages.len()
        );
        Ok(())
    }

    /// 构建变更通知消息
    fn build_messages(&self, data: &MemorySaveData, keys: &[String]) -> Result<Vec<String>> {
        let mut set_entries = Vec::with_capacity(keys.len());
        let mut fetch_keys = Vec::new();
        for key in keys {
            let value = data.get_value(key).cloned().unwrap_or(Value::Null);
            if serde_json::to_string(&value)?.len() <= self.options.record_budget {
                set_entries.push(UpdateEntry::set(key.clone(), value));
            } else {
                fetch_keys.push(key.clone());
            }
        }

        let mut entries = BulkMessageEntries::with_budget(self.options.batch_budget);
        for entry in &set_entries {
            entries.add_entry(entry)?;
        }
        if !fetch_keys.is_empty() {
            entries.add_entry(&UpdateEntry::fetch(fetch_keys))?;
        }

        let field = format!("{}{}", self.options.topic_prefix, self.store_key);
        entries
            .into_entries()
            .into_iter()
            .map(|batch| {
                let mut message = Map::new();
                message.insert(field.clone(), Value::from(batch));
                serde_json::to_string(&message).map_err(SyncError::from)
            })
            .collect()
    }

    /// 断开连接
    ///
    /// 从所属注册表的缓存中移除本实例，不发出网络请求
    pub fn disconnect(&self) {
        let handle = self
            .eviction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) => {
                handle.evict();
                info!(
                    "SaveData disconnected: owner={}, store={}, key={}",
                    self.owner_id, self.store_name, self.store_key
                );
            }
            None => debug!(
                "SaveData disconnect ignored, not registered: store={}, key={}",
                self.store_name, self.store_key
            ),
        }
    }

    pub(crate) fn attach_eviction(&self, handle: EvictionHandle) {
        *self.eviction.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// 是否仍持有驱逐句柄（尚未断开连接）
    pub(crate) fn is_attached(&self) -> bool {
        self.eviction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for SaveData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveData")
            .field("owner_id", &self.owner_id)
            .field("store_name", &self.store_name)
            .field("store_key", &self.store_key)
            .field("keys", &self.read_data().len())
            .finish()
    }
}
