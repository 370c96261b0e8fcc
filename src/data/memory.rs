//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了内存存档数据，是单个实体数据的本地真实来源。

use super::{SaveDataRead, SaveDataWrite};
use serde_json::{Map, Value};
use tracing::debug;

/// 内存存档数据
///
/// 普通的同步键值表，不涉及网络和并发
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySaveData {
    values: Map<String, Value>,
}

impl MemorySaveData {
    /// 创建空的内存存档数据
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回全部键值（用于整体写入远程）
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// 用新的键值整体替换当前内容
    ///
    /// 值为 null 的键会被跳过
    pub fn replace_all(&mut self, values: Map<String, Value>) {
        self.values.clear();
        for (key, value) in values {
            self.set_value(&key, value);
        }
    }

    /// 清空存档数据
    pub fn clear(&mut self) {
        debug!("MemorySaveData clear: removed {} keys", self.values.len());
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl SaveDataRead for MemorySaveData {
    fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

impl SaveDataWrite for MemorySaveData {
    fn set_value(&mut self, key: &str, value: Value) {
        if value.is_null() {
            self.values.remove(key);
        } else {
            self.values.insert(key.to_string(), value);
        }
    }
}

impl From<Map<String, Value>> for MemorySaveData {
    fn from(values: Map<String, Value>) -> Self {
        let mut data = Self::new();
        data.replace_all(values);
        data
    }
}
