//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了存档数据的读写接口和实现。

pub mod memory;
pub mod save_data;
pub mod transaction;

use crate::error::{Result, SyncError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub use memory::MemorySaveData;
pub use save_data::{SaveData, SyncOptions};
pub use transaction::TransactionSaveData;

/// 存档数据读取特征
///
/// 提供类型安全的读取接口，键不存在时返回类型默认值
pub trait SaveDataRead {
    /// 获取原始值
    fn get_value(&self, key: &str) -> Option<&Value>;

    /// 获取值（反序列化）
    ///
    /// # 参数
    ///
    /// * `key` - 键
    ///
    /// # 返回值
    ///
    /// 键不存在时返回 `T::default()`，结构无法转换时返回序列化错误
    fn get<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.get_value(key) {
            Some(value) => decode_value(key, value),
            None => Ok(T::default()),
        }
    }
}

/// 存档数据写入特征
pub trait SaveDataWrite {
    /// 设置原始值，`Value::Null` 表示删除
    fn set_value(&mut self, key: &str, value: Value);

    /// 设置值（序列化）
    ///
    /// 值序列化为 null（例如 `None`）时删除该键
    fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let value = encode_value(key, &value)?;
        self.set_value(key, value);
        Ok(())
    }
}

/// 将存储的值转换为调用方请求的结构
pub(crate) fn decode_value<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T> {
    T::deserialize(value)
        .map_err(|e| SyncError::Serialization(format!("key '{}' has incompatible shape: {}", key, e)))
}

pub(crate) fn encode_value<T: Serialize>(key: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| SyncError::Serialization(format!("key '{}' cannot be encoded: {}", key, e)))
}
