//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了事务存档数据，在基础数据之上缓冲写入并一次性应用。

use super::{MemorySaveData, SaveDataRead, SaveDataWrite};
use serde_json::Value;

/// 事务存档数据
///
/// 读取时先查覆盖层再回退到基础数据；写入只进入覆盖层，
/// 直到调用 [`apply`](Self::apply) 才写入基础数据。
pub struct TransactionSaveData<'a, B = MemorySaveData> {
    /// 基础存档数据
    base: &'a mut B,
    /// 覆盖值，按首次写入的顺序排列，null 表示删除
    overrides: Vec<(String, Value)>,
}

impl<'a, B> TransactionSaveData<'a, B>
where
    B: SaveDataRead + SaveDataWrite,
{
    /// 在基础存档数据上创建事务
    pub fn new(base: &'a mut B) -> Self {
        Self {
            base,
            overrides: Vec::new(),
        }
    }

    /// 已缓冲的键数量
    pub fn pending(&self) -> usize {
        self.overrides.len()
    }

    /// 将覆盖值应用到基础数据
    ///
    /// 每个缓冲过的键都会被写入并返回，即使值与基础数据相同，
    /// 或者删除的是基础数据中本就不存在的键。应用后覆盖层为空，
    /// 再次调用返回空列表。
    ///
    /// # 返回值
    ///
    /// 按首次写入顺序返回被写入的键
    pub fn apply(&mut self) -> Vec<String> {
        let mut updated_keys = Vec::with_capacity(self.overrides.len());
        for (key, value) in self.overrides.drain(..) {
            self.base.set_value(&key, value);
            updated_keys.push(key);
        }
        updated_keys
    }
}

impl<B: SaveDataRead> SaveDataRead for TransactionSaveData<'_, B> {
    fn get_value(&self, key: &str) -> Option<&Value> {
        match self.overrides.iter().find(|(k, _)| k == key) {
            Some((_, value)) if value.is_null() => None,
            Some((_, value)) => Some(value),
            None => self.base.get_value(key),
        }
    }
}

impl<B> SaveDataWrite for TransactionSaveData<'_, B> {
    fn set_value(&mut self, key: &str, value: Value) {
        // 重复写入保留首次出现的位置，值以最后一次为准
        match self.overrides.iter_mut().find(|(k, _)| k == key) {
            Some((_, staged)) => *staged = value,
            None => self.overrides.push((key.to_string(), value)),
        }
    }
}
