//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了批量消息条目，将更新条目按大小预算分组。

use super::entry::UpdateEntry;
use crate::error::Result;

/// 单批消息默认的序列化大小预算（字符数）
pub const DEFAULT_BATCH_BUDGET: usize = 500;

/// 批量消息条目
///
/// 将序列化后的更新条目按顺序装入若干批次。当前批次的序列化长度加上新条目长度
/// 超过预算时开启新批次。单个条目永远不会被拆分，超过预算的条目会开启新的一批。
#[derive(Debug, Clone)]
pub struct BulkMessageEntries {
    /// 批次列表，每批是已序列化的条目
    entries: Vec<Vec<String>>,
    /// 大小预算
    budget: usize,
}

impl BulkMessageEntries {
    /// 使用默认预算创建
    pub fn new() -> Self {
        Self::with_budget(DEFAULT_BATCH_BUDGET)
    }

    /// 使用指定预算创建
    pub fn with_budget(budget: usize) -> Self {
        Self {
            entries: Vec::new(),
            budget,
        }
    }

    /// 添加条目
    ///
    /// 当没有批次，或者"当前最后一批的完整序列化长度 + 新条目长度"超过预算时，
    /// 开启新批次；否则追加到最后一批。
    ///
    /// # 参数
    ///
    /// * `entry` - 更新条目
    ///
    /// # 返回值
    ///
    /// 仅在序列化失败时返回错误
    pub fn add_entry(&mut self, entry: &UpdateEntry) -> Result<()> {
        let entry_string = entry.to_json()?;
        let needs_new_batch = match self.entries.last() {
            None => true,
            // 每次重新序列化整批，保证与预算的计算方式逐字节一致
            Some(last) => serde_json::to_string(last)?.len() + entry_string.len() > self.budget,
        };
        if needs_new_batch {
            self.entries.push(Vec::new());
        }
        if let Some(last) = self.entries.last_mut() {
            last.push(entry_string);
        }
        Ok(())
    }

    /// 返回全部批次
    pub fn entries(&self) -> &[Vec<String>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Vec<String>> {
        self.entries
    }

    /// 批次数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn budget(&self) -> usize {
        self.budget
    }
}

impl Default for BulkMessageEntries {
    fn default() -> Self {
        Self::new()
    }
}
