//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了变更通知中使用的更新条目。

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 更新条目
///
/// 只用于对外通知，不参与本地状态。线上格式总是带齐四个字段，未使用的字段为 null：
/// `{"Action":"Set","Key":k,"Keys":null,"Value":v}` 或
/// `{"Action":"Fetch","Key":null,"Keys":[...],"Value":null}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "UpdateRecord", try_from = "UpdateRecord")]
pub enum UpdateEntry {
    /// 携带新值的单键更新
    Set { key: String, value: Value },
    /// 值过大无法内联时，通知监听方重新拉取这些键
    Fetch { keys: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum UpdateAction {
    Set,
    Fetch,
}

/// 线上记录，字段顺序即序列化顺序
#[derive(Serialize, Deserialize)]
struct UpdateRecord {
    #[serde(rename = "Action")]
    action: UpdateAction,
    #[serde(rename = "Key", default)]
    key: Option<String>,
    #[serde(rename = "Keys", default)]
    keys: Option<Vec<String>>,
    #[serde(rename = "Value", default)]
    value: Option<Value>,
}

impl From<UpdateEntry> for UpdateRecord {
    fn from(entry: UpdateEntry) -> Self {
        match entry {
            UpdateEntry::Set { key, value } => UpdateRecord {
                action: UpdateAction::Set,
                key: Some(key),
                keys: None,
                value: Some(value),
            },
            UpdateEntry::Fetch { keys } => UpdateRecord {
                action: UpdateAction::Fetch,
                key: None,
                keys: Some(keys),
                value: None,
            },
        }
    }
}

impl TryFrom<UpdateRecord> for UpdateEntry {
    type Error = String;

    fn try_from(record: UpdateRecord) -> std::result::Result<Self, Self::Error> {
        match record.action {
            UpdateAction::Set => {
                let key = record.key.ok_or("Set entry is missing Key")?;
                Ok(UpdateEntry::Set {
                    key,
                    value: record.value.unwrap_or(Value::Null),
                })
            }
            UpdateAction::Fetch => {
                let keys = record.keys.ok_or("Fetch entry is missing Keys")?;
                Ok(UpdateEntry::Fetch { keys })
            }
        }
    }
}

impl UpdateEntry {
    pub fn set(key: impl Into<String>, value: Value) -> Self {
        UpdateEntry::Set {
            key: key.into(),
            value,
        }
    }

    pub fn fetch(keys: Vec<String>) -> Self {
        UpdateEntry::Fetch { keys }
    }

    /// 序列化为紧凑 JSON 字符串
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
