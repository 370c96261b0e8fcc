//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步层的配置结构和解析逻辑。

use crate::data::SyncOptions;
use crate::error::{Result, SyncError};
use crate::sync::DEFAULT_BATCH_BUDGET;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_VERSION: u32 = 1;

/// 默认的通知主题
pub const DEFAULT_NOTIFY_TOPIC: &str = "NexusBulkMessagingService";

/// 默认的通知字段前缀
pub const DEFAULT_TOPIC_PREFIX: &str = "NSD_";

/// 默认的 Open Cloud 地址
pub const DEFAULT_BASE_URL: &str = "https://apis.roblox.com/";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub open_cloud: OpenCloudConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Open Cloud 配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct OpenCloudConfig {
    /// 基础 URL
    pub base_url: String,
    /// 请求超时时间（毫秒）
    pub timeout_ms: u64,
    /// API 密钥（可选，使用 SecretString 保护）
    pub api_key: Option<SecretString>,
}

impl Default for OpenCloudConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30000,
            api_key: None,
        }
    }
}

/// 同步配置
///
/// 定义变更通知的大小预算和主题命名
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SyncConfig {
    /// 单批消息的序列化大小预算
    pub batch_budget: usize,
    /// 单个值允许内联的最大序列化大小，超过则改为 Fetch
    pub record_budget: usize,
    /// 通知主题
    pub notify_topic: String,
    /// 通知字段前缀，字段名为 `前缀 + 条目键`
    pub topic_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_budget: DEFAULT_BATCH_BUDGET,
            record_budget: DEFAULT_BATCH_BUDGET,
            notify_topic: DEFAULT_NOTIFY_TOPIC.to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            batch_budget: config.batch_budget,
            record_budget: config.record_budget,
            notify_topic: config.notify_topic.clone(),
            topic_prefix: config.topic_prefix.clone(),
        }
    }
}

impl Config {
    /// 从 TOML 字符串解析并验证配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| SyncError::ConfigError(e.to_string()))?;
        config.validate().map_err(SyncError::ConfigError)?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有值在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        // 验证配置版本
        if let Some(version) = &self.config_version {
            if *version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        // 验证 Open Cloud 配置
        let base_url = &self.open_cloud.base_url;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(format!(
                "open_cloud base_url '{}' must start with http:// or https://",
                base_url
            ));
        }

        if !(100..=300_000).contains(&self.open_cloud.timeout_ms) {
            return Err("open_cloud timeout_ms must be between 100 and 300000 ms".to_string());
        }

        // 验证同步配置
        if !(1..=1_000_000).contains(&self.sync.batch_budget) {
            return Err("sync batch_budget must be between 1 and 1000000".to_string());
        }

        if !(1..=1_000_000).contains(&self.sync.record_budget) {
            return Err("sync record_budget must be between 1 and 1000000".to_string());
        }

        if self.sync.notify_topic.trim().is_empty() {
            return Err("sync notify_topic cannot be empty".to_string());
        }

        Ok(())
    }

    /// 转换为运行时同步选项
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions::from(&self.sync)
    }
}
