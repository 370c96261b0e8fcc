//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步核心与远程存储之间的传输接口。

pub mod open_cloud;

use crate::error::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Map, Value};
use std::sync::Arc;

pub use open_cloud::{OpenCloudTransport, OpenCloudTransportFactory};

/// 数据存储传输特征
///
/// 核心只通过这三个远程操作访问网络；每个实例绑定一个所有者（游戏）。
#[async_trait]
pub trait DataStoreTransport: Send + Sync {
    /// 读取条目
    ///
    /// # 参数
    ///
    /// * `store_name` - 数据存储名称
    /// * `store_key` - 条目键
    ///
    /// # 返回值
    ///
    /// 返回条目的全部键值，响应体为空时返回 None
    async fn read(&self, store_name: &str, store_key: &str) -> Result<Option<Map<String, Value>>>;

    /// 整体写入条目快照
    async fn write_snapshot(
        &self,
        store_name: &str,
        store_key: &str,
        snapshot: &Map<String, Value>,
    ) -> Result<()>;

    /// 向主题发送一条消息
    async fn notify(&self, topic: &str, message: &str) -> Result<()>;

    /// 替换后续请求使用的凭据
    fn set_credential(&self, _credential: SecretString) {}
}

/// 传输工厂
///
/// 注册表为每个所有者创建一个独立的传输实例
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        owner_id: u64,
        credential: SecretString,
    ) -> Result<Arc<dyn DataStoreTransport>>;
}

impl<F> TransportFactory for F
where
    F: Fn(u64, SecretString) -> Result<Arc<dyn DataStoreTransport>> + Send + Sync,
{
    fn create(
        &self,
        owner_id: u64,
        credential: SecretString,
    ) -> Result<Arc<dyn DataStoreTransport>> {
        self(owner_id, credential)
    }
}
