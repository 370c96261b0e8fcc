//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于 HTTP 的 Open Cloud 传输实现。

use super::{DataStoreTransport, TransportFactory};
use crate::config::OpenCloudConfig;
use crate::error::{ClassifiedError, ErrorResponse, Result, SyncError};
use crate::utils::redaction::redact_secret;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Open Cloud 传输
///
/// 为单个游戏（universe）发送请求，并在每个请求上附加 `x-api-key`
pub struct OpenCloudTransport {
    /// HTTP 客户端
    client: Client,
    /// 基础 URL
    base_url: String,
    /// 游戏 id
    owner_id: u64,
    /// API 密钥，可在运行时替换
    api_key: RwLock<SecretString>,
}

impl OpenCloudTransport {
    /// 创建新的 Open Cloud 传输
    ///
    /// # 参数
    ///
    /// * `config` - Open Cloud 配置
    /// * `owner_id` - 游戏 id
    /// * `credential` - API 密钥
    ///
    /// # 返回值
    ///
    /// HTTP 客户端无法创建时返回传输错误
    pub fn new(config: &OpenCloudConfig, owner_id: u64, credential: SecretString) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SyncError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            owner_id,
            api_key: RwLock::new(credential),
        })
    }

    pub fn owner_id(&self) -> u64 {
        self.owner_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn entry_request(&self, method: reqwest::Method, store_name: &str, store_key: &str) -> RequestBuilder {
        let url = self.url(&format!(
            "datastores/v1/universes/{}/standard-datastores/datastore/entries/entry",
            self.owner_id
        ));
        self.client
            .request(method, url)
            .query(&[("datastoreName", store_name), ("entryKey", store_key)])
    }

    fn api_key(&self) -> String {
        self.api_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .expose_secret()
            .to_string()
    }

    /// 发送请求并解析响应
    ///
    /// 非 2xx 响应会被分类为 [`ClassifiedError`]；空响应体返回 None
    async fn send(&self, request: RequestBuilder) -> Result<Option<Value>> {
        let response = request
            .header("x-api-key", self.api_key())
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body = serde_json::from_str::<ErrorResponse>(&text).ok();
            let error = ClassifiedError::from_response(status.as_u16(), body);
            warn!(
                "Open Cloud request failed: owner={}, status={}, kind={:?}",
                self.owner_id, error.status, error.kind
            );
            return Err(error.into());
        }

        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }
}

impl fmt::Debug for OpenCloudTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenCloudTransport")
            .field("base_url", &self.base_url)
            .field("owner_id", &self.owner_id)
            .field(
                "api_key",
                &redact_secret(&self.api_key.read().unwrap_or_else(PoisonError::into_inner)),
            )
            .finish()
    }
}

#[async_trait]
impl DataStoreTransport for OpenCloudTransport {
    #[instrument(skip(self), level = "debug", fields(owner = self.owner_id))]
    async fn read(&self, store_name: &str, store_key: &str) -> Result<Option<Map<String, Value>>> {
        let request = self.entry_request(reqwest::Method::GET, store_name, store_key);
        match self.send(request).await? {
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(SyncError::Serialization(format!(
                "entry {}/{} is not an object: {}",
                store_name, store_key, other
            ))),
        }
    }

    #[instrument(skip(self, snapshot), level = "debug", fields(owner = self.owner_id, keys = snapshot.len()))]
    async fn write_snapshot(
        &self,
        store_name: &str,
        store_key: &str,
        snapshot: &Map<String, Value>,
    ) -> Result<()> {
        let request = self
            .entry_request(reqwest::Method::POST, store_name, store_key)
            .json(snapshot);
        self.send(request).await?;
        debug!("Open Cloud snapshot written: {}/{}", store_name, store_key);
        Ok(())
    }

    #[instrument(skip(self, message), level = "debug", fields(owner = self.owner_id, len = message.len()))]
    async fn notify(&self, topic: &str, message: &str) -> Result<()> {
        let url = self.url(&format!(
            "messaging-service/v1/universes/{}/topics/{}",
            self.owner_id, topic
        ));
        let request = self.client.post(url).json(&json!({ "message": message }));
        self.send(request).await?;
        Ok(())
    }

    fn set_credential(&self, credential: SecretString) {
        *self.api_key.write().unwrap_or_else(PoisonError::into_inner) = credential;
    }
}

/// Open Cloud 传输工厂
#[derive(Debug, Clone)]
pub struct OpenCloudTransportFactory {
    config: OpenCloudConfig,
}

impl OpenCloudTransportFactory {
    pub fn new(config: OpenCloudConfig) -> Self {
        Self { config }
    }
}

impl TransportFactory for OpenCloudTransportFactory {
    fn create(
        &self,
        owner_id: u64,
        credential: SecretString,
    ) -> Result<Arc<dyn DataStoreTransport>> {
        Ok(Arc::new(OpenCloudTransport::new(
            &self.config,
            owner_id,
            credential,
        )?))
    }
}
