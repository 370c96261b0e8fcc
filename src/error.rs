//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步层的错误类型，以及远程失败响应的分类逻辑。

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 数据存储不存在时 Open Cloud 返回的错误码
pub const DATASTORE_NOT_FOUND_CODE: &str = "DatastoreNotFound";

/// 数据存储条目不存在时 Open Cloud 返回的错误码
pub const ENTRY_NOT_FOUND_CODE: &str = "EntryNotFound";

/// 远程失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// API 密钥无效或已过期（401）
    Unauthorized,
    /// API 密钥缺少游戏或操作权限（403）
    InsufficientScope,
    /// 数据存储不存在
    StoreNotFound,
    /// 数据存储条目不存在
    EntryNotFound,
    /// 其他失败
    Generic,
}

impl FailureKind {
    /// 是否属于"尚无数据"类的失败
    pub fn is_not_found(&self) -> bool {
        matches!(self, FailureKind::StoreNotFound | FailureKind::EntryNotFound)
    }
}

/// 远程错误响应体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorResponse {
    /// 机器可读的错误码
    pub error: String,
    /// 人类可读的错误信息
    pub message: String,
    /// 错误详情列表
    pub error_details: Vec<ErrorDetail>,
}

/// 错误详情条目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorDetail {
    /// 详情类型
    pub error_detail_type: String,
    /// 数据存储专用的错误码
    pub datastore_error_code: Option<String>,
}

/// 对失败的远程响应进行分类
///
/// 先检查状态码，再检查响应体；只读取第一个错误详情。
///
/// # 参数
///
/// * `status` - HTTP 状态码
/// * `body` - 解析后的错误响应体（可能不存在）
///
/// # 返回值
///
/// 返回失败分类，永不失败
pub fn classify(status: u16, body: Option<&ErrorResponse>) -> FailureKind {
    match status {
        401 => FailureKind::Unauthorized,
        403 => FailureKind::InsufficientScope,
        404 => {
            let code = body
                .and_then(|b| b.error_details.first())
                .and_then(|d| d.datastore_error_code.as_deref());
            match code {
                Some(DATASTORE_NOT_FOUND_CODE) => FailureKind::StoreNotFound,
                Some(ENTRY_NOT_FOUND_CODE) => FailureKind::EntryNotFound,
                _ => FailureKind::Generic,
            }
        }
        _ => FailureKind::Generic,
    }
}

/// 已分类的远程错误
///
/// 保留原始状态码和响应体以便诊断
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedError {
    /// 失败分类
    pub kind: FailureKind,
    /// HTTP 状态码
    pub status: u16,
    /// 原始错误响应体
    pub body: Option<ErrorResponse>,
}

impl ClassifiedError {
    /// 根据响应构造已分类的错误
    pub fn from_response(status: u16, body: Option<ErrorResponse>) -> Self {
        let kind = classify(status, body.as_ref());
        Self { kind, status, body }
    }

    /// 直接指定分类构造错误，主要用于测试替身
    pub fn with_kind(kind: FailureKind, status: u16) -> Self {
        Self {
            kind,
            status,
            body: None,
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Unauthorized => write!(f, "API key is invalid or expired."),
            FailureKind::InsufficientScope => write!(
                f,
                "API key is valid but does not have permissions for either the game or operation."
            ),
            FailureKind::StoreNotFound => write!(f, "DataStore does not exist."),
            FailureKind::EntryNotFound => write!(f, "DataStore entry does not exist."),
            FailureKind::Generic => {
                write!(f, "Error occurred with Open Cloud (status {})", self.status)?;
                if let Some(body) = &self.body {
                    if !body.error.is_empty() || !body.message.is_empty() {
                        write!(f, ": {} {}", body.error, body.message)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ClassifiedError {}

/// 同步层错误类型枚举
#[derive(Error, Debug)]
pub enum SyncError {
    /// 远程存储返回的已分类失败
    #[error("{0}")]
    Remote(ClassifiedError),

    /// 事务函数由调用方主动中止
    #[error("Transaction aborted: {0}")]
    Aborted(Box<dyn std::error::Error + Send + Sync>),

    /// 序列化错误（包括值的结构转换失败）
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 传输层错误（未收到响应状态）
    #[error("Transport error: {0}")]
    Transport(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SyncError {
    /// 包装调用方在事务函数中主动抛出的错误
    pub fn aborted(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        SyncError::Aborted(e.into())
    }

    /// 返回远程失败的分类，非远程错误返回 None
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            SyncError::Remote(e) => Some(e.kind),
            _ => None,
        }
    }

    /// 是否是可以视为"空数据"的失败
    pub fn is_not_found(&self) -> bool {
        self.kind().is_some_and(|k| k.is_not_found())
    }
}

impl From<ClassifiedError> for SyncError {
    fn from(e: ClassifiedError) -> Self {
        SyncError::Remote(e)
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

/// 同步操作结果类型别名
pub type Result<T> = std::result::Result<T, SyncError>;
