//! savesync - 远程键值存储的客户端同步层
//!
//! 在本地缓存每个数据存储条目的内容，写入时整体保存快照，
//! 并通过批量消息通知其他实例哪些键发生了变化。

#![doc(html_root_url = "https://docs.rs/savesync/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod sync;
pub mod telemetry;
pub mod transport;
pub mod utils;

// Re-export commonly used items
pub use config::Config;
pub use data::{
    MemorySaveData, SaveData, SaveDataRead, SaveDataWrite, SyncOptions, TransactionSaveData,
};
pub use error::{ClassifiedError, FailureKind, Result, SyncError};
pub use manager::{OwnerContext, SaveDataManager};
pub use sync::{BulkMessageEntries, UpdateEntry};
pub use transport::{DataStoreTransport, OpenCloudTransport, TransportFactory};

/// savesync 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
