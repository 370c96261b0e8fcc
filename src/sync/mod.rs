//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了变更通知的条目格式和批量分组机制。

pub mod batch;
pub mod entry;

pub use batch::{BulkMessageEntries, DEFAULT_BATCH_BUDGET};
pub use entry::UpdateEntry;
