//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块是同步工具的入口点。

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    savesync::cli::run().await
}
