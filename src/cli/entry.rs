//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了条目读写命令的实现。

use crate::cli::{Cli, EntryArgs, GetArgs, SetArgs};
use crate::config::Config;
use crate::data::SaveData;
use crate::manager::SaveDataManager;
use crate::utils::redaction::redact_secret;
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// 根据命令行参数和配置加载条目
async fn open(cli: &Cli, config: &Config, args: &EntryArgs) -> Result<Arc<SaveData>> {
    let owner_id = cli.owner.context("--owner is required for this command")?;
    let credential = match &cli.api_key {
        Some(key) => SecretString::from(key.clone()),
        None => config
            .open_cloud
            .api_key
            .clone()
            .context("No API key given: pass --api-key, set SAVESYNC_API_KEY or configure open_cloud.api_key")?,
    };
    debug!(
        "Opening {}/{} for owner {} with key {}",
        args.store,
        args.key,
        owner_id,
        redact_secret(&credential)
    );

    let manager = SaveDataManager::from_config(config);
    let save_data = manager
        .get_save_data(owner_id, &args.store, &args.key, credential)
        .await
        .with_context(|| format!("Failed to load {}/{}", args.store, args.key))?;
    Ok(save_data)
}

/// 把命令行上的值解析为 JSON，无法解析时按字符串处理
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn dump(cli: &Cli, config: &Config, args: &EntryArgs) -> Result<()> {
    let save_data = open(cli, config, args).await?;
    let snapshot = save_data.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub async fn get(cli: &Cli, config: &Config, args: &GetArgs) -> Result<()> {
    let save_data = open(cli, config, &args.entry).await?;
    let value = save_data.get_value(&args.field).unwrap_or(Value::Null);
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub async fn set(cli: &Cli, config: &Config, args: &SetArgs) -> Result<()> {
    let save_data = open(cli, config, &args.entry).await?;
    let value = parse_value(&args.value);
    save_data
        .set(&args.field, value)
        .await
        .with_context(|| format!("Failed to save {}", args.field))?;
    println!("✅ {} updated", args.field);
    Ok(())
}
