//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::Config;
use crate::telemetry::init_tracing;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "savesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "SAVESYNC_API_KEY",
        hide_env_values = true,
        help = "Open Cloud API key (overrides the configuration file)"
    )]
    pub api_key: Option<String>,

    #[arg(short, long, global = true, help = "Owner (universe) id")]
    pub owner: Option<u64>,

    #[arg(long, global = true, default_value = "info", help = "Log filter when RUST_LOG is unset")]
    pub log_level: String,

    #[arg(long, global = true, help = "Print request metrics after the command")]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "dump", about = "Print every field of a datastore entry")]
    Dump(EntryArgs),

    #[command(name = "get", about = "Print one field of a datastore entry")]
    Get(GetArgs),

    #[command(name = "set", about = "Set one field and notify subscribers")]
    Set(SetArgs),

    #[command(name = "metrics", about = "Print request metrics")]
    Metrics,
}

#[derive(Parser, Debug)]
pub struct EntryArgs {
    #[arg(help = "Datastore name")]
    pub store: String,

    #[arg(help = "Entry key")]
    pub key: String,
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub entry: EntryArgs,

    #[arg(help = "Field name")]
    pub field: String,
}

#[derive(Parser, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub entry: EntryArgs,

    #[arg(help = "Field name")]
    pub field: String,

    #[arg(help = "JSON value (bare text is stored as a string)")]
    pub value: String,
}

mod entry;
mod metrics;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    match &cli.command {
        Commands::Dump(args) => entry::dump(&cli, &config, args).await?,
        Commands::Get(args) => entry::get(&cli, &config, args).await?,
        Commands::Set(args) => entry::set(&cli, &config, args).await?,
        Commands::Metrics => return metrics::execute(),
    }

    if cli.metrics {
        metrics::execute()?;
    }
    Ok(())
}
