//! CLI command definitions and dispatch.

pub mod check;
pub mod config;
pub mod counts;
pub mod tree;

use clap::{Parser, Subcommand};

use tally_core::config::AppConfig;
use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_store::StoreManager;

use crate::output::OutputFormat;

/// Tally — inspect persisted counters and configuration
#[derive(Debug, Parser)]
#[command(name = "tally", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay (`config/{env}.toml`)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List persisted counts
    Counts(counts::CountsArgs),
    /// Show persisted counts as a rollup tree
    Tree,
    /// Verify that persisted counts roll up
    Check,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> AppResult<()> {
        match &self.command {
            Commands::Counts(args) => counts::execute(args, self).await,
            Commands::Tree => tree::execute(self).await,
            Commands::Check => check::execute(self).await,
            Commands::Config(args) => config::execute(args, self).await,
        }
    }

    /// Load configuration from the selected files
    pub fn load_config(&self) -> AppResult<AppConfig> {
        AppConfig::load(&self.config, &self.env)
    }

    /// Open the configured store of the configured instance for reading
    pub async fn open_store(&self) -> AppResult<(AppConfig, StoreManager)> {
        let config = self.load_config()?;
        if config.store.provider == "memory" {
            return Err(AppError::configuration(
                "The memory store lives inside the server process and cannot be inspected",
            ));
        }
        let store = StoreManager::open_read_only(&config.store, &config.counter.instance).await?;
        Ok((config, store))
    }
}
