//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use tally_core::result::AppResult;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the merged configuration
    Show,
    /// Validate the configuration
    Validate,
}

/// Execute config commands
pub async fn execute(args: &ConfigArgs, cli: &super::Cli) -> AppResult<()> {
    match &args.command {
        ConfigCommand::Show => {
            let config = cli.load_config()?;
            match cli.format {
                OutputFormat::Json => output::print_json(&config),
                OutputFormat::Table => println!("{config:#?}"),
            }
        }
        ConfigCommand::Validate => match cli.load_config() {
            Ok(config) => {
                output::print_success(&format!("Configuration '{}' is valid", cli.config));
                output::print_kv(
                    "Server",
                    &format!("{}:{}", config.server.host, config.server.port),
                );
                output::print_kv("Instance", &config.counter.instance);
                output::print_kv("Mode", &format!("{:?}", config.counter.mode));
                output::print_kv("Flush delay", &format!("{}ms", config.counter.flush_delay_ms));
                output::print_kv("Store", &describe_store(&config.store));
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {e}"));
                return Err(e);
            }
        },
    }

    Ok(())
}

fn describe_store(store: &tally_core::config::StoreConfig) -> String {
    match store.provider.as_str() {
        "file" => format!("file ({})", store.file.path),
        "redis" => format!("redis ({})", mask_password(&store.redis.url)),
        other => other.to_string(),
    }
}

/// Mask the password in a connection URL for display
fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if colon_pos > scheme_end {
                return format!("{}****{}", &url[..=colon_pos], &url[at_pos..]);
            }
        }
    }
    url.to_string()
}
