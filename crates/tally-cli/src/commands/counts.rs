//! `counts` — list persisted keys.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;
use tally_core::types::key;

use crate::output;

/// Arguments for `counts`
#[derive(Debug, Args)]
pub struct CountsArgs {
    /// Only keys equal to or below this prefix
    #[arg(short, long)]
    pub prefix: Option<String>,
}

/// One persisted key
#[derive(Debug, Serialize, Tabled)]
pub struct CountRow {
    /// Key
    pub key: String,
    /// Count
    pub count: u64,
    /// Segments in the key
    pub depth: usize,
}

/// Execute `counts`
pub async fn execute(args: &CountsArgs, cli: &super::Cli) -> AppResult<()> {
    let (_, store) = cli.open_store().await?;
    let entries = store.list().await?;

    let rows: Vec<CountRow> = entries
        .into_iter()
        .filter(|(k, _)| match &args.prefix {
            Some(prefix) => k == prefix || k.starts_with(&format!("{prefix}.")),
            None => true,
        })
        .map(|(k, count)| CountRow {
            depth: key::depth(&k),
            key: k,
            count,
        })
        .collect();

    output::print_list(&rows, cli.format);
    Ok(())
}
