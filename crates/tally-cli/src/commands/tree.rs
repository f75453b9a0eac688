//! `tree` — persisted counts as a rollup tree.

use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;
use tally_realtime::counter::{CountNode, CounterState};

use crate::output::{self, OutputFormat};

/// Execute `tree`
pub async fn execute(cli: &super::Cli) -> AppResult<()> {
    let (config, store) = cli.open_store().await?;
    let state = CounterState::from_entries(store.list().await?);
    let tree = state.tree();

    match cli.format {
        OutputFormat::Json => output::print_json(&tree),
        OutputFormat::Table => {
            println!("{} (root) = {}", config.counter.instance, tree.count);
            for child in &tree.children {
                print_node(child, 1);
            }
        }
    }
    Ok(())
}

fn print_node(node: &CountNode, level: usize) {
    println!("{}{} = {}", "  ".repeat(level), node.key, node.count);
    for child in &node.children {
        print_node(child, level + 1);
    }
}
