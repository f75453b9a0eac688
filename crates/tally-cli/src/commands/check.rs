//! `check` — verify the rollup invariant of persisted counts.

use serde::Serialize;

use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;
use tally_realtime::counter::CounterState;

use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct CheckReport {
    keys: usize,
    root: u64,
    violations: Vec<String>,
}

/// Execute `check`
pub async fn execute(cli: &super::Cli) -> AppResult<()> {
    let (_, store) = cli.open_store().await?;
    let state = CounterState::from_entries(store.list().await?);
    let report = CheckReport {
        keys: state.len(),
        root: state.root_total(),
        violations: state.rollup_violations(),
    };

    match cli.format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_kv("Keys", &report.keys.to_string());
            output::print_kv("Root", &report.root.to_string());
            for key in &report.violations {
                output::print_warning(&format!(
                    "'{key}' = {} but its children sum to {}",
                    state.get(key),
                    state.children(key).values().sum::<u64>()
                ));
            }
        }
    }

    if report.violations.is_empty() {
        if cli.format == OutputFormat::Table {
            output::print_success("All counts roll up");
        }
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{} key(s) do not match the sum of their children",
            report.violations.len()
        )))
    }
}
