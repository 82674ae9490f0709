use std::path::PathBuf;

use crate::cli::open_ledger;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::models::ExpenseFilter;
use crate::settings::{Config, Credentials};

pub fn run(config: &Config, limit: usize, output: Option<PathBuf>) -> Result<()> {
    let creds = Credentials::from_env()?;
    let ledger = open_ledger(config, &creds)?;
    let filter = ExpenseFilter {
        limit: Some(limit),
        ..ExpenseFilter::default()
    };
    let expenses = ledger.list_expenses(&filter)?;
    let json = serde_json::to_string_pretty(&expenses)?;

    match output {
        Some(path) => {
            std::fs::write(&path, format!("{json}\n"))?;
            println!("Wrote {} expenses to {}", expenses.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
