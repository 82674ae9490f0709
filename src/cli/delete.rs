use tracing::warn;

use crate::cli::open_ledger;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::settings::{Config, Credentials};

/// Removes the expense from the ledger only. The store keeps the hash, so the
/// same charge will not be re-created by a later sync.
pub fn run(config: &Config, expense_id: &str) -> Result<()> {
    let creds = Credentials::from_env()?;
    let mut ledger = open_ledger(config, &creds)?;
    ledger.delete_expense(expense_id)?;
    warn!(expense_id, "deleted expense; the transaction store still lists it as processed");
    println!("Deleted expense {expense_id}.");
    Ok(())
}
