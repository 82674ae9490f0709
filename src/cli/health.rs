use colored::Colorize;

use crate::cli::open_ledger;
use crate::error::{Result, SyncError};
use crate::ledger::Ledger;
use crate::settings::{Config, Credentials};

pub fn run(config: &Config) -> Result<()> {
    let creds = Credentials::from_env()?;
    let ledger = open_ledger(config, &creds)?;
    let user = ledger.current_user()?;

    if !ledger.check_systems() {
        return Err(SyncError::Ledger(format!(
            "ledger at {} is not reachable",
            config.ledger_path.display()
        )));
    }
    println!("{} signed in as {} ({})", "OK".green().bold(), user.email, user.id);
    Ok(())
}
