pub mod delete;
pub mod expenses;
pub mod health;
pub mod status;
pub mod summary;
pub mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::ledger::JournalLedger;
use crate::models::Identity;
use crate::settings::{Config, Credentials};

/// Open the configured ledger as the credentialed user.
pub(crate) fn open_ledger(config: &Config, creds: &Credentials) -> Result<JournalLedger> {
    let user = Identity {
        id: creds.ledger_user_id.clone(),
        email: creds.ledger_user_email.clone(),
    };
    JournalLedger::open(&config.ledger_path, user)
}

#[derive(Parser)]
#[command(
    name = "splitsync",
    version,
    about = "Turn bank purchase notifications into shared expenses."
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch unread notifications and create an expense for each new charge.
    Sync {
        /// Parse and deduplicate only; create nothing and leave the mailbox as is
        #[arg(long)]
        dry_run: bool,
        /// Write parsed emails to this JSON file instead of syncing (implies --dry-run)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Transaction store file (default: <data_dir>/transactions.json)
        #[arg(long)]
        store: Option<PathBuf>,
        /// Friend to split with
        #[arg(long = "friend-id")]
        friend_id: Option<String>,
        /// Share of each expense owed by you, between 0 and 1
        #[arg(long)]
        split: Option<f64>,
        /// Only process mail from this address
        #[arg(long)]
        sender: Option<String>,
    },
    /// Summarize ledger expenses by category.
    Summary {
        /// Last month of the range, YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
        /// Number of months ending with --month
        #[arg(long, default_value_t = 1)]
        periods: u32,
        /// Friend the expenses are shared with (default: from settings)
        #[arg(long = "friend-id")]
        friend_id: Option<String>,
        /// Maximum number of expenses to retrieve
        #[arg(long, default_value_t = 1000)]
        limit: usize,
        /// Categories to leave out of the totals
        #[arg(long, num_args = 1.., value_name = "CATEGORY")]
        exclude: Vec<String>,
    },
    /// List ledger expenses as JSON.
    Expenses {
        /// Maximum number of expenses to list
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete an expense from the ledger.
    Delete {
        /// Ledger expense id
        expense_id: String,
    },
    /// Check that the ledger is reachable.
    Health,
    /// Show configuration and processed transaction count.
    Status,
}
