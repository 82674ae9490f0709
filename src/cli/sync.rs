use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};
use tracing::info;

use crate::audit::AuditLog;
use crate::cli::open_ledger;
use crate::error::{Result, SyncError};
use crate::mailbox::Maildir;
use crate::parser;
use crate::settings::{Config, Credentials};
use crate::store::TransactionStore;
use crate::sync::{self, SyncOptions, SyncReport};

pub struct SyncArgs {
    pub dry_run: bool,
    pub output: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub friend_id: Option<String>,
    pub split: Option<f64>,
    pub sender: Option<String>,
}

pub fn run(config: &Config, args: SyncArgs) -> Result<()> {
    let creds = Credentials::from_env()?;
    let template = parser::get_by_key(&config.template)?;
    let sender = args.sender.unwrap_or_else(|| config.sender.clone());
    info!(template = template.name(), sender = %sender, "using receipt template");

    let mut mailbox = Maildir::open(&config.maildir)?;
    info!(user = %creds.mail_user, maildir = %config.maildir.display(), "opened mailbox");

    if let Some(output) = args.output {
        let entries = sync::export_batch(&mut mailbox, template, &sender, &output)?;
        let failed = entries.iter().filter(|e| e.error.is_some()).count();
        println!(
            "Wrote {} emails to {} ({} failed to parse).",
            entries.len(),
            output.display(),
            failed
        );
        return Ok(());
    }

    let mut split = config.split.clone();
    if let Some(ratio) = args.split {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(SyncError::Settings(format!("split must be between 0 and 1, got {ratio}")));
        }
        split.ratio = ratio;
    }
    if let Some(friend_id) = args.friend_id {
        split.friend_id = friend_id;
    }

    let mut ledger = open_ledger(config, &creds)?;
    let store_path = args.store.unwrap_or_else(|| config.store_path.clone());
    let mut store = TransactionStore::open(&store_path)?;
    info!(store = %store.path().display(), processed = store.len(), "opened transaction store");
    let audit = AuditLog::new(&config.logs_dir);

    let opts = SyncOptions {
        sender,
        template,
        split,
        dry_run: args.dry_run,
    };
    let report = sync::run_batch(&mut mailbox, &mut ledger, &mut store, Some(&audit), &opts)?;
    println!("{}", format_report(&report, args.dry_run));
    Ok(())
}

pub fn format_report(report: &SyncReport, dry_run: bool) -> String {
    let mut out = format!(
        "Fetched: {}  Created: {}  Duplicates: {}  Failed: {}",
        report.fetched,
        report.created.len(),
        report.duplicates,
        report.failed
    );
    if dry_run {
        out.push_str(&format!("\n{} {} would be created.", "Dry run:".yellow().bold(), report.parsed));
        return out;
    }
    if report.created.is_empty() {
        out.push_str("\nNo expenses were created.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Expense", "Cost"]);
        for expense in &report.created {
            table.add_row(vec![Cell::new(&expense.id), Cell::new(format!("{:.2}", expense.cost))]);
        }
        table.add_row(vec![
            Cell::new("Total".bold()),
            Cell::new(format!("{:.2}", report.total()).bold()),
        ]);
        out.push_str(&format!("\n{table}"));
    }
    if report.failed > 0 {
        out.push_str(&format!(
            "\n{}",
            format!("{} emails failed and were left unread.", report.failed).red()
        ));
    }
    if !report.unrecorded.is_empty() {
        let ids: Vec<&str> = report.unrecorded.iter().map(|e| e.id.as_str()).collect();
        out.push_str(&format!(
            "\n{} {}",
            "Not recorded in the store, reconcile manually:".red().bold(),
            ids.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::expense_ref;

    #[test]
    fn test_report_without_expenses() {
        let report = SyncReport {
            fetched: 2,
            duplicates: 2,
            ..SyncReport::default()
        };
        let text = format_report(&report, false);
        assert!(text.contains("Fetched: 2"));
        assert!(text.contains("No expenses were created."));
    }

    #[test]
    fn test_report_lists_created_expenses() {
        let report = SyncReport {
            fetched: 2,
            created: vec![expense_ref("7"), expense_ref("8")],
            failed: 1,
            ..SyncReport::default()
        };
        let text = format_report(&report, false);
        assert!(text.contains("21.98"));
        assert!(text.contains("left unread"));
        assert!(!text.contains("No expenses were created."));
    }

    #[test]
    fn test_report_names_unrecorded_expenses() {
        let report = SyncReport {
            fetched: 1,
            created: vec![expense_ref("7")],
            unrecorded: vec![expense_ref("7")],
            ..SyncReport::default()
        };
        let text = format_report(&report, false);
        assert!(text.contains("reconcile manually"));
        assert!(text.contains("7"));
    }

    #[test]
    fn test_dry_run_report() {
        let report = SyncReport {
            fetched: 1,
            parsed: 1,
            ..SyncReport::default()
        };
        let text = format_report(&report, true);
        assert!(text.contains("would be created"));
    }
}
