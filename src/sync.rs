use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::audit::AuditLog;
use crate::error::{Result, SyncError};
use crate::ledger::Ledger;
use crate::mailbox::Mailbox;
use crate::models::{EmailMessage, ExpenseRef, NewExpense, Split, Transaction};
use crate::parser::ReceiptTemplate;
use crate::store::TransactionStore;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub sender: String,
    pub template: ReceiptTemplate,
    pub split: Split,
    /// Parse and dedup only: no expenses, no store writes, no mailbox flag changes.
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub fetched: usize,
    pub created: Vec<ExpenseRef>,
    pub duplicates: usize,
    pub failed: usize,
    /// Parsed successfully but not sent anywhere (dry run).
    pub parsed: usize,
    /// Created in the ledger but the store write failed; needs manual reconciliation.
    pub unrecorded: Vec<ExpenseRef>,
}

impl SyncReport {
    pub fn total(&self) -> f64 {
        self.created.iter().map(|e| e.cost).sum()
    }
}

fn creation_error(e: SyncError) -> SyncError {
    match e {
        SyncError::ExpenseCreation(_) => e,
        other => SyncError::ExpenseCreation(other.to_string()),
    }
}

fn handle_failure<M: Mailbox>(
    mailbox: &mut M,
    audit: Option<&AuditLog>,
    email: &EmailMessage,
    err: &SyncError,
    dry_run: bool,
) {
    error!(uid = %email.uid, subject = %email.subject, error = %err, "failed to process email");
    if let Some(audit) = audit {
        audit.errored(email, &err.to_string());
    }
    if dry_run {
        return;
    }
    if let Err(e) = mailbox.mark_unread(&email.uid) {
        error!(uid = %email.uid, error = %e, "failed to mark email unread");
    }
}

/// Run one fetch-parse-create cycle over every unread notification.
///
/// Per-email failures are logged, the email is flagged unread again for the
/// next run, and the batch moves on. The ledger expense is always created
/// before the store records it, so an interruption can only leave an
/// unrecorded expense, never a recorded hash without an expense.
pub fn run_batch<M: Mailbox, L: Ledger>(
    mailbox: &mut M,
    ledger: &mut L,
    store: &mut TransactionStore,
    audit: Option<&AuditLog>,
    opts: &SyncOptions,
) -> Result<SyncReport> {
    info!(sender = %opts.sender, dry_run = opts.dry_run, "fetching unprocessed emails");
    let emails = mailbox.fetch_unread(&opts.sender, !opts.dry_run)?;
    let mut report = SyncReport {
        fetched: emails.len(),
        ..SyncReport::default()
    };

    for email in &emails {
        info!(uid = %email.uid, subject = %email.subject, "processing email");

        let transaction = match opts.template.parse(email) {
            Ok(t) => t,
            Err(e) => {
                handle_failure(mailbox, audit, email, &e.into(), opts.dry_run);
                report.failed += 1;
                continue;
            }
        };

        debug!(uid = %email.uid, hash_input = %transaction.hash_input(), "parsed transaction");

        if store.contains(transaction.hash()) {
            info!(uid = %email.uid, hash = %transaction.hash(), "transaction already processed, skipping");
            report.duplicates += 1;
            continue;
        }

        if opts.dry_run {
            info!(
                uid = %email.uid,
                cost = %transaction.cost_str(),
                currency = %transaction.currency_code(),
                description = %transaction.description(),
                date = %transaction.date_str(),
                "dry run: parsed transaction"
            );
            report.parsed += 1;
            continue;
        }

        let request = NewExpense::from_transaction(&transaction, opts.split.clone());
        let expense = match ledger.create_expense(&request).map_err(creation_error) {
            Ok(e) => e,
            Err(e) => {
                handle_failure(mailbox, audit, email, &e, opts.dry_run);
                report.failed += 1;
                continue;
            }
        };
        debug!(expense_id = %expense.id, "created expense");

        if let Err(e) = store.add(&transaction, &expense) {
            // Leave the email read: retrying would duplicate the expense.
            error!(
                expense_id = %expense.id,
                hash = %transaction.hash(),
                error = %e,
                "expense created but not recorded in the store, reconcile manually"
            );
            report.unrecorded.push(expense.clone());
        }
        if let Some(audit) = audit {
            audit.processed(email, &transaction, &expense);
        }
        report.created.push(expense);
    }

    if report.created.is_empty() {
        info!("no expenses were created");
    } else {
        info!(
            count = report.created.len(),
            total = report.total(),
            "created expenses"
        );
    }
    if !report.unrecorded.is_empty() {
        warn!(count = report.unrecorded.len(), "some expenses are missing from the store");
    }
    Ok(report)
}

/// One line of the offline export: the email and either its transaction or
/// the reason it did not parse.
#[derive(Debug, Serialize)]
pub struct ExportEntry {
    pub email: EmailMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parse every unread notification without touching mailbox state and write
/// the results to `output` as a JSON array.
pub fn export_batch<M: Mailbox>(
    mailbox: &mut M,
    template: ReceiptTemplate,
    sender: &str,
    output: &Path,
) -> Result<Vec<ExportEntry>> {
    let emails = mailbox.fetch_unread(sender, false)?;
    let entries: Vec<ExportEntry> = emails
        .into_iter()
        .map(|email| match template.parse(&email) {
            Ok(t) => ExportEntry {
                email,
                transaction: Some(t),
                error: None,
            },
            Err(e) => ExportEntry {
                email,
                transaction: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(output, format!("{json}\n"))?;
    info!(count = entries.len(), path = %output.display(), "exported email transactions");
    Ok(entries)
}
