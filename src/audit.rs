use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::error::Result;
use crate::models::{EmailMessage, ExpenseRef, Transaction};

const PROCESSED_LOG: &str = "processed.log";
const ERRORED_LOG: &str = "errored.log";

/// JSON-lines trail of created expenses and failed emails, kept next to the
/// store for manual reconciliation.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn processed_path(&self) -> PathBuf {
        self.dir.join(PROCESSED_LOG)
    }

    pub fn errored_path(&self) -> PathBuf {
        self.dir.join(ERRORED_LOG)
    }

    pub fn processed(&self, email: &EmailMessage, transaction: &Transaction, expense: &ExpenseRef) {
        let entry = json!({
            "processed_at": chrono::Local::now().to_rfc3339(),
            "expense_id": expense.id,
            "expense_created_by_id": expense.created_by.id,
            "expense_created_by_email": expense.created_by.email,
            "transaction": transaction,
            "email_sender": email.sender,
        });
        self.write(&self.processed_path(), &entry);
    }

    pub fn errored(&self, email: &EmailMessage, error: &str) {
        let entry = json!({ "email": email, "error": error });
        self.write(&self.errored_path(), &entry);
    }

    /// Audit failures are reported but never interrupt a batch.
    fn write<T: Serialize>(&self, path: &Path, entry: &T) {
        if let Err(e) = append_line(path, entry) {
            warn!(path = %path.display(), error = %e, "failed to write audit log");
        }
    }
}

fn append_line<T: Serialize>(path: &Path, entry: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(entry)?;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{email_with_body, expense_ref, sample_transaction};

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_processed_entries_append() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(&dir.path().join("logs"));
        let email = email_with_body("body");
        let txn = sample_transaction();
        audit.processed(&email, &txn, &expense_ref("1"));
        audit.processed(&email, &txn, &expense_ref("2"));

        let lines = read_lines(&audit.processed_path());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["expense_id"], "2");
        assert_eq!(lines[0]["expense_created_by_email"], "test@example.com");
        assert_eq!(lines[0]["transaction"]["hash"], txn.hash());
        assert_eq!(lines[0]["email_sender"], email.sender);
    }

    #[test]
    fn test_errored_entry_keeps_email() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        let email = email_with_body("no amount here");
        audit.errored(&email, "No amount found in the email");

        let lines = read_lines(&audit.errored_path());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["email"]["uid"], email.uid);
        assert_eq!(lines[0]["email"]["body"], "no amount here");
        assert_eq!(lines[0]["error"], "No amount found in the email");
    }
}
