use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{ExpenseRef, ProcessedRecord, Transaction};

/// Hash-keyed record of every transaction that already has an expense.
///
/// The whole map is rewritten on each [`TransactionStore::add`]; volume is a
/// handful of charges a day. There is no locking, so two concurrent runs
/// against the same file can lose updates.
#[derive(Debug)]
pub struct TransactionStore {
    path: PathBuf,
    records: BTreeMap<String, ProcessedRecord>,
}

impl TransactionStore {
    /// Load the store, creating an empty file if none exists. A file that does
    /// not parse is left on disk untouched and the store starts empty.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            info!(path = %path.display(), "transaction store missing, creating a new one");
            std::fs::write(path, "{}\n")?;
        }

        let content = std::fs::read(path)?;
        let records = match serde_json::from_slice::<BTreeMap<String, ProcessedRecord>>(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to decode transaction store, starting with an empty store"
                );
                BTreeMap::new()
            }
        };
        debug!(count = records.len(), "loaded transaction store");

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.records.contains_key(hash)
    }

    pub fn get(&self, hash: &str) -> Option<&ProcessedRecord> {
        self.records.get(hash)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record a created expense and persist the full store. Re-adding a hash
    /// replaces the earlier record.
    pub fn add(&mut self, transaction: &Transaction, expense: &ExpenseRef) -> Result<()> {
        let record = ProcessedRecord {
            transaction: transaction.clone(),
            expense_id: expense.id.clone(),
            processed_at: chrono::Local::now().to_rfc3339(),
            created_by_id: expense.created_by.id.clone(),
            created_by_email: expense.created_by.email.clone(),
        };
        self.records.insert(transaction.hash().to_string(), record);
        self.save()
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.path, format!("{json}\n"))?;
        Ok(())
    }
}
