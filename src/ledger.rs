use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Result, SyncError};
use crate::models::{Expense, ExpenseFilter, ExpenseRef, Identity, NewExpense, Share};

/// The shared-expense service that owns the real records and split bookkeeping.
pub trait Ledger {
    fn current_user(&self) -> Result<Identity>;
    fn create_expense(&mut self, expense: &NewExpense) -> Result<ExpenseRef>;
    fn delete_expense(&mut self, id: &str) -> Result<()>;
    fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>>;
    /// Liveness probe; never errors, only reports.
    fn check_systems(&self) -> bool;
}

pub fn validate_new_expense(expense: &NewExpense) -> Result<()> {
    if !expense.cost.is_finite() || expense.cost < 0.0 {
        return Err(SyncError::ExpenseCreation(format!("invalid cost: {}", expense.cost)));
    }
    if expense.description.trim().is_empty() {
        return Err(SyncError::ExpenseCreation("description is empty".to_string()));
    }
    Ok(())
}

/// Does `expense` pass every constraint in `filter` except the limit?
pub fn matches_filter(expense: &Expense, filter: &ExpenseFilter) -> bool {
    let day = expense.date.date_naive();
    if filter.dated_after.is_some_and(|after| day < after) {
        return false;
    }
    if filter.dated_before.is_some_and(|before| day >= before) {
        return false;
    }
    if let Some(friend) = &filter.friend_id {
        if !expense.users.iter().any(|u| &u.user_id == friend) {
            return false;
        }
    }
    true
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Book {
    next_id: u64,
    expenses: Vec<Expense>,
}

/// Ledger kept as one JSON file on disk, rewritten on every mutation.
#[derive(Debug)]
pub struct JournalLedger {
    path: PathBuf,
    user: Identity,
    book: Book,
}

impl JournalLedger {
    pub fn open(path: &Path, user: Identity) -> Result<Self> {
        let book = load_book(path)?;
        debug!(path = %path.display(), count = book.expenses.len(), "opened journal ledger");
        Ok(Self {
            path: path.to_path_buf(),
            user,
            book,
        })
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.book)?;
        std::fs::write(&self.path, format!("{json}\n"))?;
        Ok(())
    }
}

fn load_book(path: &Path) -> Result<Book> {
    if !path.exists() {
        return Ok(Book {
            next_id: 1,
            expenses: Vec::new(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| SyncError::Ledger(format!("cannot read ledger {}: {e}", path.display())))
}

impl Ledger for JournalLedger {
    fn current_user(&self) -> Result<Identity> {
        Ok(self.user.clone())
    }

    fn create_expense(&mut self, expense: &NewExpense) -> Result<ExpenseRef> {
        validate_new_expense(expense)?;
        let (payer_owed, friend_owed) = expense.split.shares(expense.cost);
        let record = Expense {
            id: self.book.next_id.max(1).to_string(),
            cost: expense.cost,
            currency_code: expense.currency_code.clone(),
            description: expense.description.clone(),
            details: expense.details.clone(),
            date: expense.date,
            category: expense.category_id.clone(),
            payment: false,
            created_by: self.user.clone(),
            users: vec![
                Share {
                    user_id: self.user.id.clone(),
                    paid_share: expense.cost,
                    owed_share: payer_owed,
                },
                Share {
                    user_id: expense.split.friend_id.clone(),
                    paid_share: 0.0,
                    owed_share: friend_owed,
                },
            ],
        };
        self.book.next_id = self.book.next_id.max(1) + 1;
        let created = record.to_ref();
        self.book.expenses.push(record);
        self.save()?;
        debug!(id = %created.id, "expense created");
        Ok(created)
    }

    fn delete_expense(&mut self, id: &str) -> Result<()> {
        let before = self.book.expenses.len();
        self.book.expenses.retain(|e| e.id != id);
        if self.book.expenses.len() == before {
            return Err(SyncError::Ledger(format!("No expense with id {id}")));
        }
        self.save()
    }

    fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let mut found: Vec<Expense> = self
            .book
            .expenses
            .iter()
            .filter(|e| matches_filter(e, filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.date.cmp(&a.date));
        if let Some(limit) = filter.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    fn check_systems(&self) -> bool {
        match load_book(&self.path) {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "ledger is not reachable");
                false
            }
        }
    }
}
