use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_CURRENCY: &str = "CLP";

/// Offset the source bank prints its timestamps in (America/Santiago, standard time).
const SANTIAGO_UTC_OFFSET_SECS: i32 = 4 * 3600;

pub fn santiago_offset() -> FixedOffset {
    FixedOffset::west_opt(SANTIAGO_UTC_OFFSET_SECS).expect("valid Santiago offset")
}

/// One bank charge extracted from a notification email.
///
/// Fields are private so the hash computed in [`Transaction::new`] can never go
/// stale. Two transactions with the same cost, merchant, date and card suffix
/// share a hash regardless of currency, note or category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransactionRecord", into = "TransactionRecord")]
pub struct Transaction {
    cost: f64,
    currency_code: String,
    date: DateTime<FixedOffset>,
    description: String,
    card_number: String,
    details: String,
    category_id: Option<String>,
    hash: String,
}

impl Transaction {
    pub fn new(
        cost: f64,
        currency_code: impl Into<String>,
        date: DateTime<FixedOffset>,
        description: impl Into<String>,
        card_number: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        let description = description.into();
        let card_number = card_number.into();
        let hash = content_hash(cost, &description, &date, &card_number);
        Self {
            cost,
            currency_code: currency_code.into(),
            date,
            description,
            card_number,
            details: details.into(),
            category_id: None,
            hash,
        }
    }

    /// Returns a copy carrying a category. The hash is unaffected.
    pub fn with_category(self, category_id: impl Into<String>) -> Self {
        Self {
            category_id: Some(category_id.into()),
            ..self
        }
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    pub fn date(&self) -> DateTime<FixedOffset> {
        self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn card_number(&self) -> &str {
        &self.card_number
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn category_id(&self) -> Option<&str> {
        self.category_id.as_deref()
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn cost_str(&self) -> String {
        format!("{:.2}", self.cost)
    }

    pub fn date_str(&self) -> String {
        self.date.to_rfc3339()
    }

    pub fn hash_input(&self) -> String {
        hash_input(self.cost, &self.description, &self.date, &self.card_number)
    }
}

fn hash_input(cost: f64, description: &str, date: &DateTime<FixedOffset>, card_number: &str) -> String {
    // Float literal form keeps `1190.0` distinct from an integer rendering.
    format!(
        "{cost:?}_{description}_{}_{card_number}",
        date.format("%Y-%m-%d %H:%M:%S%:z")
    )
}

fn content_hash(cost: f64, description: &str, date: &DateTime<FixedOffset>, card_number: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(hash_input(cost, description, date, card_number).as_bytes());
    hex::encode(hasher.finalize())
}

/// Serialized shape of a [`Transaction`]. A stored `hash` is ignored on read and
/// recomputed from the fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransactionRecord {
    cost: f64,
    currency_code: String,
    date: DateTime<FixedOffset>,
    description: String,
    card_number: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    hash: String,
}

impl From<TransactionRecord> for Transaction {
    fn from(r: TransactionRecord) -> Self {
        let txn = Transaction::new(r.cost, r.currency_code, r.date, r.description, r.card_number, r.details);
        match r.category_id {
            Some(cat) => txn.with_category(cat),
            None => txn,
        }
    }
}

impl From<Transaction> for TransactionRecord {
    fn from(t: Transaction) -> Self {
        Self {
            cost: t.cost,
            currency_code: t.currency_code,
            date: t.date,
            description: t.description,
            card_number: t.card_number,
            details: t.details,
            category_id: t.category_id,
            hash: t.hash,
        }
    }
}

/// A message handed over by the mail collaborator. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub uid: String,
    pub subject: String,
    pub sender: String,
    #[serde(default)]
    pub to: Vec<String>,
    pub date: DateTime<FixedOffset>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// What the ledger hands back after creating an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRef {
    pub id: String,
    pub cost: f64,
    pub created_by: Identity,
}

/// Two-party split: the authenticated user pays everything and owes `ratio` of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub ratio: f64,
    pub friend_id: String,
}

impl Split {
    pub const DEFAULT_RATIO: f64 = 0.5;

    /// Returns `(payer_owed, friend_owed)`; the two always sum to `cost`.
    pub fn shares(&self, cost: f64) -> (f64, f64) {
        let payer = (cost * self.ratio * 100.0).round() / 100.0;
        (payer, cost - payer)
    }
}

/// Expense request built from a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub cost: f64,
    pub description: String,
    pub date: DateTime<FixedOffset>,
    pub details: String,
    pub currency_code: String,
    pub category_id: Option<String>,
    pub split: Split,
}

impl NewExpense {
    pub fn from_transaction(txn: &Transaction, split: Split) -> Self {
        Self {
            cost: txn.cost(),
            description: txn.description().to_string(),
            date: txn.date(),
            details: txn.details().to_string(),
            currency_code: txn.currency_code().to_string(),
            category_id: txn.category_id().map(str::to_string),
            split,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub user_id: String,
    pub paid_share: f64,
    pub owed_share: f64,
}

/// An expense as listed by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub cost: f64,
    pub currency_code: String,
    pub description: String,
    #[serde(default)]
    pub details: String,
    pub date: DateTime<FixedOffset>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub payment: bool,
    pub created_by: Identity,
    #[serde(default)]
    pub users: Vec<Share>,
}

impl Expense {
    pub fn to_ref(&self) -> ExpenseRef {
        ExpenseRef {
            id: self.id.clone(),
            cost: self.cost,
            created_by: self.created_by.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub dated_after: Option<NaiveDate>,
    pub dated_before: Option<NaiveDate>,
    pub friend_id: Option<String>,
    pub limit: Option<usize>,
}

/// Audit entry written to the transaction store after an expense is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub transaction: Transaction,
    pub expense_id: String,
    pub processed_at: String,
    pub created_by_id: String,
    pub created_by_email: String,
}
