use std::path::Path;

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::error::{Result, SyncError};
use crate::ledger::{matches_filter, validate_new_expense, Ledger};
use crate::mailbox::Mailbox;
use crate::models::{
    santiago_offset, EmailMessage, Expense, ExpenseFilter, ExpenseRef, Identity, NewExpense, Share, Split,
    Transaction,
};

pub const BANK_SENDER: &str = "Banco de Chile <enviodigital@bancoedwards.cl>";

pub const RECEIPT_BODY: &str = "Te informamos que se ha realizado una compra por $1.190 con Tarjeta ****7766 \
    en SPID MUT - O871 SANTIAGO CHL el 19/04/2025 14:33. Revisa Saldos y Movimientos.";

pub fn at(year: i32, month: u32, day: u32) -> DateTime<FixedOffset> {
    santiago_offset()
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .unwrap()
}

pub fn identity() -> Identity {
    Identity {
        id: "1".to_string(),
        email: "test@example.com".to_string(),
    }
}

pub fn email(uid: &str, body: &str) -> EmailMessage {
    EmailMessage {
        uid: uid.to_string(),
        subject: "Compra con tu Tarjeta".to_string(),
        sender: BANK_SENDER.to_string(),
        to: vec!["user@example.com".to_string()],
        date: santiago_offset().with_ymd_and_hms(2025, 4, 19, 14, 40, 0).unwrap(),
        body: body.to_string(),
    }
}

pub fn email_with_body(body: &str) -> EmailMessage {
    email("123456789", body)
}

pub fn sample_transaction() -> Transaction {
    Transaction::new(10.99, "USD", at(2025, 4, 19), "Test Merchant", "1234", "Test purchase")
}

pub fn expense_ref(id: &str) -> ExpenseRef {
    ExpenseRef {
        id: id.to_string(),
        cost: 10.99,
        created_by: identity(),
    }
}

pub fn new_expense(cost: f64, description: &str, date: DateTime<FixedOffset>) -> NewExpense {
    NewExpense {
        cost,
        description: description.to_string(),
        date,
        details: String::new(),
        currency_code: "CLP".to_string(),
        category_id: None,
        split: Split {
            ratio: 0.5,
            friend_id: "42".to_string(),
        },
    }
}

pub fn listed_expense(id: &str, cost: f64, currency: &str, category: Option<&str>, date: DateTime<FixedOffset>) -> Expense {
    Expense {
        id: id.to_string(),
        cost,
        currency_code: currency.to_string(),
        description: format!("expense {id}"),
        details: String::new(),
        date,
        category: category.map(str::to_string),
        payment: false,
        created_by: identity(),
        users: vec![
            Share {
                user_id: "1".to_string(),
                paid_share: cost,
                owed_share: cost / 2.0,
            },
            Share {
                user_id: "42".to_string(),
                paid_share: 0.0,
                owed_share: cost / 2.0,
            },
        ],
    }
}

/// Drop a plain-text notification into `root/sub/name`.
pub fn write_maildir_message(root: &Path, sub: &str, name: &str, from: &str, body: &str) {
    let raw = format!(
        "From: Banco de Chile <{from}>\r\n\
         To: user@example.com\r\n\
         Subject: Compra con tu Tarjeta\r\n\
         Date: Sat, 19 Apr 2025 14:40:00 -0400\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         {body}\r\n"
    );
    let dir = root.join(sub);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), raw).unwrap();
}

/// In-memory mailbox that records what the batch asked of it.
#[derive(Debug, Default)]
pub struct FakeMailbox {
    pub messages: Vec<EmailMessage>,
    pub fetched_with_mark_read: bool,
    pub unread_marks: Vec<String>,
    pub fail_fetch: bool,
}

impl FakeMailbox {
    pub fn with(messages: Vec<EmailMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

impl Mailbox for FakeMailbox {
    fn fetch_unread(&mut self, _sender: &str, mark_as_read: bool) -> Result<Vec<EmailMessage>> {
        if self.fail_fetch {
            return Err(SyncError::Mail("connection refused".to_string()));
        }
        self.fetched_with_mark_read = mark_as_read;
        Ok(self.messages.clone())
    }

    fn mark_unread(&mut self, uid: &str) -> Result<()> {
        self.unread_marks.push(uid.to_string());
        Ok(())
    }
}

/// In-memory ledger with an optional failure switch.
#[derive(Debug, Default)]
pub struct FakeLedger {
    pub created: Vec<NewExpense>,
    pub expenses: Vec<Expense>,
    pub fail_create: bool,
}

impl FakeLedger {
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }
}

impl Ledger for FakeLedger {
    fn current_user(&self) -> Result<Identity> {
        Ok(identity())
    }

    fn create_expense(&mut self, expense: &NewExpense) -> Result<ExpenseRef> {
        if self.fail_create {
            return Err(SyncError::Ledger("service unavailable".to_string()));
        }
        validate_new_expense(expense)?;
        self.created.push(expense.clone());
        Ok(ExpenseRef {
            id: self.created.len().to_string(),
            cost: expense.cost,
            created_by: identity(),
        })
    }

    fn delete_expense(&mut self, id: &str) -> Result<()> {
        let before = self.expenses.len();
        self.expenses.retain(|e| e.id != id);
        if self.expenses.len() == before {
            return Err(SyncError::Ledger(format!("No expense with id {id}")));
        }
        Ok(())
    }

    fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let mut found: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|e| matches_filter(e, filter))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    fn check_systems(&self) -> bool {
        !self.fail_create
    }
}
