use std::collections::{BTreeMap, BTreeSet};

use chrono::{Months, NaiveDate};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::models::Expense;

pub const PAYMENT: &str = "Payment";
pub const UNCATEGORIZED: &str = "Uncategorized";

// ---------------------------------------------------------------------------
// Date range helpers
// ---------------------------------------------------------------------------

/// `YYYY-MM` to the first day of that month.
pub fn parse_month(month: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| SyncError::Other(format!("Invalid month: {month}. Use YYYY-MM format.")))
}

/// Half-open `[start, end)` covering `periods` months that end with the month
/// starting at `first_of_month`.
pub fn month_range(first_of_month: NaiveDate, periods: u32) -> Result<(NaiveDate, NaiveDate)> {
    if periods == 0 {
        return Err(SyncError::Other("periods must be at least 1".to_string()));
    }
    let out_of_range = || SyncError::Other(format!("month out of range: {first_of_month}"));
    let end = first_of_month
        .checked_add_months(Months::new(1))
        .ok_or_else(out_of_range)?;
    let start = first_of_month
        .checked_sub_months(Months::new(periods - 1))
        .ok_or_else(out_of_range)?;
    Ok((start, end))
}

// ---------------------------------------------------------------------------
// Category summary
// ---------------------------------------------------------------------------

pub struct CategoryItem {
    pub name: String,
    pub total: f64,
}

pub struct CurrencySummary {
    pub currency_code: String,
    /// Counted in the total, largest first.
    pub included: Vec<CategoryItem>,
    /// Shown but never counted, largest first.
    pub excluded: Vec<CategoryItem>,
    pub total: f64,
    pub excluded_total: f64,
}

impl CurrencySummary {
    /// Each side's share of a two-party even split.
    pub fn half(&self) -> f64 {
        self.total / 2.0
    }

    pub fn grand_total(&self) -> f64 {
        self.total + self.excluded_total
    }

    pub fn percentage(&self, amount: f64) -> f64 {
        if self.total > 0.0 {
            amount / self.total * 100.0
        } else {
            0.0
        }
    }
}

fn category_name(expense: &Expense) -> &str {
    if expense.payment {
        return PAYMENT;
    }
    match expense.category.as_deref() {
        Some(name) if !name.trim().is_empty() => name,
        _ => UNCATEGORIZED,
    }
}

fn sorted_items(totals: BTreeMap<String, f64>) -> Vec<CategoryItem> {
    let mut items: Vec<CategoryItem> = totals
        .into_iter()
        .map(|(name, total)| CategoryItem { name, total })
        .collect();
    items.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    items
}

/// Group expenses per currency and category. `Payment` is always treated as
/// excluded on top of `exclude`.
pub fn category_summary(expenses: &[Expense], exclude: &BTreeSet<String>) -> Vec<CurrencySummary> {
    let mut included: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    let mut excluded: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();

    for expense in expenses {
        let name = category_name(expense);
        debug!(
            category = name,
            currency = %expense.currency_code,
            cost = expense.cost,
            payment = expense.payment,
            "summarizing expense"
        );
        let bucket = if name == PAYMENT || exclude.contains(name) {
            &mut excluded
        } else {
            &mut included
        };
        *bucket
            .entry(expense.currency_code.clone())
            .or_default()
            .entry(name.to_string())
            .or_insert(0.0) += expense.cost;
    }

    let currencies: BTreeSet<String> = included.keys().chain(excluded.keys()).cloned().collect();
    currencies
        .into_iter()
        .map(|code| {
            let inc = sorted_items(included.remove(&code).unwrap_or_default());
            let exc = sorted_items(excluded.remove(&code).unwrap_or_default());
            CurrencySummary {
                total: inc.iter().map(|i| i.total).sum(),
                excluded_total: exc.iter().map(|i| i.total).sum(),
                currency_code: code,
                included: inc,
                excluded: exc,
            }
        })
        .collect()
}
