use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};
use tracing::info;

use crate::cli::open_ledger;
use crate::error::{Result, SyncError};
use crate::fmt::money;
use crate::ledger::Ledger;
use crate::models::ExpenseFilter;
use crate::reports::{self, CurrencySummary, PAYMENT};
use crate::settings::{Config, Credentials};

pub struct SummaryArgs {
    pub month: Option<String>,
    pub periods: u32,
    pub friend_id: Option<String>,
    pub limit: usize,
    pub exclude: Vec<String>,
}

fn current_month() -> NaiveDate {
    let today = chrono::Local::now().date_naive();
    today.with_day(1).unwrap_or(today)
}

pub fn run(config: &Config, args: SummaryArgs) -> Result<()> {
    let first = match &args.month {
        Some(m) => reports::parse_month(m)?,
        None => current_month(),
    };
    let (start, end) = reports::month_range(first, args.periods)?;
    info!(%start, %end, "summarizing expenses");

    let creds = Credentials::from_env()?;
    let ledger = open_ledger(config, &creds)?;
    if !ledger.check_systems() {
        return Err(SyncError::Ledger("Failed to connect to the ledger".to_string()));
    }

    let filter = ExpenseFilter {
        dated_after: Some(start),
        dated_before: Some(end),
        friend_id: Some(args.friend_id.unwrap_or_else(|| config.split.friend_id.clone())),
        limit: Some(args.limit),
    };
    let expenses = ledger.list_expenses(&filter)?;
    info!(count = expenses.len(), "retrieved expenses");

    let mut exclude: BTreeSet<String> = args.exclude.into_iter().collect();
    exclude.insert(PAYMENT.to_string());
    info!(categories = ?exclude, "excluding categories from totals");

    let summary = reports::category_summary(&expenses, &exclude);
    if summary.is_empty() {
        println!("No expenses found for the specified period.");
        return Ok(());
    }
    println!("{}", format_summary(&summary, start, end));
    Ok(())
}

fn format_currency(s: &CurrencySummary) -> String {
    let code = s.currency_code.as_str();
    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount", "Share", ""]);

    for item in &s.included {
        table.add_row(vec![
            Cell::new(&item.name),
            Cell::new(money(item.total, code)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", s.percentage(item.total))).set_alignment(CellAlignment::Right),
            Cell::new(""),
        ]);
    }

    if !s.excluded.is_empty() {
        table.add_row(vec![Cell::new("EXCLUDED".yellow().bold()), Cell::new(""), Cell::new(""), Cell::new("")]);
        for item in &s.excluded {
            table.add_row(vec![
                Cell::new(format!("  {}", item.name)),
                Cell::new(money(item.total, code)).set_alignment(CellAlignment::Right),
                Cell::new("-").set_alignment(CellAlignment::Right),
                Cell::new("(excluded)"),
            ]);
        }
        table.add_row(vec![
            Cell::new("Excluded total"),
            Cell::new(money(s.excluded_total, code)).set_alignment(CellAlignment::Right),
            Cell::new(""),
            Cell::new(""),
        ]);
    }

    table.add_row(vec![
        Cell::new("TOTAL".bold()),
        Cell::new(money(s.total, code).bold()).set_alignment(CellAlignment::Right),
        Cell::new("100.0%").set_alignment(CellAlignment::Right),
        Cell::new(""),
    ]);
    if s.excluded_total > 0.0 {
        table.add_row(vec![
            Cell::new("Grand total (with excluded)"),
            Cell::new(money(s.grand_total(), code)).set_alignment(CellAlignment::Right),
            Cell::new(""),
            Cell::new(""),
        ]);
    }

    format!(
        "{}\n{table}\nhalf = {}",
        format!("Expense summary by category [{code}]").bold(),
        money(s.half(), code)
    )
}

pub fn format_summary(summary: &[CurrencySummary], start: NaiveDate, end: NaiveDate) -> String {
    let mut out = format!("{start} to {end} (exclusive)");
    for s in summary {
        out.push_str("\n\n");
        out.push_str(&format_currency(s));
    }
    out
}
