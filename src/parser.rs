use std::borrow::Cow;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use regex::Regex;
use scraper::Html;

use crate::error::{ExtractionError, Field, Result, SyncError};
use crate::models::{santiago_offset, EmailMessage, Transaction, DEFAULT_CURRENCY};

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Z]{2,3})?\$\s*([.\d]+)(,\d{2})?").expect("invalid amount regex"))
}

fn card_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*{4}(\d{4})").expect("invalid card regex"))
}

fn merchant_narrow_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"en ([^e]+?) el").expect("invalid merchant regex"))
}

fn merchant_wide_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"en (.+?) el").expect("invalid merchant regex"))
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"el (\d{2}/\d{2}/\d{4} \d{2}:\d{2})").expect("invalid date regex"))
}

fn snippet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(una compra por .+)\. Revisa").expect("invalid snippet regex"))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn looks_like_html(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    ["<html", "<body", "<div", "<p>", "<br", "<table"]
        .iter()
        .any(|tag| lower.contains(tag))
}

/// Visible text of an HTML body, one space between text nodes.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    doc.root_element()
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_body(body: &str) -> Cow<'_, str> {
    if looks_like_html(body) {
        Cow::Owned(html_to_text(body))
    } else {
        Cow::Borrowed(body)
    }
}

/// Latin-American amount: `.` groups thousands, `,` marks decimals.
pub fn parse_amount(integer: &str, decimals: Option<&str>) -> Option<f64> {
    let mut raw = integer.replace('.', "");
    if let Some(dec) = decimals {
        raw.push_str(dec);
    }
    raw.replace(',', ".").parse().ok()
}

fn normalize_currency(prefix: &str) -> String {
    match prefix {
        "US" => "USD".to_string(),
        other => other.to_string(),
    }
}

pub fn extract_amount(text: &str) -> Option<(f64, String)> {
    let caps = amount_re().captures(text)?;
    let amount = parse_amount(caps.get(2)?.as_str(), caps.get(3).map(|m| m.as_str()))?;
    let currency = caps
        .get(1)
        .map(|m| normalize_currency(m.as_str()))
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    Some((amount, currency))
}

pub fn extract_card(text: &str) -> Option<String> {
    card_re().captures(text).map(|c| c[1].to_string())
}

pub fn extract_merchant(text: &str) -> Option<String> {
    merchant_narrow_re()
        .captures(text)
        .or_else(|| merchant_wide_re().captures(text))
        .map(|c| c[1].trim().to_string())
        .filter(|m| !m.is_empty())
}

/// Charge timestamp as printed by the bank, pinned to the Santiago offset.
///
/// There is no fallback to the email's own `Date` header: the notification can
/// arrive hours after the charge, and a guessed date would change the dedup hash.
pub fn extract_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let caps = date_re().captures(text)?;
    let naive = NaiveDateTime::parse_from_str(&caps[1], "%d/%m/%Y %H:%M").ok()?;
    santiago_offset().from_local_datetime(&naive).single()
}

pub fn extract_snippet(text: &str) -> Option<String> {
    snippet_re().captures(text).map(|c| c[1].trim().to_string())
}

// ---------------------------------------------------------------------------
// Templates — enum dispatch, one variant per sender layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRule {
    pub field: Field,
    pub required: bool,
}

const fn required(field: Field) -> ExtractionRule {
    ExtractionRule { field, required: true }
}

const fn optional(field: Field) -> ExtractionRule {
    ExtractionRule { field, required: false }
}

const BANCO_CHILE_RULES: &[ExtractionRule] = &[
    required(Field::Amount),
    required(Field::Card),
    required(Field::Merchant),
    required(Field::Date),
    optional(Field::Snippet),
];

#[derive(Default)]
struct Draft {
    amount: Option<(f64, String)>,
    card: Option<String>,
    merchant: Option<String>,
    date: Option<DateTime<FixedOffset>>,
    snippet: Option<String>,
}

impl Draft {
    fn has(&self, field: Field) -> bool {
        match field {
            Field::Amount => self.amount.is_some(),
            Field::Card => self.card.is_some(),
            Field::Merchant => self.merchant.is_some(),
            Field::Date => self.date.is_some(),
            Field::Snippet => self.snippet.is_some(),
        }
    }

    fn finish(self) -> std::result::Result<Transaction, ExtractionError> {
        let missing = |field| ExtractionError { field };
        let (cost, currency) = self.amount.ok_or(missing(Field::Amount))?;
        let card = self.card.ok_or(missing(Field::Card))?;
        let merchant = self.merchant.ok_or(missing(Field::Merchant))?;
        let date = self.date.ok_or(missing(Field::Date))?;
        Ok(Transaction::new(
            cost,
            currency,
            date,
            merchant,
            card,
            self.snippet.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptTemplate {
    BancoChile,
}

const ALL_TEMPLATES: &[ReceiptTemplate] = &[ReceiptTemplate::BancoChile];

impl ReceiptTemplate {
    pub fn key(&self) -> &'static str {
        match self {
            Self::BancoChile => "banco_chile",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BancoChile => "Banco de Chile purchase notification",
        }
    }

    pub fn rules(&self) -> &'static [ExtractionRule] {
        match self {
            Self::BancoChile => BANCO_CHILE_RULES,
        }
    }

    /// Fill the draft slot for `field` from `text`.
    fn extract(&self, field: Field, text: &str, draft: &mut Draft) {
        match self {
            Self::BancoChile => match field {
                Field::Amount => draft.amount = extract_amount(text),
                Field::Card => draft.card = extract_card(text),
                Field::Merchant => draft.merchant = extract_merchant(text),
                Field::Date => draft.date = extract_date(text),
                Field::Snippet => draft.snippet = extract_snippet(text),
            },
        }
    }

    /// Parse a notification into a transaction. Pure: the same body always
    /// yields the same transaction, and a missing required field is an error
    /// naming that field rather than a partial result.
    pub fn parse(&self, email: &EmailMessage) -> std::result::Result<Transaction, ExtractionError> {
        let text = normalize_body(&email.body);
        let mut draft = Draft::default();
        for rule in self.rules() {
            self.extract(rule.field, &text, &mut draft);
            if rule.required && !draft.has(rule.field) {
                return Err(ExtractionError { field: rule.field });
            }
        }
        draft.finish()
    }
}

pub fn get_by_key(key: &str) -> Result<ReceiptTemplate> {
    ALL_TEMPLATES
        .iter()
        .find(|t| t.key() == key)
        .copied()
        .ok_or_else(|| SyncError::Settings(format!("Unknown receipt template: {key}")))
}
