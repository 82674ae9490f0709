struct CurrencyFormat {
    symbol: &'static str,
    thousands_sep: char,
    decimal_sep: char,
    precision: usize,
}

const DEFAULT_FORMAT: CurrencyFormat = CurrencyFormat {
    symbol: "$",
    thousands_sep: ',',
    decimal_sep: '.',
    precision: 2,
};

fn currency_format(code: &str) -> CurrencyFormat {
    match code {
        "CLP" => CurrencyFormat {
            symbol: "$",
            thousands_sep: '.',
            decimal_sep: ',',
            precision: 0,
        },
        "EUR" => CurrencyFormat {
            symbol: "€",
            thousands_sep: '.',
            decimal_sep: ',',
            precision: 2,
        },
        _ => DEFAULT_FORMAT,
    }
}

/// Format an amount with the separators and precision of its currency:
/// `1.234.567` for CLP, `1,234.56` for USD.
pub fn format_currency_amount(amount: f64, currency_code: &str) -> String {
    let fmt = currency_format(currency_code);
    let fixed = format!("{:.*}", fmt.precision, amount.abs());
    let negative = amount < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let (int_part, dec_part) = match fixed.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(fmt.thousands_sep);
        }
        grouped.push(c);
    }
    let mut out: String = grouped.chars().rev().collect();
    if let Some(dec) = dec_part {
        out.push(fmt.decimal_sep);
        out.push_str(dec);
    }
    if negative {
        out.insert(0, '-');
    }
    out
}

pub fn format_currency_symbol(currency_code: &str) -> String {
    format!("{currency_code} {}", currency_format(currency_code).symbol)
}

/// `CLP $ 1.190`
pub fn money(amount: f64, currency_code: &str) -> String {
    format!(
        "{} {}",
        format_currency_symbol(currency_code),
        format_currency_amount(amount, currency_code)
    )
}
