use chrono::NaiveDate;
use rust_decimal::Decimal;

pub const PLACEHOLDER: &str = "N/A";

/// Format a money amount with two decimal places and thousands separators
pub fn format_money(value: Decimal, currency_symbol: &str) -> String {
    let rounded = format!("{:.2}", value.round_dp(2));
    let (whole, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let negative = whole.starts_with('-');
    let digits = whole.trim_start_matches('-');
    let grouped = group_digits(digits);

    if negative {
        format!("-{}{}.{}", currency_symbol, grouped, frac)
    } else {
        format!("{}{}.{}", currency_symbol, grouped, frac)
    }
}

/// Whole-unit amount right-aligned for table columns, e.g. `$ 1,250`.
pub fn format_whole_money(value: Decimal, currency_symbol: &str) -> String {
    let rounded = value.round_dp(0).normalize().to_string();
    let negative = rounded.starts_with('-');
    let mut grouped = group_digits(rounded.trim_start_matches('-'));
    if negative {
        grouped.insert(0, '-');
    }
    format!("{}{:>6}", currency_symbol, grouped)
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

/// Tax percentage without trailing zeros (`21`, `8.25`).
pub fn format_percent(value: Decimal) -> String {
    format!("{}%", value.normalize())
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%B %d, %Y").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}
