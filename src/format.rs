//! Display formatting shared by the screens.

use chrono::{DateTime, NaiveDateTime};

/// Format an amount the way the Indonesian locale does: `Rp 1.250.000`, with
/// a comma before the decimals when there are any (`Rp 12.500,5`).
pub fn format_rupiah(amount: f64) -> String {
    format!("Rp {}", format_number_id(amount))
}

pub fn format_number_id(amount: f64) -> String {
    if !amount.is_finite() {
        return "0".to_string();
    }
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let fraction = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative && cents > 0 {
        out.push('-');
    }
    out.push_str(&grouped);
    if fraction > 0 {
        let decimals = format!("{fraction:02}");
        out.push(',');
        out.push_str(decimals.trim_end_matches('0'));
    }
    out
}

/// Render a transaction timestamp as `01 October 2026, 09:15`. The backend
/// sends MySQL `DATETIME` text; RFC 3339 is accepted too. Anything else is
/// shown as-is.
pub fn format_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();
    let parsed = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.naive_local())
        });
    match parsed {
        Some(dt) => dt.format("%d %B %Y, %H:%M").to_string(),
        None => trimmed.to_string(),
    }
}
