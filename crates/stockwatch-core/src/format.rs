//! Display formatting for prices, magnitudes and signed changes.
//!
//! Every function here is pure and total.

use crate::{Symbol, UtcDateTime};

/// Tickers the dashboard suggests before any search has run.
pub const COMMON_STOCK_SYMBOLS: [&str; 24] = [
    "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "META", "NVDA", "NFLX", "AMD", "INTC", "CRM", "ADBE",
    "PYPL", "UBER", "SPOT", "ZM", "SQ", "ROKU", "PINS", "SNAP", "TWTR", "DIS", "NKE", "WMT",
];

const MAGNITUDES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

/// Presentation tone for a signed value; zero counts as positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTone {
    Positive,
    Negative,
}

impl ChangeTone {
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Positive => "text-positive",
            Self::Negative => "text-negative",
        }
    }
}

pub fn change_tone(value: f64) -> ChangeTone {
    if value >= 0.0 {
        ChangeTone::Positive
    } else {
        ChangeTone::Negative
    }
}

/// Compact magnitude: `2.5B`, `1.2K`, or the plain number below one thousand.
pub fn format_number(value: f64) -> String {
    for (threshold, suffix) in MAGNITUDES {
        if value >= threshold {
            return format!("{:.1}{suffix}", value / threshold);
        }
    }
    format!("{value}")
}

/// US-dollar amount with two decimals and thousands separators.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let is_zero = whole.bytes().all(|b| b == b'0') && cents.bytes().all(|b| b == b'0');
    let sign = if amount < 0.0 && !is_zero { "-" } else { "" };
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// Signed percentage with two decimals: `+1.01%`, `-3.46%`.
pub fn format_percentage(value: f64) -> String {
    if value >= 0.0 {
        format!("+{:.2}%", value.abs())
    } else {
        format!("{value:.2}%")
    }
}

/// Coarse age of a timestamp relative to `now`.
pub fn format_time_ago(then: UtcDateTime, now: UtcDateTime) -> String {
    let seconds = then.seconds_until(now);
    if seconds < 60 {
        String::from("Just now")
    } else if seconds < 3_600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3_600)
    } else {
        format!("{}d ago", seconds / 86_400)
    }
}

/// Trim, uppercase and strip everything except letters, digits and spaces.
pub fn sanitize_search_input(input: &str) -> String {
    input
        .trim()
        .to_ascii_uppercase()
        .chars()
        .filter(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || *ch == ' ')
        .collect()
}

pub fn is_valid_stock_symbol(input: &str) -> bool {
    Symbol::parse(input).is_ok()
}

pub fn is_common_stock(input: &str) -> bool {
    let upper = input.to_ascii_uppercase();
    COMMON_STOCK_SYMBOLS.contains(&upper.as_str())
}

/// Stable element id for a stock card.
pub fn stock_card_id(symbol: &Symbol) -> String {
    format!("stock-card-{}", symbol.as_str().to_ascii_lowercase())
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
