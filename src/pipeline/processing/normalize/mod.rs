//! Cell value normalization.
//!
//! Every function here is total: malformed input never fails, it falls back to
//! a safe default (`0` for numbers and percentages, `None` for dates and
//! strings). The fallback is not silent to the caller though: each result
//! carries a [`CellQuality`] so the pipeline can count degraded cells.

pub mod date;

use serde::{Deserialize, Serialize};

use crate::constants::PLACEHOLDER_TOKENS;
use crate::types::CellValue;

pub use date::{normalize_date, parse_date_value};

/// Currency symbols stripped before numeric parsing
const CURRENCY_SYMBOLS: &[char] = &['€', '$', '£', '¥'];

/// How a cell fared during normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellQuality {
    /// Parsed as-is
    Clean,
    /// Nothing there; the default is the expected value
    Blank,
    /// Something was there but could not be parsed; the default was used
    Degraded,
}

/// A normalized value plus the quality of the cell it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub quality: CellQuality,
}

impl<T> Normalized<T> {
    fn clean(value: T) -> Self {
        Self { value, quality: CellQuality::Clean }
    }

    fn blank(value: T) -> Self {
        Self { value, quality: CellQuality::Blank }
    }

    fn degraded(value: T) -> Self {
        Self { value, quality: CellQuality::Degraded }
    }

    pub fn is_degraded(&self) -> bool {
        self.quality == CellQuality::Degraded
    }
}

/// The value families that can degrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Numeric,
    Percentage,
    Date,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Numeric => "numeric",
            ValueKind::Percentage => "percentage",
            ValueKind::Date => "date",
        }
    }
}

/// Per-kind counters of degraded cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedCells {
    pub numeric: usize,
    pub percentage: usize,
    pub date: usize,
}

impl DegradedCells {
    pub fn observe(&mut self, kind: ValueKind, quality: CellQuality) {
        if quality != CellQuality::Degraded {
            return;
        }
        match kind {
            ValueKind::Numeric => self.numeric += 1,
            ValueKind::Percentage => self.percentage += 1,
            ValueKind::Date => self.date += 1,
        }
    }

    pub fn merge(&mut self, other: &DegradedCells) {
        self.numeric += other.numeric;
        self.percentage += other.percentage;
        self.date += other.date;
    }

    pub fn total(&self) -> usize {
        self.numeric + self.percentage + self.date
    }
}

/// Parse a monetary/numeric cell.
///
/// Text handling follows the spreadsheet export convention seen in the data:
/// when both `,` and `.` are present the commas are thousands separators
/// (`€116,230.00`); a lone `,` is the decimal separator (`€116,23`).
pub fn normalize_numeric(cell: &CellValue) -> Normalized<f64> {
    match cell {
        CellValue::Empty => Normalized::blank(0.0),
        CellValue::Number(n) if n.is_finite() => Normalized::clean(*n),
        CellValue::Number(_) | CellValue::Bool(_) | CellValue::Error(_) => Normalized::degraded(0.0),
        CellValue::Text(s) if s.trim().is_empty() => Normalized::blank(0.0),
        CellValue::Text(s) => match parse_numeric_text(s) {
            Some(n) => Normalized::clean(n),
            None => Normalized::degraded(0.0),
        },
    }
}

fn parse_numeric_text(raw: &str) -> Option<f64> {
    let mut clean: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    if clean.contains(',') && clean.contains('.') {
        clean = clean.replace(',', "");
    } else if clean.contains(',') {
        clean = clean.replacen(',', ".", 1);
    }

    let clean: String = clean
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    parse_float_prefix(&clean)
}

/// Parse a completion-percentage cell.
///
/// Native numbers up to 1 are fractions and get scaled by 100; larger numbers
/// are already percentages. Text loses its `%` sign before parsing.
pub fn normalize_percentage(cell: &CellValue) -> Normalized<f64> {
    match cell {
        CellValue::Empty => Normalized::blank(0.0),
        CellValue::Number(n) if n.is_finite() => {
            if *n <= 1.0 {
                Normalized::clean(n * 100.0)
            } else {
                Normalized::clean(*n)
            }
        }
        CellValue::Number(_) | CellValue::Bool(_) | CellValue::Error(_) => Normalized::degraded(0.0),
        CellValue::Text(s) if s.trim().is_empty() => Normalized::blank(0.0),
        CellValue::Text(s) => match parse_float_prefix(&s.trim().replacen('%', "", 1)) {
            Some(n) => Normalized::clean(n),
            None => Normalized::degraded(0.0),
        },
    }
}

/// Trim a text cell and map placeholder tokens to `None`
pub fn clean_string(cell: &CellValue) -> Option<String> {
    let text = cell.as_text()?;
    let cleaned = text.trim();
    if cleaned.is_empty() || is_placeholder(cleaned) {
        return None;
    }
    Some(cleaned.to_string())
}

pub fn is_placeholder(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    PLACEHOLDER_TOKENS.iter().any(|p| *p == lowered)
}

pub fn parse_numeric_value(cell: &CellValue) -> f64 {
    normalize_numeric(cell).value
}

pub fn parse_percentage_value(cell: &CellValue) -> f64 {
    normalize_percentage(cell).value
}

/// Longest leading decimal literal of `s` (after leading whitespace), the way
/// spreadsheet front ends read `"42.5 %"` or `"1.2.3"` as 42.5 and 1.2.
pub(crate) fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_numeric_thousands_and_decimal_comma() {
        assert_eq!(parse_numeric_value(&text("€116,230.00")), 116230.0);
        assert_eq!(parse_numeric_value(&text("€116,23")), 116.23);
        assert_eq!(parse_numeric_value(&text("1 250,5")), 1250.5);
        assert_eq!(parse_numeric_value(&text("\u{a0}€\u{a0}2,500.75")), 2500.75);
        assert_eq!(parse_numeric_value(&text("$ 300")), 300.0);
    }

    #[test]
    fn test_numeric_defaults_to_zero() {
        assert_eq!(normalize_numeric(&CellValue::Empty), Normalized::blank(0.0));
        assert_eq!(normalize_numeric(&text("   ")).quality, CellQuality::Blank);

        let garbage = normalize_numeric(&text("n/a"));
        assert_eq!(garbage.value, 0.0);
        assert!(garbage.is_degraded());

        assert!(normalize_numeric(&CellValue::Bool(true)).is_degraded());
        assert!(normalize_numeric(&CellValue::Error("#DIV/0!".into())).is_degraded());
    }

    #[test]
    fn test_numeric_native_passthrough() {
        assert_eq!(normalize_numeric(&CellValue::Number(42.5)), Normalized::clean(42.5));
        assert_eq!(parse_numeric_value(&CellValue::Number(-3.0)), -3.0);
    }

    #[test]
    fn test_european_format_is_not_special_cased() {
        // "1.234,56" has both separators, so the comma is dropped as a thousands mark
        assert_eq!(parse_numeric_value(&text("1.234,56")), 1.23456);
    }

    #[test]
    fn test_percentage_scaling() {
        assert_eq!(parse_percentage_value(&CellValue::Number(0.5)), 50.0);
        assert_eq!(parse_percentage_value(&CellValue::Number(1.0)), 100.0);
        assert_eq!(parse_percentage_value(&CellValue::Number(75.0)), 75.0);
        assert_eq!(parse_percentage_value(&text("42%")), 42.0);
        assert_eq!(parse_percentage_value(&text(" 12.5 % ")), 12.5);

        let bad = normalize_percentage(&text("high"));
        assert_eq!(bad.value, 0.0);
        assert!(bad.is_degraded());
    }

    #[test]
    fn test_clean_string_placeholders() {
        assert_eq!(clean_string(&text("  Italia ")), Some("Italia".to_string()));
        for token in ["-", "--", "N/A", "na", "NULL", "undefined", "#N/A", "n/d", "   "] {
            assert_eq!(clean_string(&text(token)), None, "token {token:?}");
        }
        assert_eq!(clean_string(&CellValue::Empty), None);
        assert_eq!(clean_string(&CellValue::Number(12.0)), Some("12".to_string()));
    }

    #[test]
    fn test_float_prefix() {
        assert_eq!(parse_float_prefix("1.2.3"), Some(1.2));
        assert_eq!(parse_float_prefix("12-3"), Some(12.0));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("5."), Some(5.0));
        assert_eq!(parse_float_prefix("1e2x"), Some(100.0));
        assert_eq!(parse_float_prefix("1e"), Some(1.0));
        assert_eq!(parse_float_prefix("-"), None);
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix(""), None);
    }

    #[test]
    fn test_degraded_counter() {
        let mut counts = DegradedCells::default();
        counts.observe(ValueKind::Numeric, CellQuality::Degraded);
        counts.observe(ValueKind::Numeric, CellQuality::Clean);
        counts.observe(ValueKind::Date, CellQuality::Degraded);
        counts.observe(ValueKind::Percentage, CellQuality::Blank);
        assert_eq!(counts, DegradedCells { numeric: 1, percentage: 0, date: 1 });
        assert_eq!(counts.total(), 2);
    }
}
