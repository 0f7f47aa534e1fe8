use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::Normalized;
use crate::constants::{
    MAX_YEAR_EXCLUSIVE, MIN_YEAR_EXCLUSIVE, SENTINEL_DATES, SERIAL_DATE_MAX, SERIAL_DATE_MIN,
};
use crate::types::CellValue;

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("ISO date pattern compiles"));

/// Date-only layouts tried after ISO and RFC 3339. Slash dates are read
/// month-first, matching how the spreadsheet exports render them.
const DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
];

/// Normalize a date cell into a calendar date.
///
/// Accepts ISO `YYYY-MM-DD` text, spreadsheet serial numbers in the plausible
/// window, and a handful of common text layouts. Anything outside the
/// `(1900, 2100)` year window, or one of the `1900-01-0x` empty-cell
/// sentinels, is rejected.
pub fn normalize_date(cell: &CellValue) -> Normalized<Option<NaiveDate>> {
    let parsed = match cell {
        CellValue::Empty => return Normalized::blank(None),
        CellValue::Text(s) if s.trim().is_empty() => return Normalized::blank(None),
        CellValue::Text(s) => parse_date_text(s.trim()),
        CellValue::Number(n) => from_serial(*n),
        CellValue::Bool(_) | CellValue::Error(_) => None,
    };

    match parsed.filter(is_plausible) {
        Some(date) => Normalized::clean(Some(date)),
        None => Normalized::degraded(None),
    }
}

pub fn parse_date_value(cell: &CellValue) -> Option<NaiveDate> {
    normalize_date(cell).value
}

/// Spreadsheet serial day number to date: `1900-01-01 + (serial - 2)` days,
/// which absorbs both the 1-based count and the phantom 1900-02-29.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !(serial > SERIAL_DATE_MIN && serial < SERIAL_DATE_MAX) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64 - 2))
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if ISO_DATE.is_match(text) {
        return NaiveDate::parse_from_str(text, "%Y-%m-%d").ok();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    // `%Y` also takes two-digit years, so a layout only counts when its
    // result is plausible; `03/15/24` then falls through to `%y`.
    DATETIME_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
        .find(is_plausible)
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .find(is_plausible)
        })
}

fn is_plausible(date: &NaiveDate) -> bool {
    let year = date.year();
    if year <= MIN_YEAR_EXCLUSIVE || year >= MAX_YEAR_EXCLUSIVE {
        return false;
    }
    let iso = date.format("%Y-%m-%d").to_string();
    !SENTINEL_DATES.contains(&iso.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::CellQuality;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_iso_passthrough() {
        assert_eq!(parse_date_value(&text("2024-03-15")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date_value(&text(" 2024-03-15 ")), Some(ymd(2024, 3, 15)));
        // ISO-shaped but not a calendar date
        assert!(normalize_date(&text("2023-02-30")).is_degraded());
    }

    #[test]
    fn test_serial_dates() {
        let date = parse_date_value(&CellValue::Number(45000.0)).unwrap();
        assert_eq!(date.year(), 2023);
        assert_eq!(date, ymd(2023, 3, 15));
        assert_eq!(parse_date_value(&CellValue::Number(45000.75)), Some(ymd(2023, 3, 15)));
        assert_eq!(parse_date_value(&CellValue::Number(25569.0)), Some(ymd(1970, 1, 1)));
    }

    #[test]
    fn test_numbers_outside_serial_window_are_rejected() {
        assert!(normalize_date(&CellValue::Number(3.0)).is_degraded());
        assert!(normalize_date(&CellValue::Number(25000.0)).is_degraded());
        assert!(normalize_date(&CellValue::Number(100000.0)).is_degraded());
    }

    #[test]
    fn test_sentinels_and_year_window() {
        for s in ["1900-01-01", "1900-01-02", "1900-01-03"] {
            assert_eq!(parse_date_value(&text(s)), None, "{s}");
        }
        assert_eq!(parse_date_value(&text("1899-12-31")), None);
        assert_eq!(parse_date_value(&text("2100-01-01")), None);
        assert_eq!(parse_date_value(&text("2099-12-31")), Some(ymd(2099, 12, 31)));
        assert_eq!(parse_date_value(&text("1901-01-01")), Some(ymd(1901, 1, 1)));
    }

    #[test]
    fn test_text_layouts() {
        assert_eq!(parse_date_value(&text("2024-03-15T10:30:00Z")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date_value(&text("2024-03-15 08:00:00")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date_value(&text("2024/03/15")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date_value(&text("3/15/2024")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date_value(&text("03/15/24")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date_value(&text("15-Mar-2024")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date_value(&text("March 15, 2024")), Some(ymd(2024, 3, 15)));
    }

    #[test]
    fn test_two_digit_years_are_not_read_as_first_century() {
        assert_eq!(parse_date_value(&text("12/31/99")), Some(ymd(1999, 12, 31)));
        assert_eq!(parse_date_value(&text("01/02/30")), Some(ymd(2030, 1, 2)));
        assert_eq!(parse_date_value(&text("03/15/24 10:30")), Some(ymd(2024, 3, 15)));
        assert_eq!(normalize_date(&text("03/15/24")).quality, CellQuality::Clean);
    }

    #[test]
    fn test_failures_are_degraded_not_errors() {
        let out = normalize_date(&text("next tuesday"));
        assert_eq!(out.value, None);
        assert_eq!(out.quality, CellQuality::Degraded);
        assert_eq!(normalize_date(&CellValue::Empty).quality, CellQuality::Blank);
        assert!(normalize_date(&CellValue::Bool(false)).is_degraded());
    }
}
