//! Format validation helpers for wire-level date and time strings
//!
//! The LIFF client sends calendar fields as plain strings; these helpers
//! reject malformed values before they reach a query.

use chrono::NaiveDate;

/// Validate a calendar date string of the form "YYYY-MM-DD".
pub fn is_valid_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Validate a year-month string of the form "YYYY-MM".
pub fn is_valid_year_month(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 7 || bytes[4] != b'-' {
        return false;
    }
    if !bytes[..4].iter().all(u8::is_ascii_digit) || !bytes[5..].iter().all(u8::is_ascii_digit) {
        return false;
    }
    matches!(s[5..].parse::<u8>(), Ok(1..=12))
}

/// Validate a wall-clock time string of the form "HH:MM" (24-hour).
pub fn is_valid_time_hhmm(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let (Ok(hour), Ok(minute)) = (s[..2].parse::<u8>(), s[3..].parse::<u8>()) else {
        return false;
    };
    hour < 24 && minute < 60
}
