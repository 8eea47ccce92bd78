//! Field cleaning rules
//!
//! Each function takes the raw cell (absent when the row was too short) and
//! returns the cleaned value that is both hashed and written to the audit.

use super::RejectReason;
use capi_common::types::{Currency, EmailMatchMode};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const EURO_SIGN: char = '€';

/// Layouts carrying a numeric offset, with or without a colon.
const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// Zone designators stripped before the naive layouts are tried.
const UTC_SUFFIXES: &[&str] = &[" UTC", " GMT", "Z"];

/// Naive date-time layouts, read as UTC.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%b %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M",
    "%B %d, %Y %H:%M",
    "%d %b %Y %H:%M:%S",
];

/// Date-only layouts, read as midnight UTC.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
];

/// Pick the email cells that take part in matching
///
/// Returns the raw (uncleaned) values in column order.
pub fn select_emails(
    columns: [Option<&str>; 3],
    mode: EmailMatchMode,
) -> Result<Vec<String>, RejectReason> {
    match mode {
        EmailMatchMode::Single => match columns[0] {
            None => Err(RejectReason::MissingEmail),
            Some(value) if value.is_empty() => Err(RejectReason::MissingEmail),
            Some(value) if !value.contains('@') => Err(RejectReason::InvalidEmail),
            Some(value) => Ok(vec![value.to_string()]),
        },
        EmailMatchMode::Multi => {
            let emails: Vec<String> = columns
                .into_iter()
                .flatten()
                .filter(|value| value.contains('@'))
                .map(str::to_string)
                .collect();

            if emails.is_empty() {
                Err(RejectReason::NoValidEmail)
            } else {
                Ok(emails)
            }
        },
    }
}

pub fn clean_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Keep only ASCII digits
pub fn clean_phone(raw: Option<&str>) -> String {
    raw.unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Split a full name into lowercase (first, last)
///
/// Splits on single spaces: the first token is the first name and the rest,
/// rejoined with spaces, is the last name.
pub fn split_name(raw: Option<&str>) -> (String, String) {
    let full = raw.unwrap_or_default().trim();
    let mut parts = full.split(' ');

    let first = parts.next().unwrap_or_default().to_lowercase();
    let last = parts.collect::<Vec<_>>().join(" ").to_lowercase();

    (first, last)
}

/// Trim + lowercase, used for zip and country
pub fn clean_code(raw: Option<&str>) -> String {
    raw.unwrap_or_default().trim().to_lowercase()
}

/// Reduce gender to `f` or `m`
///
/// Anything starting with `f`/`F` is `f`; everything else, blank included,
/// is `m`. The value is not trimmed first.
pub fn gender_code(raw: Option<&str>) -> &'static str {
    if raw.unwrap_or_default().to_lowercase().starts_with('f') {
        "f"
    } else {
        "m"
    }
}

pub fn clean_madid(raw: Option<&str>) -> String {
    raw.unwrap_or_default().trim().to_string()
}

/// Parse the purchase value out of a localized price string
///
/// Keeps digits, commas and periods, turns the first comma into a decimal
/// point, and reads the longest leading number. Anything unreadable is 0.
pub fn parse_value(raw: Option<&str>) -> f64 {
    let kept: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let normalized = kept.replacen(',', ".", 1);

    let mut seen_point = false;
    let number: String = normalized
        .chars()
        .take_while(|c| match c {
            '.' if !seen_point => {
                seen_point = true;
                true
            },
            c => c.is_ascii_digit(),
        })
        .collect();

    number
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// `EUR` when the price mentions the euro sign, `USD` otherwise
pub fn infer_currency(raw: Option<&str>) -> Currency {
    match raw {
        Some(price) if price.contains(EURO_SIGN) => Currency::Eur,
        _ => Currency::Usd,
    }
}

/// Parse the event timestamp
///
/// Quote characters are stripped first. Values without an offset are read
/// as UTC. Returns `None` when no layout matches.
pub fn parse_event_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let cleaned: String = raw?.trim().chars().filter(|c| !matches!(c, '"' | '\'')).collect();
    let value = cleaned.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Some(parsed) = OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
    {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = UTC_SUFFIXES
        .iter()
        .find_map(|suffix| value.strip_suffix(suffix))
        .map(str::trim_end)
        .unwrap_or(value);

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(naive, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}
