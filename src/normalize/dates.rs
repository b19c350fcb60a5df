//! Lenient date parsing for the date columns of the various exports.
//!
//! Unparseable values yield `None`; the row is kept with an empty date.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::ingest::table::RawValue;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

// Slash dates are day-first: the sources are Italian.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"];

/// Parses a date cell.
///
/// Text: RFC 3339 (kept in its own local time), ISO and day-first formats,
/// compact `yyyymmdd`. Numbers: `yyyymmdd` when in range, otherwise epoch
/// milliseconds (≥ 1e11) or epoch seconds (≥ 1e8).
pub fn parse_datetime(cell: &RawValue) -> Option<NaiveDateTime> {
    match cell {
        RawValue::Text(text) => parse_datetime_str(text),
        RawValue::Number(n) => parse_numeric_datetime(*n),
        _ => None,
    }
}

pub fn parse_datetime_str(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) {
        return compact_date(text.parse().ok()?);
    }
    None
}

fn parse_numeric_datetime(n: f64) -> Option<NaiveDateTime> {
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    if n.fract() == 0.0 && (19_000_101.0..=21_001_231.0).contains(&n) {
        return compact_date(n as u32);
    }
    if n >= 1e11 {
        return DateTime::from_timestamp_millis(n as i64).map(|dt| dt.naive_utc());
    }
    if n >= 1e8 {
        return DateTime::from_timestamp(n as i64, 0).map(|dt| dt.naive_utc());
    }
    None
}

fn compact_date(yyyymmdd: u32) -> Option<NaiveDateTime> {
    let year = (yyyymmdd / 10_000) as i32;
    let month = (yyyymmdd / 100) % 100;
    let day = yyyymmdd % 100;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.and_time(NaiveTime::MIN))
}

/// Assembles a date from separate year/month/day cells.
pub fn datetime_from_parts(year: &RawValue, month: &RawValue, day: &RawValue) -> Option<NaiveDateTime> {
    let part = |cell: &RawValue| {
        cell.as_f64()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0)
            .map(|v| v as u32)
    };
    let year = i32::try_from(part(year)?).ok()?;
    NaiveDate::from_ymd_opt(year, part(month)?, part(day)?).map(|d| d.and_time(NaiveTime::MIN))
}
