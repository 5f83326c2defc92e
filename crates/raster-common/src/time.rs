//! Lenient timestamp parsing for free-form metadata attributes.
//!
//! Model output rarely agrees on a time format. Values like
//! `"2017-06-20 00:00:00Z"`, `"2017-06-20T00:00:00+00:00"` or
//! `"valid from 20170620T000000"` all need to land on the same instant.
//! Time zone designators are dropped and the wall-clock value is kept.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("no recognizable date/time in '{0}'")]
    Unrecognized(String),
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%Y%m%d %H%M%S",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Parse the first date/time found in `s`, ignoring surrounding text and
/// any time zone suffix.
pub fn parse_fuzzy(s: &str) -> Result<NaiveDateTime, TimeParseError> {
    let trimmed = s.trim();
    for (start, ch) in trimmed.char_indices() {
        if !ch.is_ascii_digit() {
            continue;
        }
        if trimmed[..start]
            .chars()
            .next_back()
            .is_some_and(|prev| prev.is_ascii_digit())
        {
            continue;
        }
        if let Some(dt) = parse_at(&trimmed[start..]) {
            return Ok(dt);
        }
    }
    Err(TimeParseError::Unrecognized(s.to_string()))
}

fn parse_at(candidate: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok((dt, rest)) = NaiveDateTime::parse_and_remainder(candidate, format) {
            if !starts_with_digit(rest) {
                return Some(dt);
            }
        }
    }
    for format in DATE_FORMATS {
        if let Ok((date, rest)) = NaiveDate::parse_and_remainder(candidate, format) {
            if !starts_with_digit(rest) {
                return Some(date.and_time(NaiveTime::MIN));
            }
        }
    }
    None
}

fn starts_with_digit(rest: &str) -> bool {
    rest.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Render as `YYYY-MM-DDTHH:MM:SS`, with microseconds only when non-zero.
pub fn isoformat(dt: &NaiveDateTime) -> String {
    let micros = dt.nanosecond() / 1_000;
    if micros == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        format!("{}.{:06}", dt.format("%Y-%m-%dT%H:%M:%S"), micros)
    }
}

/// Parse leniently and re-render in canonical form.
pub fn normalize(s: &str) -> Result<String, TimeParseError> {
    parse_fuzzy(s).map(|dt| isoformat(&dt))
}
