use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{input}' is not an ISO-8601 date or timestamp")]
pub struct DateParseError { pub input: String }

/// Day of month of an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
pub fn day_of_month(iso: &str) -> Result<u32, DateParseError> {
    let s = iso.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) { return Ok(ts.day()); }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.day())
        .map_err(|_| DateParseError { input: iso.to_string() })
}

/// RFC 3339 stamp safe for file names and commit messages (`2024-05-01T10-20-30-123Z`).
pub fn sanitized_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true).replace([':', '.'], "-")
}
