//! Date parsing and formatting

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Parse a date or datetime string into a UTC instant.
///
/// Accepts RFC 3339 datetimes, bare `YYYY-MM-DDTHH:MM:SS` (taken as UTC),
/// plain `YYYY-MM-DD` dates (UTC midnight) and the reduced forms `YYYY-MM`
/// and `YYYY`, which mean midnight on the first day of that month or year.
/// Returns `None` for anything else.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_reduced_date(input))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `YYYY` or `YYYY-MM`, completed to the first day of the period
fn parse_reduced_date(input: &str) -> Option<NaiveDate> {
    let (year, month) = match input.split_once('-') {
        Some((year, month)) => (year, Some(month)),
        None => (input, None),
    };

    let year: i32 = digits(year, 4)?.parse().ok()?;
    let month: u32 = match month {
        Some(month) => digits(month, 2)?.parse().ok()?,
        None => 1,
    };

    NaiveDate::from_ymd_opt(year, month, 1)
}

fn digits(s: &str, len: usize) -> Option<&str> {
    (s.len() == len && s.bytes().all(|b| b.is_ascii_digit())).then_some(s)
}

/// Inclusive range check. Any unparseable value yields `false`.
pub fn within(date: &str, start: &str, end: &str) -> bool {
    match (parse_date(date), parse_date(start), parse_date(end)) {
        (Some(d), Some(s), Some(e)) => s <= d && d <= e,
        _ => false,
    }
}

/// Today's date as `YYYY-MM-DD`
pub fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Current instant as an ISO-8601 timestamp with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
