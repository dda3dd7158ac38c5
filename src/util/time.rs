use std::fmt::{Display, Write};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

pub fn normalize_rfc3339_utc(input: &str) -> Option<String> {
    let dt = DateTime::parse_from_rfc3339(input).ok()?;
    Some(
        dt.with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
    )
}

/// Parses `input` as RFC3339, or with a strftime `format` (naive values are read as UTC).
pub fn parse_datetime(input: &str, format: Option<&str>) -> Option<DateTime<Utc>> {
    let Some(format) = format else {
        return DateTime::parse_from_rfc3339(input)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    };
    if let Ok(dt) = DateTime::parse_from_str(input, format) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(input, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Formats with a strftime `format`, or RFC3339 when none is given.
/// Returns `None` for an invalid format string.
pub fn format_datetime<Tz>(dt: &DateTime<Tz>, format: Option<&str>) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(format) = format else {
        return Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true));
    };
    let mut out = String::new();
    write!(out, "{}", dt.format(format)).ok()?;
    Some(out)
}
