use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps are stored as RFC 3339 UTC text with fixed microsecond
/// precision, so lexicographic order in SQL equals chronological order and
/// cursor comparisons can be plain string compares.
pub fn format(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now() -> String {
    format(Utc::now())
}

pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
