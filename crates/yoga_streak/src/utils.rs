//! Timestamp parsing helpers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a practice timestamp into a UTC instant.
///
/// Accepts:
/// - RFC3339 datetime (any offset) -> converted to UTC
/// - Naive datetime YYYY-MM-DDTHH:MM:SS[.fff] -> read as UTC
/// - YYYY-MM-DD -> midnight UTC
///
/// Returns `None` for anything else so callers can drop malformed records.
pub fn parse_activity_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ndt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_with_offset_into_utc() {
        let dt = parse_activity_timestamp("2026-02-25T01:30:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-02-24T23:30:00+00:00");
    }

    #[test]
    fn parses_naive_datetime_with_millis() {
        let dt = parse_activity_timestamp("2026-02-24T08:15:00.250").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2026-02-24 08:15");
    }

    #[test]
    fn parses_date_only_as_midnight() {
        let dt = parse_activity_timestamp(" 2026-02-24 ").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-02-24T00:00:00+00:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_activity_timestamp("yesterday").is_none());
        assert!(parse_activity_timestamp("").is_none());
        assert!(parse_activity_timestamp("2026-13-01").is_none());
    }
}
