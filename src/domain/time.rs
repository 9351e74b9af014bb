//! Timestamp parsing and API formatting

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::domain::error::DomainError;

/// Format used by the API for query times
pub const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a user supplied time.
///
/// Accepts RFC 3339 (including a trailing `Z`) or a naive
/// `YYYY-MM-DD[T ]HH:MM:SS` value, which is taken as UTC.
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, DomainError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| {
            DomainError::validation(format!(
                "Invalid datetime '{}': expected ISO 8601 or 'YYYY-MM-DD HH:MM:SS'",
                value
            ))
        })
}

pub fn format_api_time(dt: &DateTime<Utc>) -> String {
    dt.format(API_TIME_FORMAT).to_string()
}

/// Convert API unix seconds to UTC
pub fn from_unix_seconds(ts: i64) -> Result<DateTime<Utc>, DomainError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| DomainError::parse(format!("Timestamp out of range: {}", ts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339_zulu() {
        let dt = parse_datetime("2024-03-01T12:30:00Z").unwrap();
        assert_eq!(format_api_time(&dt), "2024-03-01T12:30:00Z");
    }

    #[test]
    fn test_parse_rfc3339_offset_converts_to_utc() {
        let dt = parse_datetime("2024-03-01T12:30:00-08:00").unwrap();
        assert_eq!(format_api_time(&dt), "2024-03-01T20:30:00Z");
    }

    #[test]
    fn test_parse_naive_space_separated_is_utc() {
        let dt = parse_datetime(" 2024-03-01 06:00:00 ").unwrap();
        assert_eq!(format_api_time(&dt), "2024-03-01T06:00:00Z");
    }

    #[test]
    fn test_parse_naive_iso() {
        let dt = parse_datetime("2024-03-01T06:00:00.250").unwrap();
        assert_eq!(format_api_time(&dt), "2024-03-01T06:00:00Z");
    }

    #[test]
    fn test_parse_invalid() {
        let err = parse_datetime("yesterday").unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn test_from_unix_seconds() {
        let dt = from_unix_seconds(1_700_000_000).unwrap();
        assert_eq!(format_api_time(&dt), "2023-11-14T22:13:20Z");
    }
}
