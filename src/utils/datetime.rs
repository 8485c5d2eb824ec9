//! Centralized datetime handling utilities
//!
//! The metrics feed timestamps samples with ISO 8601 strings, usually with a
//! trailing `Z` designator. Everything is normalized to UTC here so the rest
//! of the application never deals with offsets.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Errors that can occur during datetime operations
#[derive(Error, Debug)]
pub enum DateTimeError {
    /// Invalid datetime format provided
    #[error("Invalid datetime format: '{input}' - expected RFC3339 (2024-01-01T12:00:00Z) or naive ISO 8601 (2024-01-01T12:00:00)")]
    InvalidFormat { input: String },
}

/// Datetime parsing and formatting for the sample wire format
pub struct DateTimeParser;

impl DateTimeParser {
    /// Parse an ISO 8601 timestamp into UTC.
    ///
    /// Supports:
    /// - RFC3339 with `Z` designator: "2024-01-01T12:00:00Z"
    /// - RFC3339 with explicit offset: "2024-01-01T12:00:00+02:00"
    /// - Naive ISO 8601 (assumed UTC): "2024-01-01T12:00:00"
    ///
    /// A trailing `Z` is equivalent to the `+00:00` offset.
    pub fn parse_iso8601(datetime_str: &str) -> Result<DateTime<Utc>, DateTimeError> {
        let trimmed = datetime_str.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }

        // Naive forms without an offset are assumed to be UTC
        let naive_formats = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];
        for format in &naive_formats {
            if let Ok(naive_dt) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(DateTime::from_naive_utc_and_offset(naive_dt, Utc));
            }
        }

        Err(DateTimeError::InvalidFormat {
            input: datetime_str.to_string(),
        })
    }

    /// Format a datetime for API responses (RFC3339)
    pub fn format_for_api(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    /// Format a datetime for the NDJSON wire (RFC3339 with `Z` designator)
    pub fn format_for_wire(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_parse_z_designator() {
        let dt = DateTimeParser::parse_iso8601("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_z_equals_explicit_utc_offset() {
        let with_z = DateTimeParser::parse_iso8601("2024-01-01T00:00:00Z").unwrap();
        let with_offset = DateTimeParser::parse_iso8601("2024-01-01T00:00:00+00:00").unwrap();
        assert_eq!(with_z, with_offset);
    }

    #[test]
    fn test_parse_with_timezone() {
        let dt = DateTimeParser::parse_iso8601("2024-01-01T12:00:00+02:00").unwrap();
        // Converted to UTC
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_parse_naive_assumes_utc() {
        let dt = DateTimeParser::parse_iso8601("2024-01-01T12:00:00").unwrap();
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let dt = DateTimeParser::parse_iso8601("2024-01-01T12:00:00.250Z").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_invalid_format() {
        let result = DateTimeParser::parse_iso8601("not-a-date");
        assert!(result.is_err());
        match result {
            Err(DateTimeError::InvalidFormat { input }) => assert_eq!(input, "not-a-date"),
            Ok(_) => panic!("Expected InvalidFormat error"),
        }
    }

    #[test]
    fn test_format_for_wire_uses_z() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let formatted = DateTimeParser::format_for_wire(&dt);
        assert!(formatted.ends_with('Z'));
        assert_eq!(DateTimeParser::parse_iso8601(&formatted).unwrap(), dt);
    }
}
