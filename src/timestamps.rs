//! Best-effort timestamp parsing for raw record fields.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::data::RecordTimestamp;

/// Offset-carrying layouts tried after RFC 3339 and RFC 2822.
/// `%z` accepts both `+0200` and `+02:00`.
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Naive date-time layouts, interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Date-only layouts, anchored to midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m-%d-%Y", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y"];

/// Parse a raw JSON value into a record timestamp.
///
/// Strings are parsed with [`parse_timestamp_str`]; integers are epoch seconds.
/// Everything else (null, bools, objects) becomes `Unknown`.
pub fn parse_timestamp_value(value: &Value) -> RecordTimestamp {
    match value {
        Value::String(raw) => parse_timestamp_str(raw),
        Value::Number(number) => number
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(RecordTimestamp::Known)
            .unwrap_or(RecordTimestamp::Unknown),
        _ => RecordTimestamp::Unknown,
    }
}

/// Parse a timestamp string in any of the accepted layouts.
///
/// Accepts RFC 3339 (`2024-01-01T08:30:00Z`), RFC 2822
/// (`Mon, 01 Jan 2024 08:30:00 GMT`), ISO date-times with a compact offset
/// (`2024-01-01T08:30:00+0000`), offset-less date-times (`2024-01-01 08:30:00`,
/// `2024-01-01T08:30`), and plain dates (`2024-01-01`, `01-31-2024`,
/// `01/31/2024`, `Jan 31, 2024`). Returns `Unknown` when nothing matches.
pub fn parse_timestamp_str(raw: &str) -> RecordTimestamp {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return RecordTimestamp::Unknown;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return RecordTimestamp::Known(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(trimmed) {
        return RecordTimestamp::Known(ts.with_timezone(&Utc));
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(trimmed, format) {
            return RecordTimestamp::Known(ts.with_timezone(&Utc));
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return RecordTimestamp::Known(Utc.from_utc_datetime(&naive));
        }
    }
    parse_date(trimmed)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| RecordTimestamp::Known(Utc.from_utc_datetime(&naive)))
        .unwrap_or(RecordTimestamp::Unknown)
}

/// Parse a calendar date in any of the accepted date-only layouts.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn known(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> RecordTimestamp {
        RecordTimestamp::Known(Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap())
    }

    #[test]
    fn parses_rfc3339_and_offsets() {
        assert_eq!(
            parse_timestamp_str("2024-03-05T10:15:00Z"),
            known(2024, 3, 5, 10, 15, 0)
        );
        assert_eq!(
            parse_timestamp_str("2024-03-05T12:15:00+02:00"),
            known(2024, 3, 5, 10, 15, 0)
        );
        assert_eq!(
            parse_timestamp_str("2024-03-05 12:15:00+0200"),
            known(2024, 3, 5, 10, 15, 0)
        );
    }

    #[test]
    fn parses_naive_datetimes_as_utc() {
        assert_eq!(
            parse_timestamp_str("2024-03-05 10:15:00"),
            known(2024, 3, 5, 10, 15, 0)
        );
        assert_eq!(
            parse_timestamp_str("2024-03-05T10:15:00.250"),
            RecordTimestamp::Known(
                Utc.with_ymd_and_hms(2024, 3, 5, 10, 15, 0).unwrap()
                    + chrono::Duration::milliseconds(250)
            )
        );
        assert_eq!(
            parse_timestamp_str("2024-03-05 10:15"),
            known(2024, 3, 5, 10, 15, 0)
        );
    }

    #[test]
    fn parses_compact_offsets_rfc2822_and_minute_precision() {
        assert_eq!(
            parse_timestamp_str("2024-02-02T10:00:00+0000"),
            known(2024, 2, 2, 10, 0, 0)
        );
        assert_eq!(
            parse_timestamp_str("2024-02-02T12:00:00.000+0200"),
            known(2024, 2, 2, 10, 0, 0)
        );
        assert_eq!(
            parse_timestamp_str("Fri, 02 Feb 2024 10:00:00 GMT"),
            known(2024, 2, 2, 10, 0, 0)
        );
        assert_eq!(
            parse_timestamp_str("Fri, 02 Feb 2024 11:00:00 +0100"),
            known(2024, 2, 2, 10, 0, 0)
        );
        assert_eq!(
            parse_timestamp_str("2024-02-02T10:00"),
            known(2024, 2, 2, 10, 0, 0)
        );
    }

    #[test]
    fn parses_date_only_formats_at_midnight() {
        for raw in ["2024-01-01", "01-01-2024", "01/01/2024", "Jan 01, 2024", " 2024-01-01 "] {
            assert_eq!(parse_timestamp_str(raw), known(2024, 1, 1, 0, 0, 0), "{raw}");
        }
    }

    #[test]
    fn rejects_garbage_and_out_of_range_dates() {
        assert!(parse_timestamp_str("").is_unknown());
        assert!(parse_timestamp_str("yesterday").is_unknown());
        assert!(parse_timestamp_str("2024-13-01").is_unknown());
        assert!(parse_timestamp_str("02-32-2024").is_unknown());
    }

    #[test]
    fn parses_json_values() {
        assert_eq!(
            parse_timestamp_value(&json!(1_704_067_200)),
            known(2024, 1, 1, 0, 0, 0)
        );
        assert_eq!(
            parse_timestamp_value(&json!("2024-01-01")),
            known(2024, 1, 1, 0, 0, 0)
        );
        assert!(parse_timestamp_value(&json!(null)).is_unknown());
        assert!(parse_timestamp_value(&json!(true)).is_unknown());
        assert!(parse_timestamp_value(&json!({"date": "2024-01-01"})).is_unknown());
    }
}
