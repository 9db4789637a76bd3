// src/utils/dates.rs

//! Calendar-day helpers.
//!
//! Dates are entered as `DD/MM/YY` and written into partition keys as
//! `DD-MM-YY`, since slashes are not safe in object keys.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};

use crate::error::{AppError, Result};

/// Format accepted for dates given on the command line or in requests.
pub const INPUT_FORMAT: &str = "%d/%m/%y";

/// Format used for dates inside partition keys.
pub const KEY_FORMAT: &str = "%d-%m-%y";

/// Parse a `DD/MM/YY` date.
pub fn parse_day(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), INPUT_FORMAT).map_err(|e| {
        AppError::validation(format!("Invalid date '{}' (expected DD/MM/YY): {}", text, e))
    })
}

/// Render a date for display in the input convention.
pub fn display_day(day: NaiveDate) -> String {
    day.format(INPUT_FORMAT).to_string()
}

/// Render a date for use in a partition key.
pub fn key_day(day: NaiveDate) -> String {
    day.format(KEY_FORMAT).to_string()
}

/// Build a fixed offset from minutes east of UTC.
pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| AppError::config(format!("UTC offset out of range: {} minutes", minutes)))
}

/// The calendar day `now` falls on at the given offset.
pub fn day_at(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Midnight at the start of `day` at the given offset, as a UTC instant.
pub fn midnight(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = day.and_time(NaiveTime::MIN);
    let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&(local - shift))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_key_format() {
        let day = parse_day("01/03/23").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
        assert_eq!(key_day(day), "01-03-23");
        assert_eq!(display_day(day), "01/03/23");
    }

    #[test]
    fn test_parse_rejects_other_formats() {
        assert!(parse_day("2023-03-01").is_err());
        assert!(parse_day("32/01/23").is_err());
        assert!(parse_day("").is_err());
    }

    #[test]
    fn test_midnight_respects_offset() {
        let day = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        let utc = midnight(day, offset_from_minutes(0).unwrap());
        assert_eq!(utc.to_rfc3339(), "2023-03-01T00:00:00+00:00");

        let minus_three = midnight(day, offset_from_minutes(-180).unwrap());
        assert_eq!(minus_three.to_rfc3339(), "2023-03-01T03:00:00+00:00");
    }

    #[test]
    fn test_day_at_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2023, 3, 1, 1, 30, 0).unwrap();
        assert_eq!(
            day_at(now, offset_from_minutes(-180).unwrap()),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
    }
}
