// src/models/window.rs

//! Time windows a crawl is bounded by.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Utc};

use crate::error::{AppError, Result};
use crate::utils::dates;

/// A half-open interval `[start, end)` of record timestamps.
///
/// A window without a start floor is the "historic" window: it admits
/// everything older than `end` and only stops once the cursor is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    day: Option<NaiveDate>,
}

impl Window {
    /// The calendar day `day` at the given offset, midnight to midnight.
    pub fn day(day: NaiveDate, offset: FixedOffset) -> Self {
        let start = dates::midnight(day, offset);
        Self {
            start: Some(start),
            end: start + TimeDelta::days(1),
            day: Some(day),
        }
    }

    /// A window with no start floor ending at `end`.
    pub fn unbounded(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end,
            day: None,
        }
    }

    /// An arbitrary bounded window. `end` must be strictly after `start`.
    pub fn bounded(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(AppError::validation(format!(
                "Window end {} is not after start {}",
                end, start
            )));
        }
        Ok(Self {
            start: Some(start),
            end,
            day: None,
        })
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// The calendar day this window covers, if it was planned as one.
    pub fn date(&self) -> Option<NaiveDate> {
        self.day
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some()
    }

    /// Whether `ts` falls before the start floor.
    pub fn is_before_start(&self, ts: DateTime<Utc>) -> bool {
        self.start.is_some_and(|start| ts < start)
    }

    /// Whether `ts` lies inside `[start, end)`.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        !self.is_before_start(ts) && ts < self.end
    }

    /// Label used in partition keys: `DD-MM-YY` for day windows, `historic`
    /// for the unbounded window.
    pub fn label(&self) -> String {
        match (self.day, self.start) {
            (Some(day), _) => dates::key_day(day),
            (None, None) => "historic".to_string(),
            (None, Some(start)) => dates::key_day(start.date_naive()),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(start) => write!(f, "[{}, {})", start.to_rfc3339(), self.end.to_rfc3339()),
            None => write!(f, "(.., {})", self.end.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        dates::offset_from_minutes(0).unwrap()
    }

    #[test]
    fn test_day_window_is_24_hours() {
        let day = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        let window = Window::day(day, utc());
        let start = window.start().unwrap();
        assert_eq!(window.end() - start, TimeDelta::days(1));
        assert_eq!(window.label(), "01-03-23");
    }

    #[test]
    fn test_contains_is_half_open() {
        let day = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        let window = Window::day(day, utc());
        let start = window.start().unwrap();
        assert!(window.contains(start));
        assert!(!window.contains(window.end()));
        assert!(window.is_before_start(start - TimeDelta::seconds(1)));
    }

    #[test]
    fn test_unbounded_has_no_floor() {
        let end = Utc.with_ymd_and_hms(2023, 3, 1, 12, 0, 0).unwrap();
        let window = Window::unbounded(end);
        let ancient = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        assert!(!window.is_bounded());
        assert!(!window.is_before_start(ancient));
        assert!(window.contains(ancient));
        assert_eq!(window.label(), "historic");
    }

    #[test]
    fn test_bounded_rejects_empty_interval() {
        let at = Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap();
        assert!(Window::bounded(at, at).is_err());
        assert!(Window::bounded(at, at + TimeDelta::hours(1)).is_ok());
    }
}
