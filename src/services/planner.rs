// src/services/planner.rs

//! Expands a crawl mode into the windows to walk.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Offset, Utc};

use crate::error::{AppError, Result};
use crate::models::{CrawlMode, Window};
use crate::utils::dates;

/// Plans windows at a fixed day-boundary offset.
#[derive(Debug, Clone, Copy)]
pub struct WindowPlanner {
    offset: FixedOffset,
}

/// The windows of one request. Iterating does not consume the plan, so the
/// same plan can be walked again and yields the same windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowPlan {
    Days {
        from: NaiveDate,
        to: NaiveDate,
        offset: FixedOffset,
    },
    Unbounded {
        end: DateTime<Utc>,
    },
}

/// Lazy iterator over a plan's windows.
#[derive(Debug, Clone)]
pub struct Windows {
    next: Option<NaiveDate>,
    to: NaiveDate,
    offset: FixedOffset,
    unbounded: Option<Window>,
}

impl WindowPlanner {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Plan `mode` as requested at `now`.
    pub fn plan(&self, mode: &CrawlMode, now: DateTime<Utc>) -> Result<WindowPlan> {
        match *mode {
            CrawlMode::Today => {
                let today = dates::day_at(now, self.offset);
                Ok(WindowPlan::Days {
                    from: today,
                    to: today,
                    offset: self.offset,
                })
            }
            CrawlMode::Historic => Ok(WindowPlan::Unbounded { end: now }),
            CrawlMode::Range { from, to } => {
                if to < from {
                    return Err(AppError::invalid_range(
                        dates::display_day(from),
                        dates::display_day(to),
                    ));
                }
                Ok(WindowPlan::Days {
                    from,
                    to,
                    offset: self.offset,
                })
            }
        }
    }
}

impl WindowPlan {
    pub fn iter(&self) -> Windows {
        match *self {
            Self::Days { from, to, offset } => Windows {
                next: Some(from),
                to,
                offset,
                unbounded: None,
            },
            Self::Unbounded { end } => Windows {
                next: None,
                to: NaiveDate::MIN,
                offset: Utc.fix(),
                unbounded: Some(Window::unbounded(end)),
            },
        }
    }

    /// Number of windows in the plan.
    pub fn len(&self) -> usize {
        match self {
            Self::Days { from, to, .. } => (*to - *from).num_days() as usize + 1,
            Self::Unbounded { .. } => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> IntoIterator for &'a WindowPlan {
    type Item = Window;
    type IntoIter = Windows;

    fn into_iter(self) -> Windows {
        self.iter()
    }
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if let Some(window) = self.unbounded.take() {
            return Some(window);
        }
        let day = self.next.filter(|day| *day <= self.to)?;
        self.next = day.checked_add_days(Days::new(1));
        Some(Window::day(day, self.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn planner() -> WindowPlanner {
        WindowPlanner::new(dates::offset_from_minutes(0).unwrap())
    }

    fn day(d: u32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 2, 15, 30, 0).unwrap()
    }

    #[test]
    fn test_today_is_one_day_window() {
        let plan = planner().plan(&CrawlMode::Today, now()).unwrap();
        let windows: Vec<_> = plan.iter().collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].date(), Some(day(2, 3)));
        assert_eq!(
            windows[0].start().unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(
            windows[0].end(),
            Utc.with_ymd_and_hms(2023, 3, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_historic_is_unbounded_until_now() {
        let plan = planner().plan(&CrawlMode::Historic, now()).unwrap();
        let windows: Vec<_> = plan.iter().collect();
        assert_eq!(windows.len(), 1);
        assert!(!windows[0].is_bounded());
        assert_eq!(windows[0].end(), now());
    }

    #[test]
    fn test_range_is_contiguous_and_ascending() {
        let ranges = [(day(1, 3), day(3, 3)), (day(28, 2), day(1, 3)), (day(5, 3), day(5, 3))];
        for (from, to) in ranges {
            let plan = planner().plan(&CrawlMode::Range { from, to }, now()).unwrap();
            let windows: Vec<_> = plan.iter().collect();
            let expected = (to - from).num_days() as usize + 1;
            assert_eq!(windows.len(), expected);
            assert_eq!(plan.len(), expected);
            for pair in windows.windows(2) {
                assert_eq!(pair[0].end(), pair[1].start().unwrap());
            }
            for window in &windows {
                assert_eq!(window.end() - window.start().unwrap(), TimeDelta::days(1));
            }
        }
    }

    #[test]
    fn test_range_dates_and_labels() {
        let plan = planner()
            .plan(&"range:01/03/23:03/03/23".parse().unwrap(), now())
            .unwrap();
        let labels: Vec<_> = plan.iter().map(|w| w.label()).collect();
        assert_eq!(labels, vec!["01-03-23", "02-03-23", "03-03-23"]);
    }

    #[test]
    fn test_reversed_range_is_invalid() {
        let mode = CrawlMode::Range {
            from: day(3, 3),
            to: day(1, 3),
        };
        assert!(matches!(
            planner().plan(&mode, now()),
            Err(AppError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_plan_is_restartable() {
        let plan = planner()
            .plan(&CrawlMode::Range { from: day(1, 3), to: day(4, 3) }, now())
            .unwrap();
        let first: Vec<_> = plan.iter().collect();
        let second: Vec<_> = (&plan).into_iter().collect();
        assert_eq!(first, second);

        let again = planner()
            .plan(&CrawlMode::Range { from: day(1, 3), to: day(4, 3) }, now())
            .unwrap();
        assert_eq!(plan, again);
    }
}
