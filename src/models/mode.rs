// src/models/mode.rs

//! Message crawl modes as given by the caller.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::error::{AppError, Result};
use crate::utils::dates;

/// How much message history a crawl covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// The current calendar day.
    Today,
    /// Everything up to the request time, in a single partition.
    Historic,
    /// Every calendar day from `from` to `to`, inclusive.
    Range { from: NaiveDate, to: NaiveDate },
}

impl FromStr for CrawlMode {
    type Err = AppError;

    /// Parse `today`, `historic` or `range:<DD/MM/YY>:<DD/MM/YY>`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "today" => return Ok(Self::Today),
            "historic" => return Ok(Self::Historic),
            _ => {}
        }

        let rest = s
            .strip_prefix("range:")
            .ok_or_else(|| AppError::validation(format!("Unknown crawl mode '{}'", s)))?;
        let (from, to) = rest.split_once(':').ok_or_else(|| {
            AppError::validation(format!("Range mode must be range:<from>:<to>, got '{}'", s))
        })?;

        Ok(Self::Range {
            from: dates::parse_day(from)?,
            to: dates::parse_day(to)?,
        })
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => write!(f, "today"),
            Self::Historic => write!(f, "historic"),
            Self::Range { from, to } => write!(
                f,
                "range:{}:{}",
                dates::display_day(*from),
                dates::display_day(*to)
            ),
        }
    }
}

impl<'de> Deserialize<'de> for CrawlMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_modes() {
        assert_eq!("today".parse::<CrawlMode>().unwrap(), CrawlMode::Today);
        assert_eq!("HISTORIC".parse::<CrawlMode>().unwrap(), CrawlMode::Historic);
    }

    #[test]
    fn test_parse_range() {
        let mode: CrawlMode = "range:01/03/23:03/03/23".parse().unwrap();
        assert_eq!(
            mode,
            CrawlMode::Range {
                from: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
                to: NaiveDate::from_ymd_opt(2023, 3, 3).unwrap(),
            }
        );
        assert_eq!(mode.to_string(), "range:01/03/23:03/03/23");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("yesterday".parse::<CrawlMode>().is_err());
        assert!("range:01/03/23".parse::<CrawlMode>().is_err());
        assert!("range:2023-03-01:2023-03-02".parse::<CrawlMode>().is_err());
    }

    #[test]
    fn test_deserialize_from_json() {
        let mode: CrawlMode = serde_json::from_str("\"range:01/03/23:02/03/23\"").unwrap();
        assert!(matches!(mode, CrawlMode::Range { .. }));
    }
}
