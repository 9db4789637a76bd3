// src/services/exclusion.rs

//! Exclusion of automated accounts.
//!
//! The set is read from a dated snapshot once per run. An unreachable
//! snapshot never blocks a crawl: today's snapshot is tried first, then
//! yesterday's, and failing both the crawl runs without suppression.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};

use crate::error::{AppError, Result};
use crate::utils::dates;

/// Reads identifier snapshots keyed by `DD-MM-YY` dates.
#[async_trait]
pub trait ExclusionSource: Send + Sync {
    /// Fails if no snapshot exists for `date_key`.
    async fn read_snapshot(&self, date_key: &str) -> Result<Vec<i64>>;
}

/// Identifiers whose records are suppressed. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    ids: HashSet<i64>,
}

impl ExclusionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Loads the exclusion set for a run.
pub struct ExclusionFilter;

impl ExclusionFilter {
    /// Load the snapshot for `today`, falling back to the previous day, then
    /// to an empty set.
    pub async fn load(source: &dyn ExclusionSource, today: NaiveDate) -> ExclusionSet {
        let mut failures = Vec::new();

        for day in [Some(today), today.checked_sub_days(Days::new(1))]
            .into_iter()
            .flatten()
        {
            let key = dates::key_day(day);
            log::info!("Reading exclusion snapshot for {}", key);
            match source.read_snapshot(&key).await {
                Ok(ids) => {
                    let set = ExclusionSet::from_ids(ids);
                    log::info!("Loaded {} excluded ids from snapshot {}", set.len(), key);
                    return set;
                }
                Err(e) => {
                    log::debug!("Exclusion snapshot {} unavailable: {}", key, e);
                    failures.push(format!("{}: {}", key, e));
                }
            }
        }

        let err = AppError::ExclusionSourceUnavailable(failures.join("; "));
        log::warn!("{}. Continuing without exclusions.", err);
        ExclusionSet::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeSnapshots {
        snapshots: HashMap<String, Vec<i64>>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeSnapshots {
        fn new(entries: &[(&str, Vec<i64>)]) -> Self {
            Self {
                snapshots: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExclusionSource for FakeSnapshots {
        async fn read_snapshot(&self, date_key: &str) -> Result<Vec<i64>> {
            self.requested.lock().unwrap().push(date_key.to_string());
            self.snapshots
                .get(date_key)
                .cloned()
                .ok_or_else(|| AppError::S3(format!("no snapshot for {}", date_key)))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 3, 2).unwrap()
    }

    #[tokio::test]
    async fn test_uses_current_snapshot() {
        let source = FakeSnapshots::new(&[("02-03-23", vec![1, 2]), ("01-03-23", vec![3])]);
        let set = ExclusionFilter::load(&source, today()).await;
        assert_eq!(set, ExclusionSet::from_ids([1, 2]));
        assert_eq!(*source.requested.lock().unwrap(), vec!["02-03-23"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_previous_day() {
        let source = FakeSnapshots::new(&[("01-03-23", vec![3, 4])]);
        let set = ExclusionFilter::load(&source, today()).await;
        assert_eq!(set, ExclusionSet::from_ids([3, 4]));
        assert_eq!(
            *source.requested.lock().unwrap(),
            vec!["02-03-23", "01-03-23"]
        );
    }

    #[tokio::test]
    async fn test_both_missing_is_empty() {
        let source = FakeSnapshots::new(&[("28-02-23", vec![5])]);
        let set = ExclusionFilter::load(&source, today()).await;
        assert!(set.is_empty());
    }
}
