// src/models/result_set.rs

//! Accumulated crawl output and the keys it is stored under.

use std::fmt;

use chrono::NaiveDate;

use crate::models::{ParticipantCategory, Window};
use crate::utils::dates;

/// Storage name of one result set, without prefix or extension.
///
/// - `messages_<DD-MM-YY>_<group>` for a day window
/// - `messages_historic_<group>` for the unbounded window
/// - `users_<category>_<DD-MM-YY>_<group>` for participants
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn messages(window: &Window, group: &str) -> Self {
        Self(format!("messages_{}_{}", window.label(), group))
    }

    pub fn participants(category: ParticipantCategory, day: NaiveDate, group: &str) -> Self {
        Self(format!(
            "users_{}_{}_{}",
            category.as_str(),
            dates::key_day(day),
            group
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Records kept for exactly one partition, in the order they were fetched.
///
/// Append-only: rows are never reordered or removed once pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet<T> {
    partition: PartitionKey,
    rows: Vec<T>,
}

impl<T> ResultSet<T> {
    pub fn new(partition: PartitionKey) -> Self {
        Self {
            partition,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: T) {
        self.rows.push(row);
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = T>) {
        self.rows.extend(rows);
    }

    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_partition_keys() {
        let day = NaiveDate::from_ymd_opt(2023, 3, 2).unwrap();
        let window = Window::day(day, dates::offset_from_minutes(0).unwrap());
        assert_eq!(
            PartitionKey::messages(&window, "walkwithstep").as_str(),
            "messages_02-03-23_walkwithstep"
        );

        let historic = Window::unbounded(chrono::Utc::now());
        assert_eq!(
            PartitionKey::messages(&historic, "walkwithstep").as_str(),
            "messages_historic_walkwithstep"
        );
    }

    #[test]
    fn test_participant_partition_key() {
        let day = NaiveDate::from_ymd_opt(2023, 3, 2).unwrap();
        let key = PartitionKey::participants(ParticipantCategory::Bot, day, "walkwithstep");
        assert_eq!(key.to_string(), "users_bot_02-03-23_walkwithstep");
    }

    #[test]
    fn test_result_set_preserves_order() {
        let mut set = ResultSet::new(PartitionKey("p".into()));
        set.push(3);
        set.extend([1, 2]);
        assert_eq!(set.rows(), &[3, 1, 2]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.into_rows(), vec![3, 1, 2]);
    }
}
