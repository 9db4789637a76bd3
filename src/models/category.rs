// src/models/category.rs

//! Participant categories and the server-side filters they map to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::{AppError, Result};

/// Name-search prefixes used to partition an `ALL` participant crawl.
///
/// The remote API caps an unfiltered participant listing, so the full member
/// list is approximated by searching each letter separately.
pub const SEARCH_PREFIXES: [char; 26] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Which participants to harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantCategory {
    All,
    Admin,
    Banned,
    Bot,
    Recent,
    Mentions,
}

/// Server-side participant filter sent with every page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantFilter {
    Search(String),
    Admins,
    Banned,
    Bots,
    Recent,
    Mentions,
}

impl ParticipantCategory {
    pub const ALL: [ParticipantCategory; 6] = [
        Self::All,
        Self::Admin,
        Self::Banned,
        Self::Bot,
        Self::Recent,
        Self::Mentions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Admin => "admin",
            Self::Banned => "banned",
            Self::Bot => "bot",
            Self::Recent => "recent",
            Self::Mentions => "mentions",
        }
    }

    /// The filters to walk, in order. `All` expands to one search per letter.
    pub fn partitions(&self) -> Vec<ParticipantFilter> {
        match self {
            Self::All => SEARCH_PREFIXES
                .iter()
                .map(|c| ParticipantFilter::Search(c.to_string()))
                .collect(),
            Self::Admin => vec![ParticipantFilter::Admins],
            Self::Banned => vec![ParticipantFilter::Banned],
            Self::Bot => vec![ParticipantFilter::Bots],
            Self::Recent => vec![ParticipantFilter::Recent],
            Self::Mentions => vec![ParticipantFilter::Mentions],
        }
    }
}

impl ParticipantFilter {
    /// Filter name as sent to the remote API.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Search(_) => "search",
            Self::Admins => "admins",
            Self::Banned => "banned",
            Self::Bots => "bots",
            Self::Recent => "recent",
            Self::Mentions => "mentions",
        }
    }

    /// Search term, for name-search filters.
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Search(q) => Some(q),
            _ => None,
        }
    }
}

impl fmt::Display for ParticipantFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search(q) => write!(f, "search '{}'", q),
            other => write!(f, "{}", other.kind()),
        }
    }
}

impl FromStr for ParticipantCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Unknown participant category '{}' (expected one of ALL, ADMIN, BANNED, BOT, RECENT, MENTIONS)",
                    s
                ))
            })
    }
}

impl fmt::Display for ParticipantCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

impl<'de> Deserialize<'de> for ParticipantCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_expands_to_26_searches() {
        let partitions = ParticipantCategory::All.partitions();
        assert_eq!(partitions.len(), 26);
        assert_eq!(partitions[0], ParticipantFilter::Search("a".into()));
        assert_eq!(partitions[25], ParticipantFilter::Search("z".into()));
    }

    #[test]
    fn test_single_filter_categories() {
        assert_eq!(ParticipantCategory::Bot.partitions(), vec![ParticipantFilter::Bots]);
        assert_eq!(ParticipantCategory::Banned.partitions(), vec![ParticipantFilter::Banned]);
        assert_eq!(ParticipantFilter::Admins.query(), None);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("ALL".parse::<ParticipantCategory>().unwrap(), ParticipantCategory::All);
        assert_eq!("mentions".parse::<ParticipantCategory>().unwrap(), ParticipantCategory::Mentions);
        assert!("owners".parse::<ParticipantCategory>().is_err());
    }
}
