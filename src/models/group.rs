// src/models/group.rs

//! Group references and the entities they resolve to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A group as named by the caller: a numeric channel id or a path-like
/// reference such as `https://t.me/SomeGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupRef {
    Channel(i64),
    Path(String),
}

impl GroupRef {
    /// Short lower-case name used in partition keys.
    ///
    /// For paths this is the last non-empty segment; channels use their id.
    pub fn short_name(&self) -> String {
        match self {
            Self::Channel(id) => id.to_string(),
            Self::Path(path) => path
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(path)
                .to_lowercase(),
        }
    }
}

impl FromStr for GroupRef {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AppError::validation("Group reference is empty"));
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse()
                .map(Self::Channel)
                .map_err(|e| AppError::validation(format!("Invalid channel id '{}': {}", s, e)));
        }
        if s.trim_end_matches('/').is_empty() {
            return Err(AppError::validation(format!("Group reference '{}' has no name", s)));
        }
        Ok(Self::Path(s.to_string()))
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "{}", id),
            Self::Path(path) => write!(f, "{}", path),
        }
    }
}

/// A resolved group, as returned by the entity resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityHandle {
    /// Remote identifier used for subsequent fetches
    pub id: i64,

    /// Display title, when the remote side reports one
    #[serde(default)]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_reference_is_channel() {
        let group: GroupRef = "1234567".parse().unwrap();
        assert_eq!(group, GroupRef::Channel(1234567));
        assert_eq!(group.short_name(), "1234567");
    }

    #[test]
    fn test_path_short_name() {
        let group: GroupRef = "https://t.me/WalkWithStep".parse().unwrap();
        assert_eq!(group.short_name(), "walkwithstep");

        let trailing: GroupRef = "https://t.me/WalkWithStep/".parse().unwrap();
        assert_eq!(trailing.short_name(), "walkwithstep");
    }

    #[test]
    fn test_rejects_empty() {
        assert!("".parse::<GroupRef>().is_err());
        assert!("///".parse::<GroupRef>().is_err());
    }
}
