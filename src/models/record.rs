// src/models/record.rs

//! Records fetched from the remote API.
//!
//! The API hands back loosely-typed JSON objects. They are decoded lazily,
//! one at a time, so a single malformed record never spoils a page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

/// An undecoded record as returned by a fetch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Value);

/// A decoded group message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Message text (empty for media-only messages)
    pub text: String,

    /// Sending user
    pub author_id: i64,

    /// Time the message was posted
    pub timestamp: DateTime<Utc>,

    /// Group reference the message was fetched from
    pub group: String,
}

/// A decoded group participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub group: String,
}

impl RawRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Decode as a message.
    ///
    /// The sender may be given as `from_id: 42` or `from_id: {"user_id": 42}`.
    /// The date may be RFC 3339 text or unix seconds.
    pub fn decode_message(&self, group: &str) -> Result<MessageRecord> {
        let author_id = match self.0.get("from_id") {
            Some(Value::Object(peer)) => peer.get("user_id").and_then(Value::as_i64),
            Some(other) => other.as_i64(),
            None => None,
        }
        .ok_or_else(|| self.malformed("missing author id"))?;

        let timestamp = self.timestamp("date")?;

        let text = match self.0.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(_) => return Err(self.malformed("message text is not a string")),
        };

        Ok(MessageRecord {
            text,
            author_id,
            timestamp,
            group: group.to_string(),
        })
    }

    /// Decode as a participant. Only the id is required.
    pub fn decode_participant(&self, group: &str) -> Result<ParticipantRecord> {
        let id = self
            .0
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| self.malformed("missing participant id"))?;

        Ok(ParticipantRecord {
            id,
            first_name: self.text_field("first_name"),
            last_name: self.text_field("last_name"),
            username: self.text_field("username"),
            phone: self.text_field("phone"),
            group: group.to_string(),
        })
    }

    fn timestamp(&self, field: &str) -> Result<DateTime<Utc>> {
        match self.0.get(field) {
            Some(Value::String(text)) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| self.malformed(format!("unparseable {} '{}': {}", field, text, e))),
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .ok_or_else(|| self.malformed(format!("{} out of range: {}", field, n))),
            _ => Err(self.malformed(format!("missing {}", field))),
        }
    }

    fn text_field(&self, field: &str) -> Option<String> {
        self.0.get(field).and_then(Value::as_str).map(str::to_string)
    }

    fn malformed(&self, reason: impl Into<String>) -> AppError {
        let id = self
            .0
            .get("id")
            .map(Value::to_string)
            .unwrap_or_else(|| "?".to_string());
        AppError::malformed(format!("record {}: {}", id, reason.into()))
    }
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
