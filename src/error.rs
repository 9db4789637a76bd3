// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Requested date range ends before it starts
    #[error("Invalid range: {to} is before {from}")]
    InvalidRange { from: String, to: String },

    /// Group reference could not be resolved to an entity
    #[error("Unknown group '{group}': {message}")]
    UnknownGroup { group: String, message: String },

    /// A page fetch against the remote API failed
    #[error("Fetch failed for {context} at offset {cursor}: {message}")]
    FetchFailed {
        context: String,
        cursor: usize,
        message: String,
    },

    /// A single record is missing a required field or failed to decode
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Neither the current nor the previous exclusion snapshot could be read
    #[error("Exclusion source unavailable: {0}")]
    ExclusionSourceUnavailable(String),

    /// Persisting a completed result set failed
    #[error("Sink write failed for {partition}: {message}")]
    SinkWriteFailed { partition: String, message: String },

    /// AWS S3 error
    #[error("S3 error: {0}")]
    S3(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Arrow batch construction failed
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet encoding/decoding failed
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create an invalid range error.
    pub fn invalid_range(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self::InvalidRange {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Create an unknown group error.
    pub fn unknown_group(group: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::UnknownGroup {
            group: group.into(),
            message: message.to_string(),
        }
    }

    /// Create a fetch failure with context.
    pub fn fetch_failed(context: impl Into<String>, cursor: usize, message: impl fmt::Display) -> Self {
        Self::FetchFailed {
            context: context.into(),
            cursor,
            message: message.to_string(),
        }
    }

    /// Create a malformed record error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRecord(message.into())
    }

    /// Create a sink write failure.
    pub fn sink_write(partition: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::SinkWriteFailed {
            partition: partition.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error only affects the window it occurred in.
    pub fn is_window_scoped(&self) -> bool {
        matches!(self, Self::FetchFailed { .. } | Self::SinkWriteFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_scoped_errors() {
        assert!(AppError::fetch_failed("w", 500, "timeout").is_window_scoped());
        assert!(AppError::sink_write("messages_01-03-23_g", "denied").is_window_scoped());
        assert!(!AppError::invalid_range("02/03/23", "01/03/23").is_window_scoped());
        assert!(!AppError::unknown_group("x", "nope").is_window_scoped());
    }

    #[test]
    fn test_display_includes_context() {
        let err = AppError::fetch_failed("messages 01-03-23", 1000, "connection reset");
        assert_eq!(
            err.to_string(),
            "Fetch failed for messages 01-03-23 at offset 1000: connection reset"
        );
    }
}
