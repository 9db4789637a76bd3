//! Remote API collaborators.
//!
//! The crawl engine only sees these traits. Sessions, authentication and
//! wire encoding belong to the implementations; the crate ships an HTTP
//! gateway adapter (`HttpGateway`) for a session-holding gateway service.

mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{EntityHandle, GroupRef, ParticipantFilter, RawRecord};

pub use http::{HttpGateway, create_async_client};

/// Resolves caller-supplied group references.
#[async_trait]
pub trait EntityResolver: Send + Sync {
    /// Fails with `AppError::UnknownGroup` if the group cannot be found.
    async fn resolve(&self, group: &GroupRef) -> Result<EntityHandle>;
}

/// Fetches pages of message history.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Messages posted before `end_of_window`, newest first, skipping the
    /// first `offset` of them.
    async fn fetch_messages(
        &self,
        entity: &EntityHandle,
        end_of_window: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRecord>>;
}

/// Fetches pages of group participants.
#[async_trait]
pub trait ParticipantSource: Send + Sync {
    /// Participants matching `filter`, in no particular order.
    async fn fetch_participants(
        &self,
        entity: &EntityHandle,
        filter: &ParticipantFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRecord>>;
}

/// Everything the orchestrator needs from the remote side.
pub trait RemoteApi: EntityResolver + MessageSource + ParticipantSource {}

impl<T: EntityResolver + MessageSource + ParticipantSource> RemoteApi for T {}
