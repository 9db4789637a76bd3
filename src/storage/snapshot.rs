// src/storage/snapshot.rs

//! Exclusion snapshots read back from earlier participant output.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::ParticipantCategory;
use crate::services::ExclusionSource;
use crate::storage::{BlobStore, decode_ids, object_key};

/// Reads the `id` column of a dated BOT participant file.
pub struct SnapshotExclusion {
    store: Arc<dyn BlobStore>,
    prefix: String,
    group: String,
}

impl SnapshotExclusion {
    pub fn new(store: Arc<dyn BlobStore>, prefix: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            group: group.into(),
        }
    }

    /// Object key of the snapshot for `date_key`.
    pub fn snapshot_key(&self, date_key: &str) -> String {
        let name = format!(
            "users_{}_{}_{}",
            ParticipantCategory::Bot.as_str(),
            date_key,
            self.group
        );
        object_key(&self.prefix, &name)
    }
}

#[async_trait]
impl ExclusionSource for SnapshotExclusion {
    async fn read_snapshot(&self, date_key: &str) -> Result<Vec<i64>> {
        let key = self.snapshot_key(date_key);
        let bytes = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| AppError::ExclusionSourceUnavailable(format!("{} not found", key)))?;
        decode_ids(bytes, "id")
    }
}
