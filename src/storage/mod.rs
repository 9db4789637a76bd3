//! Persistence of crawl output.
//!
//! Every completed result set becomes one GZIP-compressed Parquet object
//! named after its partition key:
//!
//! ```text
//! {prefix}/
//! ├── messages_01-03-23_somegroup.parquet.gzip
//! ├── messages_historic_somegroup.parquet.gzip
//! └── users_bot_02-03-23_walkwithsteptelegram.parquet.gzip
//! ```
//!
//! The same layout doubles as the exclusion snapshot source: a BOT crawl of
//! the configured group produces the ids that later message crawls skip.

mod columnar;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;
mod snapshot;

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{PartitionKey, StorageBackend, StorageConfig};

pub use columnar::{Columnar, decode_ids, encode_parquet};
pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;
pub use snapshot::SnapshotExclusion;

/// Extension of every object written by the sink.
pub const OBJECT_EXTENSION: &str = "parquet.gzip";

const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// Flat key/value object storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous object. Returns a
    /// human-readable location.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Read the object under `key`, or `None` if it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Destination of completed result sets.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist one partition and return where it landed. Failures are
    /// reported as `AppError::SinkWriteFailed`.
    async fn write(&self, partition: &PartitionKey, batch: &RecordBatch) -> Result<String>;
}

/// Object key of a named file under `prefix`.
pub fn object_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}.{}", name, OBJECT_EXTENSION)
    } else {
        format!("{}/{}.{}", prefix, name, OBJECT_EXTENSION)
    }
}

/// Writes result sets as Parquet objects into a blob store.
#[derive(Clone)]
pub struct ParquetSink {
    store: Arc<dyn BlobStore>,
    prefix: String,
}

impl ParquetSink {
    pub fn new(store: Arc<dyn BlobStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl ResultSink for ParquetSink {
    async fn write(&self, partition: &PartitionKey, batch: &RecordBatch) -> Result<String> {
        let key = object_key(&self.prefix, partition.as_str());
        let bytes = encode_parquet(batch).map_err(|e| AppError::sink_write(partition.as_str(), e))?;
        let size = bytes.len();

        let location = self
            .store
            .put(&key, bytes, PARQUET_CONTENT_TYPE)
            .await
            .map_err(|e| AppError::sink_write(partition.as_str(), e))?;

        log::info!(
            "Wrote {} rows ({} bytes) to {}",
            batch.num_rows(),
            size,
            location
        );
        Ok(location)
    }
}

/// Open the blob store selected by `config`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalStorage::new(&config.root_dir))),
        #[cfg(feature = "s3")]
        StorageBackend::S3 => Ok(Arc::new(S3Storage::from_config(config).await?)),
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 => Err(AppError::config(
            "S3 storage requested but this build has no S3 support (enable the `s3` feature)",
        )),
    }
}
