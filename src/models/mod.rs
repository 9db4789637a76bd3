// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains the data structures shared by the crawl engine,
//! the storage adapters and the binaries.

mod category;
mod config;
mod group;
mod mode;
mod record;
mod result_set;
mod window;

// Re-export all public types
pub use category::{ParticipantCategory, ParticipantFilter, SEARCH_PREFIXES};
pub use config::{
    Config, CrawlerConfig, ExclusionConfig, GatewayConfig, PageConfig, StorageBackend,
    StorageConfig,
};
pub use group::{EntityHandle, GroupRef};
pub use mode::CrawlMode;
pub use record::{MessageRecord, ParticipantRecord, RawRecord};
pub use result_set::{PartitionKey, ResultSet};
pub use window::Window;
