//! Pipeline entry points for crawl operations.
//!
//! - `CrawlOrchestrator::crawl_messages`: windowed message history
//! - `CrawlOrchestrator::crawl_participants`: group members by category
//! - `build_orchestrator`: wire the shipped adapters from a `Config`

pub mod crawl;

use std::sync::Arc;

use crate::error::Result;
use crate::models::Config;
use crate::source::{HttpGateway, create_async_client};
use crate::storage::{BlobStore, ParquetSink, SnapshotExclusion, open_store};

pub use crawl::{
    Clock, CompletedWindow, CrawlOrchestrator, MessageCrawlReport, ParticipantCrawlReport,
    WindowFailure,
};

/// Build an orchestrator over the HTTP gateway and the configured store.
pub async fn build_orchestrator(config: Arc<Config>) -> Result<CrawlOrchestrator> {
    let store = open_store(&config.storage).await?;
    build_with_store(config, store)
}

/// Build an orchestrator over the HTTP gateway and an already open store.
pub fn build_with_store(config: Arc<Config>, store: Arc<dyn BlobStore>) -> Result<CrawlOrchestrator> {
    let client = create_async_client(&config.crawler)?;
    let token = std::env::var(&config.gateway.token_env).ok();
    if token.is_none() {
        log::debug!(
            "{} is not set; calling the gateway without a token",
            config.gateway.token_env
        );
    }
    let gateway = Arc::new(HttpGateway::new(client, &config.gateway.base_url, token)?);
    let sink = Arc::new(ParquetSink::new(Arc::clone(&store), &config.storage.prefix));

    let orchestrator = CrawlOrchestrator::new(gateway, sink, Arc::clone(&config));
    if !config.exclusion.enabled {
        log::info!("Exclusion filter disabled");
        return Ok(orchestrator);
    }

    let snapshots = SnapshotExclusion::new(store, &config.storage.prefix, &config.exclusion.group);
    Ok(orchestrator.with_exclusion_source(Arc::new(snapshots)))
}
