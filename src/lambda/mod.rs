// src/lambda/mod.rs

//! AWS Lambda handler for the harvester.
//!
//! Each invocation runs one crawl:
//! 1. Builds the config from the environment (optionally from a TOML object in S3)
//! 2. Resolves the group and walks its windows or participant partitions
//! 3. Writes every completed partition to S3 as it finishes

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::StoreConfigLoader;
use crate::error::{AppError, Result};
use crate::models::{Config, CrawlMode, GroupRef, ParticipantCategory, StorageBackend};
use crate::pipeline::{MessageCrawlReport, ParticipantCrawlReport, build_with_store};
use crate::storage::open_store;

/// Lambda invocation payload. Exactly one of `mode` and `category` is set.
#[derive(Debug, Deserialize)]
pub struct CrawlRequest {
    /// Numeric channel id or group link
    pub group: String,

    /// Caller's estimate of the record count, bounding each walk
    pub estimated_total: usize,

    /// Message crawl mode (`today`, `historic`, `range:DD/MM/YY:DD/MM/YY`)
    #[serde(default)]
    pub mode: Option<CrawlMode>,

    /// Participant category (`ALL`, `ADMIN`, `BANNED`, `BOT`, `RECENT`, `MENTIONS`)
    #[serde(default)]
    pub category: Option<ParticipantCategory>,
}

/// What a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlJob {
    Messages(CrawlMode),
    Participants(ParticipantCategory),
}

impl CrawlRequest {
    pub fn job(&self) -> Result<CrawlJob> {
        match (self.mode, self.category) {
            (Some(mode), None) => Ok(CrawlJob::Messages(mode)),
            (None, Some(category)) => Ok(CrawlJob::Participants(category)),
            (Some(_), Some(_)) => Err(AppError::validation(
                "request sets both 'mode' and 'category'",
            )),
            (None, None) => Err(AppError::validation(
                "request needs either 'mode' or 'category'",
            )),
        }
    }
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct CrawlResponse {
    /// Whether every planned partition was written
    pub success: bool,

    /// Partition keys written, in completion order
    pub partitions: Vec<String>,

    /// Object locations of the written partitions
    pub locations: Vec<String>,

    /// Total records written
    pub record_count: usize,

    /// Window that ended a message crawl early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_window: Option<String>,

    /// Error message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl From<MessageCrawlReport> for CrawlResponse {
    fn from(report: MessageCrawlReport) -> Self {
        let record_count = report.record_count();
        let (partitions, locations) = report
            .completed
            .iter()
            .map(|c| (c.result.partition().to_string(), c.location.clone()))
            .unzip();

        Self {
            success: report.failure.is_none(),
            partitions,
            locations,
            record_count,
            failed_window: report.failure.as_ref().map(|f| f.window.label()),
            error: report.failure.map(|f| f.error.to_string()),
            execution_time_ms: 0,
        }
    }
}

impl From<ParticipantCrawlReport> for CrawlResponse {
    fn from(report: ParticipantCrawlReport) -> Self {
        Self {
            success: true,
            partitions: vec![report.result.partition().to_string()],
            locations: vec![report.location],
            record_count: report.result.len(),
            ..Default::default()
        }
    }
}

/// Main Lambda handler function.
#[instrument(skip(event), fields(group = %event.payload.group))]
pub async fn handler(
    event: LambdaEvent<CrawlRequest>,
) -> std::result::Result<CrawlResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (request, _context) = event.into_parts();

    info!(
        "Starting crawl: estimated_total={}, mode={:?}, category={:?}",
        request.estimated_total, request.mode, request.category
    );

    let mut response = match run_crawl(&request).await {
        Ok(response) => response,
        Err(e) => {
            error!("Crawl failed: {}", e);
            CrawlResponse {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    };
    response.execution_time_ms = start.elapsed().as_millis() as u64;

    if response.success {
        info!(
            "Crawl completed: {} partition(s), {} record(s) in {}ms",
            response.partitions.len(),
            response.record_count,
            response.execution_time_ms
        );
    } else if let Some(window) = &response.failed_window {
        error!(
            "Crawl stopped at window {} after {} partition(s)",
            window,
            response.partitions.len()
        );
    }
    Ok(response)
}

/// Internal crawl logic.
async fn run_crawl(request: &CrawlRequest) -> Result<CrawlResponse> {
    let job = request.job()?;
    let group: GroupRef = request.group.parse()?;

    let mut config = Config::default();
    config.apply_env_overrides();
    config.storage.backend = StorageBackend::S3;
    let store = open_store(&config.storage).await?;

    if let Ok(key) = std::env::var("CONFIG_S3_KEY") {
        config = StoreConfigLoader::new(Arc::clone(&store), key)
            .load_or_default()
            .await;
        config.apply_env_overrides();
        config.storage.backend = StorageBackend::S3;
    }
    config.validate()?;

    let orchestrator = build_with_store(Arc::new(config), store)?;
    let response = match job {
        CrawlJob::Messages(mode) => orchestrator
            .crawl_messages(&group, request.estimated_total, &mode)
            .await?
            .into(),
        CrawlJob::Participants(category) => orchestrator
            .crawl_participants(&group, request.estimated_total, category)
            .await?
            .into(),
    };
    Ok(response)
}
