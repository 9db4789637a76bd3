//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::dates;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pagination pacing and calendar settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Message crawl settings
    #[serde(default)]
    pub messages: PageConfig,

    /// Participant crawl settings
    #[serde(default = "defaults::participant_pages")]
    pub participants: PageConfig,

    /// Remote API gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Output location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Bot exclusion snapshot
    #[serde(default)]
    pub exclusion: ExclusionConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        self.crawler.offset()?;
        if self.messages.page_size == 0 {
            return Err(AppError::validation("messages.page_size must be > 0"));
        }
        if self.participants.page_size == 0 {
            return Err(AppError::validation("participants.page_size must be > 0"));
        }
        if self.storage.prefix.contains("..") {
            return Err(AppError::validation("storage.prefix must not contain '..'"));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.trim().is_empty() {
            return Err(AppError::validation("storage.bucket is required for the s3 backend"));
        }
        if self.exclusion.enabled && self.exclusion.group.trim().is_empty() {
            return Err(AppError::validation("exclusion.group is empty"));
        }
        Ok(())
    }

    /// Override selected settings from the process environment.
    ///
    /// Used by the Lambda deployment, where no config file is bundled.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bucket) = std::env::var("S3_BUCKET") {
            self.storage.backend = StorageBackend::S3;
            self.storage.bucket = bucket;
        }

        if let Ok(prefix) = std::env::var("S3_PREFIX") {
            self.storage.prefix = prefix;
        }

        if let Ok(url) = std::env::var("GATEWAY_URL") {
            self.gateway.base_url = url;
        }

        if let Ok(timeout) = std::env::var("CRAWL_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.crawler.timeout_secs = secs;
            }
        }

        if let Ok(concurrent) = std::env::var("MAX_CONCURRENT") {
            if let Ok(n) = concurrent.parse() {
                self.crawler.max_concurrent = n;
            }
        }

        if let Ok(delay) = std::env::var("REQUEST_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                self.crawler.request_delay_ms = ms;
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            messages: PageConfig::default(),
            participants: defaults::participant_pages(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
            exclusion: ExclusionConfig::default(),
        }
    }
}

/// Pacing and calendar settings shared by all crawls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for gateway requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between page fetches in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Participant search partitions walked at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Offset east of UTC at which calendar days start, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl CrawlerConfig {
    /// The configured day boundary offset.
    pub fn offset(&self) -> Result<FixedOffset> {
        dates::offset_from_minutes(self.utc_offset_minutes)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            utc_offset_minutes: 0,
        }
    }
}

/// Page size for one kind of crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Records requested per page; the cursor advances by this amount
    #[serde(default = "defaults::message_page_size")]
    pub page_size: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::message_page_size(),
        }
    }
}

/// Remote API gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the session-holding gateway
    #[serde(default = "defaults::gateway_url")]
    pub base_url: String,

    /// Environment variable holding the bearer token, if any
    #[serde(default = "defaults::token_env")]
    pub token_env: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::gateway_url(),
            token_env: defaults::token_env(),
        }
    }
}

/// Where result sets are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

/// Output location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the local backend
    #[serde(default = "defaults::root_dir")]
    pub root_dir: String,

    /// Bucket for the s3 backend
    #[serde(default)]
    pub bucket: String,

    /// Key prefix under which partitions are written
    #[serde(default = "defaults::prefix")]
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root_dir: defaults::root_dir(),
            bucket: String::new(),
            prefix: defaults::prefix(),
        }
    }
}

/// Bot exclusion snapshot settings.
///
/// Snapshots are read from the output storage itself: they are the
/// `users_bot_<DD-MM-YY>_<group>` partitions of an earlier BOT crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Short name of the group whose bot list is used
    #[serde(default = "defaults::exclusion_group")]
    pub group: String,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            group: defaults::exclusion_group(),
        }
    }
}

mod defaults {
    use super::PageConfig;

    // Crawler defaults
    pub fn user_agent() -> String {
        "harvester/0.1".into()
    }
    pub fn timeout() -> u64 {
        60
    }
    pub fn request_delay() -> u64 {
        0
    }
    pub fn max_concurrent() -> usize {
        1
    }

    // Page defaults
    pub fn message_page_size() -> usize {
        500
    }
    pub fn participant_pages() -> PageConfig {
        PageConfig { page_size: 200 }
    }

    // Gateway defaults
    pub fn gateway_url() -> String {
        "http://127.0.0.1:8080/".into()
    }
    pub fn token_env() -> String {
        "GATEWAY_TOKEN".into()
    }

    // Storage defaults
    pub fn root_dir() -> String {
        "storage".into()
    }
    pub fn prefix() -> String {
        "telegram".into()
    }

    // Exclusion defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn exclusion_group() -> String {
        "walkwithsteptelegram".into()
    }
}
