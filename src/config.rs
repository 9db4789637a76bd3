// src/config.rs

//! Configuration loading for deployments without a local filesystem.
//!
//! The Lambda binary keeps `config.toml` next to its output in the blob
//! store. Local runs use `Config::load_or_default` directly.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::storage::BlobStore;

/// Reads `Config` from a key in a blob store.
pub struct StoreConfigLoader {
    store: Arc<dyn BlobStore>,
    key: String,
}

impl StoreConfigLoader {
    pub fn new(store: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Load and parse the config. A missing object is an error.
    pub async fn load(&self) -> Result<Config> {
        log::info!("Loading config from {}", self.key);
        let bytes = self
            .store
            .get(&self.key)
            .await?
            .ok_or_else(|| AppError::config(format!("Config file not found: {}", self.key)))?;

        let text = String::from_utf8(bytes).map_err(|e| {
            AppError::config(format!("Config file {} is not valid UTF-8: {}", self.key, e))
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Load the config, falling back to defaults if it is missing or invalid.
    pub async fn load_or_default(&self) -> Config {
        match self.load().await {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config from {}: {}", self.key, e);
                log::warn!("Using default configuration.");
                Config::default()
            }
        }
    }
}
