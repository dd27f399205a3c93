//! Engine configuration with TOML file loading.

use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the campaign service
    pub base_url: String,
    /// Per-request time budget enforced by the HTTP client
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Bound on retained processed errors
    pub max_history: usize,
    /// Bound on distinct failure fingerprints
    pub max_patterns: usize,
    /// Concurrent mutations allowed inside a batch
    pub batch_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout_seconds: 30,
            max_retries: 3,
            base_delay_ms: 1000,
            max_history: crate::history::DEFAULT_MAX_HISTORY,
            max_patterns: crate::patterns::DEFAULT_MAX_PATTERNS,
            batch_concurrency: 5,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SyncError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(SyncError::invalid_config("base_url must not be empty"));
        }
        if self.batch_concurrency == 0 {
            return Err(SyncError::invalid_config(
                "batch_concurrency must be at least 1",
            ));
        }
        if self.max_history == 0 {
            return Err(SyncError::invalid_config("max_history must be at least 1"));
        }
        Ok(())
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_history_bounds(mut self, max_history: usize, max_patterns: usize) -> Self {
        self.max_history = max_history;
        self.max_patterns = max_patterns;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}
