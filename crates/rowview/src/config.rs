//! Session configuration.

use rowview_cache::{CacheConfig, EvictionPolicy};
use rowview_core::{Result, RowviewError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Memoize aggregate query results for the session
    pub cache_enabled: bool,
    /// Warm the cache for every table when the session opens
    pub populate_on_start: bool,
    /// Make the opening warm-up blocking
    pub block_until_ready: bool,
    /// Per-entry cache budget in bytes (query text + rows)
    pub max_item_bytes: usize,
    /// Total cache budget in bytes
    pub max_total_bytes: usize,
    /// Evict least-recently-used entries instead of rejecting new ones
    /// once the total budget is exhausted
    pub lru_eviction: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            populate_on_start: false,
            block_until_ready: false,
            max_item_bytes: 2 * 1024 * 1024,
            max_total_bytes: 100 * 1024 * 1024,
            lru_eviction: false,
        }
    }
}

impl SessionConfig {
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_populate_on_start(mut self, populate: bool) -> Self {
        self.populate_on_start = populate;
        self
    }

    pub fn with_block_until_ready(mut self, block: bool) -> Self {
        self.block_until_ready = block;
        self
    }

    pub fn with_max_item_bytes(mut self, bytes: usize) -> Self {
        self.max_item_bytes = bytes;
        self
    }

    pub fn with_max_total_bytes(mut self, bytes: usize) -> Self {
        self.max_total_bytes = bytes;
        self
    }

    pub fn with_lru_eviction(mut self, lru: bool) -> Self {
        self.lru_eviction = lru;
        self
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| RowviewError::Config(format!("cannot read {}: {err}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|err| RowviewError::Config(format!("invalid config {}: {err}", path.display())))
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|err| RowviewError::Config(err.to_string()))?;
        std::fs::write(path, contents)
            .map_err(|err| RowviewError::Config(format!("cannot write {}: {err}", path.display())))
    }

    /// The cache configuration this session configuration implies.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_enabled(self.cache_enabled)
            .with_max_item_bytes(self.max_item_bytes)
            .with_max_total_bytes(self.max_total_bytes)
            .with_policy(if self.lru_eviction {
                EvictionPolicy::Lru
            } else {
                EvictionPolicy::AdmitOnly
            })
    }
}
