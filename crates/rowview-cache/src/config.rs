//! Cache configuration options

/// How the cache behaves when the total byte budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Reject new entries once the budget is full; never evict. Entries
    /// live for the whole session.
    #[default]
    AdmitOnly,
    /// Evict least-recently-used entries to make room for new ones.
    Lru,
}

/// Configuration for the result cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum size of a single entry in bytes (query text + rows)
    pub max_item_bytes: usize,
    /// Maximum total size of all entries in bytes
    pub max_total_bytes: usize,
    /// Whether caching is enabled
    pub enabled: bool,
    /// Behavior once the byte budget is exhausted
    pub policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_item_bytes: 2 * 1024 * 1024,    // 2 MiB
            max_total_bytes: 100 * 1024 * 1024, // 100 MiB
            enabled: true,
            policy: EvictionPolicy::AdmitOnly,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom budgets
    pub fn new(max_item_bytes: usize, max_total_bytes: usize) -> Self {
        Self {
            max_item_bytes,
            max_total_bytes,
            ..Default::default()
        }
    }

    /// Create a disabled cache configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the per-item byte budget
    pub fn with_max_item_bytes(mut self, max_item_bytes: usize) -> Self {
        self.max_item_bytes = max_item_bytes;
        self
    }

    /// Set the total byte budget
    pub fn with_max_total_bytes(mut self, max_total_bytes: usize) -> Self {
        self.max_total_bytes = max_total_bytes;
        self
    }

    /// Enable or disable the cache
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the eviction policy
    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }
}
