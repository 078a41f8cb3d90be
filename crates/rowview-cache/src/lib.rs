//! Bounded result cache for rowview.
//!
//! Memoizes query outputs under a byte budget with admission control:
//! each candidate entry is accepted or rejected once, at insertion time.
//! The default mode never evicts (entries live for the session); an LRU
//! eviction policy is available as an opt-in alternative.
//!
//! # Features
//!
//! - **Admission control**: per-item and total byte budgets
//! - **Literal keys**: the exact query text, no normalization
//! - **Thread-safe**: check-then-insert is a single critical section
//! - **Readiness**: warm-up completion signal over a known relation set
//! - **Statistics**: hits, misses, insertions, rejections, evictions
//!
//! # Example
//!
//! ```
//! use rowview_cache::{CacheConfig, ResultCache};
//! use rowview_core::Value;
//!
//! let cache = ResultCache::new(CacheConfig::default(), 0);
//! let rows = vec![vec![Value::Integer(42)]];
//!
//! assert!(cache.get("SELECT COUNT(*) FROM t").is_none());
//! cache.admit("SELECT COUNT(*) FROM t", &rows);
//! assert_eq!(cache.get("SELECT COUNT(*) FROM t"), Some(rows));
//! ```

pub mod cache;
pub mod config;
pub mod stats;

pub use cache::{entry_cost, CacheEntry, ResultCache};
pub use config::{CacheConfig, EvictionPolicy};
pub use stats::CacheStats;
