//! Cached query execution
//!
//! Wraps the storage engine with the bounded result cache: hits skip the
//! engine entirely, misses execute and then offer the result for admission.

use rowview_cache::ResultCache;
use rowview_core::{Result, Row};
use rowview_engine::StorageEngine;
use std::sync::Arc;

/// A storage engine handle with built-in result caching, cheap to clone.
#[derive(Clone)]
pub struct CachedEngine {
    engine: StorageEngine,
    cache: Arc<ResultCache>,
}

impl CachedEngine {
    pub fn new(engine: StorageEngine, cache: Arc<ResultCache>) -> Self {
        Self { engine, cache }
    }

    /// Execute a query through the cache.
    ///
    /// On a hit the stored rows are returned with no engine round-trip. On
    /// a miss the query runs against the engine and the result is offered
    /// for admission. Engine errors propagate unchanged and nothing is
    /// admitted for a failed query.
    pub fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        if let Some(rows) = self.cache.get(sql) {
            return Ok(rows);
        }
        let rows = self.engine.query(sql)?;
        self.cache.admit(sql, &rows);
        Ok(rows)
    }

    /// The underlying engine, for queries that should bypass the cache.
    pub fn engine(&self) -> &StorageEngine {
        &self.engine
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }
}

impl std::fmt::Debug for CachedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedEngine")
            .field("cache", &self.cache)
            .finish()
    }
}
