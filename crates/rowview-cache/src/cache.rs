//! Admission-controlled result cache.
//!
//! Keys are the literal query text, byte for byte; two textually different
//! spellings of the same query are distinct entries. Admission compares the
//! combined size of query text and result rows against a per-item budget
//! and a total budget. The check-then-insert sequence runs under one lock,
//! so concurrent warm-up workers cannot over-admit.

use crate::config::{CacheConfig, EvictionPolicy};
use crate::stats::CacheStats;
use ahash::RandomState;
use lru::LruCache;
use parking_lot::Mutex;
use rowview_core::{row_bytes, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A cached result set. Never mutated after admission.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The rows produced by the query
    pub rows: Vec<Row>,
    /// Combined size of query text and rows in bytes
    pub size_bytes: usize,
}

/// Combined byte cost of a query and its result, used for admission.
pub fn entry_cost(query: &str, rows: &[Row]) -> usize {
    query.len() + rows.iter().map(row_bytes).sum::<usize>()
}

enum Store {
    AdmitOnly(HashMap<String, CacheEntry, RandomState>),
    Lru(LruCache<String, CacheEntry, RandomState>),
}

impl Store {
    fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        match self {
            Store::AdmitOnly(map) => map.get(key),
            // get() promotes the entry's recency
            Store::Lru(map) => map.get(key),
        }
    }

    fn insert(&mut self, key: String, entry: CacheEntry) -> Option<CacheEntry> {
        match self {
            Store::AdmitOnly(map) => map.insert(key, entry),
            Store::Lru(map) => map.put(key, entry),
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        match self {
            Store::AdmitOnly(map) => map.remove(key),
            Store::Lru(map) => map.pop(key),
        }
    }

    fn len(&self) -> usize {
        match self {
            Store::AdmitOnly(map) => map.len(),
            Store::Lru(map) => map.len(),
        }
    }
}

struct CacheState {
    store: Store,
    total_bytes: usize,
}

/// Shared, thread-safe result cache with byte-budgeted admission control.
pub struct ResultCache {
    state: Mutex<CacheState>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
    /// Number of relations known when the cache was constructed; readiness
    /// means warm-up has completed for all of them.
    known_relations: usize,
    ready_count: AtomicUsize,
}

impl ResultCache {
    /// Create a cache expecting warm-up over `known_relations` relations.
    pub fn new(config: CacheConfig, known_relations: usize) -> Self {
        let store = match config.policy {
            EvictionPolicy::AdmitOnly => Store::AdmitOnly(HashMap::default()),
            EvictionPolicy::Lru => Store::Lru(LruCache::unbounded_with_hasher(RandomState::new())),
        };
        Self {
            state: Mutex::new(CacheState {
                store,
                total_bytes: 0,
            }),
            config,
            stats: Arc::new(CacheStats::new()),
            known_relations,
            ready_count: AtomicUsize::new(0),
        }
    }

    /// Create a cache with default configuration and no expected relations.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default(), 0)
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Look up a result by its literal query text.
    pub fn get(&self, query: &str) -> Option<Vec<Row>> {
        if !self.config.enabled {
            return None;
        }

        let mut state = self.state.lock();
        match state.store.get(query) {
            Some(entry) => {
                let rows = entry.rows.clone();
                self.stats.record_hit();
                Some(rows)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Offer a result for admission. Returns true if it was cached.
    ///
    /// Oversized items are rejected outright. Items that would overflow the
    /// total budget are rejected under `AdmitOnly`, or make room by evicting
    /// least-recently-used entries under `Lru`.
    pub fn admit(&self, query: &str, rows: &[Row]) -> bool {
        if !self.config.enabled {
            return false;
        }

        let size = entry_cost(query, rows);
        if size > self.config.max_item_bytes {
            debug!(size, query, "rejected oversized cache entry");
            self.stats.record_rejection();
            return false;
        }

        let mut state = self.state.lock();

        // bytes a replaced same-key entry would free; the entry itself is
        // only removed once the replacement is certain to be admitted, so a
        // rejected re-admission leaves the existing entry untouched
        let mut replaced_bytes = match state.store.get(query) {
            Some(existing) => existing.size_bytes,
            None => 0,
        };

        if state.total_bytes - replaced_bytes + size > self.config.max_total_bytes {
            match self.config.policy {
                EvictionPolicy::AdmitOnly => {
                    debug!(size, query, "rejected cache entry: budget exhausted");
                    self.stats.record_rejection();
                    return false;
                }
                EvictionPolicy::Lru => {
                    let CacheState { store, total_bytes } = &mut *state;
                    let Store::Lru(map) = store else {
                        unreachable!("Lru policy always builds an Lru store");
                    };
                    while *total_bytes - replaced_bytes + size > self.config.max_total_bytes {
                        match map.pop_lru() {
                            Some((key, evicted)) => {
                                *total_bytes -= evicted.size_bytes;
                                if key == query {
                                    // the entry being replaced: freed, not evicted
                                    replaced_bytes = 0;
                                } else {
                                    self.stats.record_eviction();
                                }
                            }
                            None => break,
                        }
                    }
                    if *total_bytes - replaced_bytes + size > self.config.max_total_bytes {
                        self.stats.record_rejection();
                        return false;
                    }
                }
            }
        }

        if let Some(old) = state.store.remove(query) {
            state.total_bytes -= old.size_bytes;
        }
        let entry = CacheEntry {
            rows: rows.to_vec(),
            size_bytes: size,
        };
        state.store.insert(query.to_string(), entry);
        state.total_bytes += size;
        self.stats.record_insertion();
        self.stats.set_entry_count(state.store.len() as u64);
        self.stats.set_memory_bytes(state.total_bytes as u64);
        true
    }

    /// Mark one relation's warm-up as complete.
    pub fn mark_ready(&self) {
        self.ready_count.fetch_add(1, Ordering::SeqCst);
    }

    /// True once warm-up has completed for every known relation.
    pub fn is_ready(&self) -> bool {
        self.ready_count.load(Ordering::SeqCst) >= self.known_relations
    }

    /// Number of relations whose warm-up has completed.
    pub fn ready_count(&self) -> usize {
        self.ready_count.load(Ordering::SeqCst)
    }

    /// Current number of entries
    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current total size of admitted entries in bytes
    pub fn total_bytes(&self) -> usize {
        self.state.lock().total_bytes
    }

    /// Remove all entries
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.store = match self.config.policy {
            EvictionPolicy::AdmitOnly => Store::AdmitOnly(HashMap::default()),
            EvictionPolicy::Lru => Store::Lru(LruCache::unbounded_with_hasher(RandomState::new())),
        };
        state.total_bytes = 0;
        self.stats.set_entry_count(0);
        self.stats.set_memory_bytes(0);
    }

    /// Get cache statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.len())
            .field("total_bytes", &self.total_bytes())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowview_core::Value;

    /// Rows costing `bytes`; with the 1-byte keys used below the full
    /// entry cost is `bytes + 1`.
    fn rows_of_size(bytes: usize) -> Vec<Row> {
        assert!(bytes % 8 == 0);
        vec![vec![Value::Integer(0); bytes / 8]]
    }

    #[test]
    fn test_entry_cost() {
        let rows = vec![vec![Value::Integer(1), Value::Text("ab".into())]];
        // 8 for the integer, 2 + 24 for the text, 6 for the query
        assert_eq!(entry_cost("SELECT", &rows), 6 + 8 + 26);
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = ResultCache::with_defaults();
        assert!(cache.get("q").is_none());
        assert!(cache.admit("q", &rows_of_size(8)));
        assert_eq!(cache.get("q").unwrap(), rows_of_size(8));

        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[test]
    fn test_key_is_literal_text() {
        let cache = ResultCache::with_defaults();
        cache.admit("SELECT 1", &rows_of_size(8));
        // semantically identical, textually different: distinct entry
        assert!(cache.get("SELECT  1").is_none());
    }

    #[test]
    fn test_admission_budgets() {
        // per-item cap 100, total cap 200
        let config = CacheConfig::new(100, 200);
        let cache = ResultCache::new(config, 0);

        // two entries of cost 81 each fit (162 <= 200)
        assert!(cache.admit("a", &rows_of_size(80)));
        assert!(cache.admit("b", &rows_of_size(80)));
        assert_eq!(cache.total_bytes(), 162);

        // a third entry of cost 41 overflows the total budget (203 > 200)
        // and is rejected; the running total is unchanged
        assert!(!cache.admit("c", &rows_of_size(40)));
        assert_eq!(cache.total_bytes(), 162);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().rejections(), 1);

        // an oversized single item is rejected no matter the budget left
        let roomy = ResultCache::new(CacheConfig::new(100, 1_000_000), 0);
        assert!(!roomy.admit("big", &rows_of_size(104)));
        assert_eq!(roomy.total_bytes(), 0);
    }

    #[test]
    fn test_lru_eviction_makes_room() {
        let config = CacheConfig::new(100, 200).with_policy(EvictionPolicy::Lru);
        let cache = ResultCache::new(config, 0);

        assert!(cache.admit("a", &rows_of_size(80)));
        assert!(cache.admit("b", &rows_of_size(80)));
        // touch "a" so "b" becomes the eviction candidate
        cache.get("a");

        assert!(cache.admit("c", &rows_of_size(80)));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_disabled_cache() {
        let cache = ResultCache::new(CacheConfig::disabled(), 0);
        assert!(!cache.admit("q", &rows_of_size(8)));
        assert!(cache.get("q").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_readmission_replaces() {
        let cache = ResultCache::with_defaults();
        cache.admit("q", &rows_of_size(80));
        cache.admit("q", &rows_of_size(16));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 17);
    }

    #[test]
    fn test_rejected_readmission_keeps_existing_entry() {
        // total cap 90: the first entry (cost 81) fits, a bigger result
        // for the same key (cost 97) does not
        let cache = ResultCache::new(CacheConfig::new(100, 90), 0);
        assert!(cache.admit("q", &rows_of_size(80)));

        assert!(!cache.admit("q", &rows_of_size(96)));

        // admit-only never evicts: the rejected replacement must leave the
        // previously admitted entry servable and fully accounted
        assert_eq!(cache.get("q"), Some(rows_of_size(80)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 81);
        assert_eq!(cache.stats().rejections(), 1);
    }

    #[test]
    fn test_lru_readmission_does_not_evict_own_entry() {
        let config = CacheConfig::new(100, 90).with_policy(EvictionPolicy::Lru);
        let cache = ResultCache::new(config, 0);
        assert!(cache.admit("q", &rows_of_size(80)));

        // replacing "q" only needs the bytes "q" itself frees
        assert!(cache.admit("q", &rows_of_size(88)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 89);
        assert_eq!(cache.stats().evictions(), 0);
    }

    #[test]
    fn test_readiness() {
        let cache = ResultCache::new(CacheConfig::default(), 2);
        assert!(!cache.is_ready());
        cache.mark_ready();
        assert!(!cache.is_ready());
        cache.mark_ready();
        assert!(cache.is_ready());
        assert_eq!(cache.ready_count(), 2);
    }

    #[test]
    fn test_concurrent_admission_stays_within_budget() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(ResultCache::new(CacheConfig::new(100, 400), 0));
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..50 {
                    cache.admit(&format!("q{i}_{j}"), &rows_of_size(80));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.total_bytes() <= 400);
        let expected: usize = cache.stats().insertions() as usize;
        assert_eq!(cache.len(), expected);
    }
}
