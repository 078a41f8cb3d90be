//! Sessions: connection lifecycle, relation discovery, and teardown.

use crate::cached::CachedEngine;
use crate::config::SessionConfig;
use crate::materialize::{ensure_identity_alias, random_view_name};
use crate::relation::Relation;
use crate::warmup::{self, CancelToken};
use parking_lot::Mutex;
use rowview_cache::{CacheStats, ResultCache};
use rowview_core::{Result, Row, RowviewError};
use rowview_engine::{StorageEngine, ViewRegistry};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

const VALID_EXTENSIONS: [&str; 4] = ["db", "sqlite", "sqlite3", "sql"];

/// A connection to one database plus the session-scoped machinery built
/// over it: the result cache, the view registry, and the discovered
/// base-table handles.
///
/// Views created during the session are transient; they are all dropped
/// when the session closes.
pub struct Session {
    engine: StorageEngine,
    exec: CachedEngine,
    registry: Arc<ViewRegistry>,
    relations: HashMap<String, Relation>,
    cancel: CancelToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    torn_down: bool,
}

impl Session {
    /// Open a database file.
    ///
    /// `.db`/`.sqlite`/`.sqlite3` files are opened directly; a `.sql` file
    /// is loaded as a script into a fresh in-memory database. Any other
    /// extension is a configuration error.
    pub fn open(path: impl AsRef<Path>, config: SessionConfig) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let engine = match extension.as_str() {
            "db" | "sqlite" | "sqlite3" => StorageEngine::open(path)?,
            "sql" => {
                let script = std::fs::read_to_string(path).map_err(|err| {
                    RowviewError::Config(format!("cannot read {}: {err}", path.display()))
                })?;
                let engine = StorageEngine::open_in_memory()?;
                engine.run_script(&script)?;
                engine
            }
            other => {
                return Err(RowviewError::Config(format!(
                    "file extension must be one of {} (got '{other}')",
                    VALID_EXTENSIONS.join(", ")
                )))
            }
        };
        Self::bootstrap(engine, config)
    }

    /// Open a fresh in-memory database.
    pub fn open_in_memory(config: SessionConfig) -> Result<Self> {
        Self::bootstrap(StorageEngine::open_in_memory()?, config)
    }

    /// Build the session machinery over an already-open engine: discover
    /// base tables, size the cache's readiness target to them, and kick
    /// off warm-up if configured.
    pub(crate) fn bootstrap(engine: StorageEngine, config: SessionConfig) -> Result<Self> {
        let names = engine.table_names()?;
        let cache = Arc::new(ResultCache::new(config.cache_config(), names.len()));
        let exec = CachedEngine::new(engine.clone(), cache);
        let registry = Arc::new(ViewRegistry::new());

        let relations: HashMap<String, Relation> = names
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    Relation::base(name.clone(), exec.clone(), registry.clone()),
                )
            })
            .collect();

        let session = Self {
            engine,
            exec,
            registry,
            relations,
            cancel: CancelToken::new(),
            workers: Mutex::new(Vec::new()),
            torn_down: false,
        };
        info!(tables = names.len(), "session opened");

        if config.cache_enabled && config.populate_on_start {
            session.warm_up(config.block_until_ready);
        }
        Ok(session)
    }

    /// Handle for a base table, looked up by schema name.
    pub fn table(&self, name: &str) -> Result<Relation> {
        self.relations.get(name).cloned().ok_or_else(|| {
            let mut available: Vec<&str> = self.relations.keys().map(String::as_str).collect();
            available.sort_unstable();
            RowviewError::TableNotFound {
                name: name.to_string(),
                available: available.join(", "),
            }
        })
    }

    /// Handles for every discovered base table.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// Base table names, as currently reported by the engine.
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.engine.table_names()
    }

    /// View names, as currently reported by the engine.
    pub fn view_names(&self) -> Result<Vec<String>> {
        self.engine.view_names()
    }

    /// Run an ad-hoc query through the result cache.
    pub fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        self.exec.execute(sql)
    }

    /// Register a caller-supplied view query as a derived relation.
    ///
    /// The query must alias its identity column as required by the
    /// positional resolver; a query without the alias is rejected here, at
    /// construction time.
    pub fn view_from_query(&self, query: &str) -> Result<Relation> {
        ensure_identity_alias(query)?;
        let name = random_view_name("custom");
        self.engine.create_view(&name, query)?;
        self.registry.register(&name);
        Ok(Relation::view(name, self.exec.clone(), self.registry.clone()))
    }

    /// Start warm-up over every discovered table.
    ///
    /// Blocking mode waits for all workers; otherwise they run in the
    /// background and [`is_ready`](Self::is_ready) can be polled.
    pub fn warm_up(&self, block: bool) {
        let relations: Vec<Relation> = self.relations.values().cloned().collect();
        let handles = warmup::warm_up(relations, block, &self.cancel);
        self.workers.lock().extend(handles);
    }

    /// True once warm-up has completed for every discovered table.
    pub fn is_ready(&self) -> bool {
        self.exec.cache().is_ready()
    }

    /// Join any outstanding background warm-up workers.
    pub fn wait_until_ready(&self) {
        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        self.exec.cache()
    }

    pub fn cache_stats(&self) -> Arc<CacheStats> {
        self.exec.cache().stats()
    }

    /// Close the session: cancel and join warm-up workers, then drop every
    /// view created during the session.
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }

        let views = self.registry.len();
        self.registry.teardown(&self.engine);
        info!(views, "session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tables: Vec<&str> = self.relations.keys().map(String::as_str).collect();
        tables.sort_unstable();
        f.debug_struct("Session").field("tables", &tables).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use rowview_core::Value;

    #[test]
    fn test_table_lookup() {
        let session = testing::stocks_session();
        assert!(session.table("stocks").is_ok());
        assert!(matches!(
            session.table("ghost"),
            Err(RowviewError::TableNotFound { .. })
        ));
    }

    #[test]
    fn test_open_rejects_unknown_extension() {
        assert!(matches!(
            Session::open("data/stocks.csv", SessionConfig::default()),
            Err(RowviewError::Config(_))
        ));
    }

    #[test]
    fn test_execute_is_cached() {
        let session = testing::stocks_session();
        let q = "SELECT MAX(price) FROM stocks";
        let first = session.execute(q).unwrap();
        let second = session.execute(q).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0][0], Value::Real(125.34));

        let stats = session.cache_stats();
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.hits(), 1);
    }

    #[test]
    fn test_blocking_warm_up_makes_session_ready() {
        let session = testing::stocks_session();
        assert!(!session.is_ready());
        session.warm_up(true);
        assert!(session.is_ready());
    }

    #[test]
    fn test_nonblocking_warm_up_with_wait() {
        let session = testing::stocks_session();
        session.warm_up(false);
        session.wait_until_ready();
        assert!(session.is_ready());
    }

    #[test]
    fn test_view_from_query() {
        let session = testing::numbers_session(10);
        let view = session
            .view_from_query(
                "SELECT ROW_NUMBER() OVER (ORDER BY n DESC) AS _rowid_, n FROM numbers",
            )
            .unwrap();
        assert_eq!(view.len().unwrap(), 10);
        let top = view.positional().unwrap().at(0).unwrap();
        assert_eq!(top[0], Value::Integer(10));

        // missing identity alias fails at construction
        assert!(matches!(
            session.view_from_query("SELECT n FROM numbers"),
            Err(RowviewError::Config(_))
        ));
    }

    #[test]
    fn test_close_drops_all_views() {
        let session = testing::numbers_session(10);
        let numbers = session.table("numbers").unwrap();
        numbers.limit(3).unwrap();
        numbers.limit(5).unwrap();
        assert_eq!(session.view_names().unwrap().len(), 2);

        let engine = session.engine.clone();
        session.close();
        assert!(engine.view_names().unwrap().is_empty());
    }

    #[test]
    fn test_drop_tears_down_views() {
        let engine;
        {
            let session = testing::numbers_session(5);
            engine = session.engine.clone();
            session.table("numbers").unwrap().limit(2).unwrap();
            assert_eq!(engine.view_names().unwrap().len(), 1);
        }
        assert!(engine.view_names().unwrap().is_empty());
    }
}
