//! Session-scoped registry of generated views.
//!
//! Every view the materializer creates is recorded here so that session
//! teardown can drop all of them deterministically.

use crate::engine::StorageEngine;
use parking_lot::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ViewRegistry {
    names: Mutex<Vec<String>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created view for later teardown.
    pub fn register(&self, name: impl Into<String>) {
        let name = name.into();
        debug!(view = %name, "registered view");
        self.names.lock().push(name);
    }

    /// Names of all registered views.
    pub fn names(&self) -> Vec<String> {
        self.names.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.names.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.lock().is_empty()
    }

    /// Drop every registered view. Failures are logged, not raised; the
    /// registry is emptied either way.
    pub fn teardown(&self, engine: &StorageEngine) {
        let names: Vec<String> = self.names.lock().drain(..).collect();
        for name in names {
            if let Err(err) = engine.drop_view(&name) {
                warn!(view = %name, %err, "failed to drop view during teardown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_teardown() {
        let engine = StorageEngine::open_in_memory().unwrap();
        engine
            .run_script("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1), (2);")
            .unwrap();

        let registry = ViewRegistry::new();
        engine.create_view("v1", "SELECT * FROM t").unwrap();
        engine.create_view("v2", "SELECT x FROM t WHERE x > 1").unwrap();
        registry.register("v1");
        registry.register("v2");
        assert_eq!(registry.len(), 2);

        registry.teardown(&engine);
        assert!(registry.is_empty());
        assert!(engine.view_names().unwrap().is_empty());
    }

    #[test]
    fn test_teardown_tolerates_missing_view() {
        let engine = StorageEngine::open_in_memory().unwrap();
        let registry = ViewRegistry::new();
        registry.register("never_created");
        registry.teardown(&engine);
        assert!(registry.is_empty());
    }
}
