//! Storage-engine boundary for rowview.
//!
//! Wraps a single SQLite connection behind a lock so multiple workers can
//! share it, and tracks the views created during a session so they can all
//! be dropped at teardown.

pub mod engine;
pub mod registry;

pub use engine::StorageEngine;
pub use registry::ViewRegistry;
