//! Cache warm-up.
//!
//! Pre-executes the aggregate queries callers are most likely to issue so
//! later calls hit cache. One worker runs per relation; relations are
//! independent and no cross-relation ordering is guaranteed.

use crate::relation::Relation;
use rowview_core::{Result, RowviewError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Relations at or above this row count skip the grouping queries
/// (mode/unique/value_counts), which scale with cardinality.
const GROUPING_ROW_LIMIT: usize = 1_000_000;

/// Cooperative cancellation flag shared between a session and its warm-up
/// workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Run the descriptive query set for one relation, then mark the cache
/// ready for it.
///
/// Covers the relation's length and schema, and per column: count, null
/// count, min and max; numeric columns additionally sum, avg, and median;
/// integer/text columns of smaller relations additionally mode, unique,
/// and value_counts. Cancellation is checked before each column's batch.
pub fn populate(relation: &Relation, cancel: &CancelToken) -> Result<()> {
    let schema = relation.schema()?;
    let len = relation.len()?;

    for info in schema.columns() {
        if cancel.is_cancelled() {
            return Err(RowviewError::Cancelled);
        }
        let column = relation.column(info.name())?;
        column.count()?;
        column.na_count()?;
        column.min()?;
        column.max()?;

        if info.is_numeric() {
            column.sum()?;
            column.avg()?;
            column.median()?;
        }
        if info.is_bounded_cardinality() && len < GROUPING_ROW_LIMIT {
            column.mode()?;
            column.unique()?;
            column.value_counts()?;
        }
    }

    relation.cache().mark_ready();
    debug!(relation = %relation.name(), "warm-up complete");
    Ok(())
}

/// Fan out one worker per relation, each populating the shared cache.
///
/// With `block` set, every worker is joined before returning and the
/// returned vec is empty; otherwise the handles are returned so the caller
/// can join them later. Worker failures are logged, never raised.
pub fn warm_up(
    relations: Vec<Relation>,
    block: bool,
    cancel: &CancelToken,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(relations.len());
    for relation in relations {
        let cancel = cancel.clone();
        handles.push(std::thread::spawn(move || {
            match populate(&relation, &cancel) {
                Ok(()) => {}
                Err(RowviewError::Cancelled) => {
                    debug!(relation = %relation.name(), "warm-up cancelled");
                }
                Err(err) => {
                    warn!(relation = %relation.name(), %err, "warm-up failed");
                }
            }
        }));
    }

    if block {
        for handle in handles.drain(..) {
            let _ = handle.join();
        }
    }
    handles
}
