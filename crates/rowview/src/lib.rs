//! Row-addressable views over a SQLite database.
//!
//! A [`Session`] opens a database and exposes every base table as a
//! [`Relation`]. Relations can be filtered, sorted, and limited; each
//! derivation materializes as a transient SQL view whose rows are ranked by
//! a synthetic, contiguous 1-based identity column. That identity column is
//! what makes positional access (`at`, `select`, `span`) work identically on
//! tables and on arbitrarily derived views.
//!
//! Query results flow through a byte-budgeted result cache shared by the
//! whole session, and a warm-up scheduler can pre-compute per-column
//! aggregates so the first interactive queries land on warm entries.
//!
//! ```no_run
//! use rowview::{Session, SessionConfig, Span};
//!
//! # fn main() -> rowview_core::Result<()> {
//! let session = Session::open("trades.db", SessionConfig::default())?;
//! let trades = session.table("trades")?;
//!
//! // last five rows of the table, in reverse
//! let tail = trades.positional()?.span(&Span::new(None, None, -1)?)?;
//! let _ = &tail[..5.min(tail.len())];
//!
//! // rows where price > 100, re-ranked from 1
//! let expensive = trades.filter(&trades.column("price")?.gt(100.0))?;
//! assert_eq!(expensive.positional()?.at(0)?.len(), trades.columns()?.len());
//! session.close();
//! # Ok(())
//! # }
//! ```

mod cached;
mod column;
mod config;
mod materialize;
mod predicate;
mod relation;
mod resolve;
mod session;
mod warmup;

pub use cached::CachedEngine;
pub use column::Column;
pub use config::SessionConfig;
pub use materialize::{Direction, Ordering, IDENTITY_ALIAS};
pub use predicate::Predicate;
pub use relation::{Relation, RelationKind};
pub use resolve::{IndexRequest, Positional, Resolved, Span};
pub use session::Session;
pub use warmup::{populate, warm_up, CancelToken};

pub use rowview_cache::{CacheConfig, CacheStats, EvictionPolicy, ResultCache};
pub use rowview_core::{ColumnInfo, Result, Row, RowviewError, Schema, Value};
pub use rowview_engine::StorageEngine;
