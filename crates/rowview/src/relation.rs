//! Relations: base tables and derived views behind one interface.

use crate::cached::CachedEngine;
use crate::column::Column;
use crate::materialize::{self, Ordering, IDENTITY_ALIAS};
use crate::predicate::Predicate;
use crate::resolve::Positional;
use rowview_cache::ResultCache;
use rowview_core::{Result, Row, Schema};
use rowview_engine::ViewRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// How a relation supplies its identity column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// A stored table; the engine provides a native `_rowid_`.
    Base,
    /// A generated view; the backing query aliases a synthetic rank as
    /// `_rowid_`, which also appears in `PRAGMA table_info` and is hidden
    /// from the visible column list.
    View,
}

/// A named, queryable row source: a base table or a derived view.
///
/// Both variants expose the same surface: length, an ordered column list,
/// positional access through the identity column, filtered/sorted/limited
/// derivation, and cached per-column aggregates.
#[derive(Clone)]
pub struct Relation {
    name: String,
    kind: RelationKind,
    exec: CachedEngine,
    registry: Arc<ViewRegistry>,
}

impl Relation {
    pub(crate) fn base(
        name: impl Into<String>,
        exec: CachedEngine,
        registry: Arc<ViewRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Base,
            exec,
            registry,
        }
    }

    pub(crate) fn view(
        name: impl Into<String>,
        exec: CachedEngine,
        registry: Arc<ViewRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::View,
            exec,
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub(crate) fn exec(&self) -> &CachedEngine {
        &self.exec
    }

    pub(crate) fn registry(&self) -> &Arc<ViewRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        self.exec.cache()
    }

    /// The visible schema. For views the identity alias is filtered out:
    /// it addresses rows but is not part of the data.
    pub fn schema(&self) -> Result<Schema> {
        let schema = self.exec.engine().table_info(&self.name)?;
        Ok(match self.kind {
            RelationKind::Base => schema,
            RelationKind::View => schema.without(IDENTITY_ALIAS),
        })
    }

    /// Ordered list of visible column names.
    pub fn columns(&self) -> Result<Vec<String>> {
        Ok(self
            .schema()?
            .names()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// The `SELECT` query producing this relation's visible rows.
    pub(crate) fn select_query(&self) -> Result<String> {
        Ok(match self.kind {
            RelationKind::Base => format!("SELECT * FROM {}", self.name),
            RelationKind::View => {
                format!("SELECT {} FROM {}", self.columns()?.join(", "), self.name)
            }
        })
    }

    /// Like [`select_query`](Self::select_query) but with the identity
    /// column prepended, for fetches keyed by identity.
    pub(crate) fn keyed_query(&self) -> Result<String> {
        Ok(format!(
            "SELECT {IDENTITY_ALIAS}, {} FROM {}",
            self.columns()?.join(", "),
            self.name
        ))
    }

    /// Number of rows (cached).
    pub fn len(&self) -> Result<usize> {
        let rows = self
            .exec
            .execute(&format!("SELECT COUNT(*) FROM {}", self.name))?;
        let count = rows
            .first()
            .and_then(|r| r.first())
            .and_then(|v| v.as_integer())
            .unwrap_or(0);
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// `(rows, columns)` pair.
    pub fn shape(&self) -> Result<(usize, usize)> {
        Ok((self.len()?, self.schema()?.len()))
    }

    /// Fetch the relation's rows directly (uncached), optionally limited.
    pub fn rows(&self, limit: Option<usize>) -> Result<Vec<Row>> {
        let mut sql = self.select_query()?;
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        self.exec.engine().query(&sql)
    }

    /// A random sample of `n` rows.
    pub fn sample(&self, n: usize) -> Result<Vec<Row>> {
        self.exec
            .engine()
            .query(&format!("{} ORDER BY RANDOM() LIMIT {n}", self.select_query()?))
    }

    /// Handle for one column.
    pub fn column(&self, name: &str) -> Result<Column> {
        let schema = self.schema()?;
        let index = schema.index_of(name)?;
        Ok(Column::new(
            self.clone(),
            schema.columns()[index].clone(),
            index,
        ))
    }

    /// Handles for every visible column, in declaration order.
    pub fn items(&self) -> Result<Vec<Column>> {
        Ok(self
            .schema()?
            .columns()
            .iter()
            .enumerate()
            .map(|(index, info)| Column::new(self.clone(), info.clone(), index))
            .collect())
    }

    /// Descriptive statistics for every column.
    pub fn describe(&self) -> Result<BTreeMap<String, BTreeMap<&'static str, rowview_core::Value>>> {
        let mut out = BTreeMap::new();
        for col in self.items()? {
            out.insert(col.name().to_string(), col.describe()?);
        }
        Ok(out)
    }

    /// Positional access with a once-computed length.
    pub fn positional(&self) -> Result<Positional> {
        Positional::new(self)
    }

    /// Derive a view keeping only rows matching `predicate`.
    pub fn filter(&self, predicate: &Predicate) -> Result<Relation> {
        materialize::materialize(self, Some(predicate), &[], None)
    }

    /// Derive a view re-ordered by `orderings`; row identity is re-ranked
    /// over the new order.
    pub fn sort_by(&self, orderings: &[Ordering]) -> Result<Relation> {
        materialize::materialize(self, None, orderings, None)
    }

    /// Derive a view keeping the first `n` rows.
    pub fn limit(&self, n: u64) -> Result<Relation> {
        materialize::materialize(self, None, &[], Some(n))
    }

    /// Derive a view applying any combination of predicate, ordering, and
    /// row limit in one materialization.
    pub fn derive(
        &self,
        predicate: Option<&Predicate>,
        orderings: &[Ordering],
        limit: Option<u64>,
    ) -> Result<Relation> {
        materialize::materialize(self, predicate, orderings, limit)
    }
}

impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}
