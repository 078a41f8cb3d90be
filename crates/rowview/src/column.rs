//! Column handles: cached aggregates and predicate builders.

use crate::predicate::Predicate;
use crate::relation::Relation;
use crate::resolve::Span;
use rowview_core::{ColumnInfo, Result, RowviewError, ToSqlLiteral, Value};
use std::collections::BTreeMap;

/// One column of a relation.
///
/// Aggregates run through the result cache; repeated calls after warm-up
/// never touch the engine.
#[derive(Clone)]
pub struct Column {
    relation: Relation,
    info: ColumnInfo,
    /// Position within the relation's visible rows, resolved once at
    /// construction so projections never re-query the schema.
    index: usize,
}

impl Column {
    pub(crate) fn new(relation: Relation, info: ColumnInfo, index: usize) -> Self {
        Self {
            relation,
            info,
            index,
        }
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// The declared SQL type (e.g. `INTEGER`, `TEXT`, `REAL`).
    pub fn sql_type(&self) -> &str {
        self.info.sql_type()
    }

    /// Whether the declared type has numeric affinity.
    pub fn is_numeric(&self) -> bool {
        self.info.is_numeric()
    }

    fn table(&self) -> &str {
        self.relation.name()
    }

    fn ensure_numeric(&self) -> Result<()> {
        if !self.is_numeric() {
            return Err(RowviewError::NonNumeric {
                column: self.name().to_string(),
                sql_type: self.sql_type().to_string(),
            });
        }
        Ok(())
    }

    /// First cell of the first row of a cached aggregate query.
    fn scalar(&self, sql: &str) -> Result<Value> {
        let rows = self.relation.exec().execute(sql)?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or(Value::Null))
    }

    /// Rows of `(value, count)` pairs from a cached grouping query.
    fn pairs(&self, sql: &str) -> Result<Vec<(Value, i64)>> {
        let rows = self.relation.exec().execute(sql)?;
        rows.into_iter()
            .map(|row| {
                let mut it = row.into_iter();
                let value = it.next().unwrap_or(Value::Null);
                let count = it.next().and_then(|v| v.as_integer()).ok_or_else(|| {
                    RowviewError::Internal("grouping query returned no count".into())
                })?;
                Ok((value, count))
            })
            .collect()
    }

    /// Number of cells, including NULLs.
    pub fn len(&self) -> Result<usize> {
        self.relation.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of non-NULL cells.
    pub fn count(&self) -> Result<i64> {
        let v = self.scalar(&format!(
            "SELECT COUNT({}) FROM {}",
            self.name(),
            self.table()
        ))?;
        Ok(v.as_integer().unwrap_or(0))
    }

    /// Number of NULL cells.
    pub fn na_count(&self) -> Result<i64> {
        let v = self.scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
            self.table(),
            self.name()
        ))?;
        Ok(v.as_integer().unwrap_or(0))
    }

    pub fn min(&self) -> Result<Value> {
        self.scalar(&format!(
            "SELECT MIN({}) FROM {}",
            self.name(),
            self.table()
        ))
    }

    pub fn max(&self) -> Result<Value> {
        self.scalar(&format!(
            "SELECT MAX({}) FROM {}",
            self.name(),
            self.table()
        ))
    }

    /// Sum of all values; `None` when every cell is NULL.
    pub fn sum(&self) -> Result<Option<f64>> {
        self.ensure_numeric()?;
        let v = self.scalar(&format!(
            "SELECT SUM({}) FROM {}",
            self.name(),
            self.table()
        ))?;
        Ok(v.as_real())
    }

    /// Mean of non-NULL values; `None` when every cell is NULL.
    pub fn avg(&self) -> Result<Option<f64>> {
        self.ensure_numeric()?;
        let v = self.scalar(&format!(
            "SELECT AVG({}) FROM {}",
            self.name(),
            self.table()
        ))?;
        Ok(v.as_real())
    }

    /// Median of non-NULL values; `None` when every cell is NULL.
    ///
    /// Computed by ranking the column descending (NULLs sort last) and
    /// picking the middle rank(s).
    pub fn median(&self) -> Result<Option<f64>> {
        self.ensure_numeric()?;
        let count = self.count()?;
        if count == 0 {
            return Ok(None);
        }

        let ranked = |rank_filter: String| {
            format!(
                "SELECT v FROM ( \
                     SELECT {col} AS v, ROW_NUMBER() OVER (ORDER BY {col} DESC) AS rank \
                     FROM {table} \
                 ) WHERE rank {rank_filter}",
                col = self.name(),
                table = self.table()
            )
        };

        if count % 2 == 0 {
            let rows = self
                .relation
                .exec()
                .execute(&ranked(format!("IN ({}, {})", count / 2, count / 2 + 1)))?;
            let mut total = 0.0;
            let mut n = 0;
            for row in &rows {
                if let Some(v) = row.first().and_then(Value::as_real) {
                    total += v;
                    n += 1;
                }
            }
            if n == 0 {
                return Ok(None);
            }
            Ok(Some(total / n as f64))
        } else {
            let middle = self.scalar(&ranked(format!("= {}", count / 2 + 1)))?;
            Ok(middle.as_real())
        }
    }

    /// The most frequent value(s) with their count.
    pub fn mode(&self) -> Result<Vec<(Value, i64)>> {
        self.pairs(&format!(
            "SELECT {col}, COUNT(*) FROM {table} \
             GROUP BY 1 \
             HAVING COUNT(*) >= ( \
                 SELECT COUNT(*) FROM {table} GROUP BY {col} ORDER BY 1 DESC LIMIT 1 \
             )",
            col = self.name(),
            table = self.table()
        ))
    }

    /// Distinct values, in engine order.
    pub fn unique(&self) -> Result<Vec<Value>> {
        let rows = self.relation.exec().execute(&format!(
            "SELECT DISTINCT {} FROM {}",
            self.name(),
            self.table()
        ))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    pub fn has_duplicates(&self) -> Result<bool> {
        let distinct = self.scalar(&format!(
            "SELECT COUNT(DISTINCT {}) FROM {}",
            self.name(),
            self.table()
        ))?;
        Ok(self.len()? as i64 != distinct.as_integer().unwrap_or(0))
    }

    /// Per-value occurrence counts, most frequent first (ties by value).
    pub fn value_counts(&self) -> Result<Vec<(Value, i64)>> {
        self.pairs(&format!(
            "SELECT {col}, COUNT(*) FROM {table} \
             WHERE {col} IS NOT NULL \
             GROUP BY 1 ORDER BY 2 DESC, 1 ASC",
            col = self.name(),
            table = self.table()
        ))
    }

    /// Descriptive statistics: numeric columns get
    /// `len/count/min/max/sum/avg/median`, others `len/count/min/max/unique`.
    pub fn describe(&self) -> Result<BTreeMap<&'static str, Value>> {
        let mut out = BTreeMap::new();
        out.insert("len", Value::Integer(self.len()? as i64));
        out.insert("count", Value::Integer(self.count()?));
        out.insert("min", self.min()?);
        out.insert("max", self.max()?);
        if self.is_numeric() {
            let real = |v: Option<f64>| v.map(Value::Real).unwrap_or(Value::Null);
            out.insert("sum", real(self.sum()?));
            out.insert("avg", real(self.avg()?));
            out.insert("median", real(self.median()?));
        } else {
            out.insert("unique", Value::Integer(self.unique()?.len() as i64));
        }
        Ok(out)
    }

    /// All cell values (uncached), optionally limited.
    pub fn data(&self, limit: Option<usize>) -> Result<Vec<Value>> {
        let mut sql = format!("SELECT {} FROM {}", self.name(), self.table());
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        let rows = self.relation.exec().engine().query(&sql)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    fn project(&self, row: Vec<Value>) -> Result<Value> {
        row.into_iter()
            .nth(self.index)
            .ok_or_else(|| RowviewError::Internal("row narrower than schema".into()))
    }

    /// The cell at `index` (negative counts from the end).
    pub fn at(&self, index: i64) -> Result<Value> {
        let row = self.relation.positional()?.at(index)?;
        self.project(row)
    }

    /// The cells selected by `span`, in requested order.
    pub fn span(&self, span: &Span) -> Result<Vec<Value>> {
        let rows = self.relation.positional()?.span(span)?;
        rows.into_iter().map(|row| self.project(row)).collect()
    }

    /// The cells at each requested index, preserving order and duplicates.
    pub fn select(&self, indices: &[i64]) -> Result<Vec<Value>> {
        let rows = self.relation.positional()?.select(indices)?;
        rows.into_iter().map(|row| self.project(row)).collect()
    }

    // --- predicate builders -------------------------------------------

    fn compare(&self, op: &str, literal: String) -> Predicate {
        Predicate::new(
            format!("{}.{} {op} {literal}", self.table(), self.name()),
            self.table(),
        )
    }

    pub fn gt<V: ToSqlLiteral>(&self, value: V) -> Predicate {
        self.compare(">", value.to_sql_literal())
    }

    pub fn ge<V: ToSqlLiteral>(&self, value: V) -> Predicate {
        self.compare(">=", value.to_sql_literal())
    }

    pub fn lt<V: ToSqlLiteral>(&self, value: V) -> Predicate {
        self.compare("<", value.to_sql_literal())
    }

    pub fn le<V: ToSqlLiteral>(&self, value: V) -> Predicate {
        self.compare("<=", value.to_sql_literal())
    }

    pub fn eq<V: ToSqlLiteral>(&self, value: V) -> Predicate {
        self.compare("=", value.to_sql_literal())
    }

    pub fn ne<V: ToSqlLiteral>(&self, value: V) -> Predicate {
        self.compare("!=", value.to_sql_literal())
    }

    pub fn is_in<V: ToSqlLiteral>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        self.compare("IN", rowview_core::sql_tuple(values))
    }

    pub fn between<V: ToSqlLiteral>(&self, low: V, high: V) -> Predicate {
        Predicate::new(
            format!(
                "{}.{} BETWEEN {} AND {}",
                self.table(),
                self.name(),
                low.to_sql_literal(),
                high.to_sql_literal()
            ),
            self.table(),
        )
    }

    pub fn like(&self, pattern: &str) -> Predicate {
        self.compare("LIKE", pattern.to_sql_literal())
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("relation", &self.table())
            .field("name", &self.name())
            .field("sql_type", &self.sql_type())
            .finish()
    }
}
