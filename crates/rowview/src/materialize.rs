//! View materialization.
//!
//! Turns a relation plus optional predicate/ordering/limit into a derived
//! view whose backing query carries a synthetic, 1-based, gap-free identity
//! column aliased as [`IDENTITY_ALIAS`]. The rank is computed over the
//! *final* row order, so positional access reflects what a caller sees.

use crate::predicate::Predicate;
use crate::relation::Relation;
use rand::Rng;
use rowview_core::{Result, RowviewError};
use tracing::debug;

/// Reserved alias for the identity column of every materialized view.
///
/// Matches SQLite's hidden rowid name on base tables, so one addressing
/// scheme serves both relation variants. Derived result sets have no
/// native rowid, which is why the alias must be baked into the view query.
pub const IDENTITY_ALIAS: &str = "_rowid_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// One sort key for view materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub column: String,
    pub direction: Direction,
}

impl Ordering {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Descending,
        }
    }

    fn as_sql(&self) -> String {
        format!("{} {}", self.column, self.direction.as_sql())
    }
}

/// Reject a view query that does not alias its identity column.
///
/// The positional resolver addresses rows through the alias, so a custom
/// query without it would fail at read time in confusing ways; surface the
/// problem at construction instead.
pub fn ensure_identity_alias(query: &str) -> Result<()> {
    let needle = format!("as {IDENTITY_ALIAS}");
    if !query.to_lowercase().contains(&needle) {
        return Err(RowviewError::Config(format!(
            "view query must alias its identity column with 'AS {IDENTITY_ALIAS}': {query}"
        )));
    }
    Ok(())
}

/// A unique view name: source name plus a random suffix, so independent
/// derivations of the same relation never collide.
pub(crate) fn random_view_name(base: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..10)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect();
    format!("_view_{base}_{suffix}_")
}

/// Materialize a derived view over `source`.
///
/// The backing query filters by `predicate`, orders by `orderings`, ranks
/// the final order into the identity alias, and optionally keeps the first
/// `limit` rows. Deriving from a view wraps the view's name, so its
/// predicate and ordering are already baked into the subquery; filters
/// compose conjunctively, while re-sorting re-ranks from scratch.
pub(crate) fn materialize(
    source: &Relation,
    predicate: Option<&Predicate>,
    orderings: &[Ordering],
    limit: Option<u64>,
) -> Result<Relation> {
    if let Some(pred) = predicate {
        if pred.relation() != source.name() {
            return Err(RowviewError::Config(format!(
                "predicate belongs to relation '{}' but the view is derived from '{}'",
                pred.relation(),
                source.name()
            )));
        }
    }

    let schema = source.schema()?;
    for ordering in orderings {
        // fail fast on unknown sort columns
        schema.column(&ordering.column)?;
    }
    let columns = schema.names().join(", ");

    // with no explicit ordering, rank over the source's own identity so
    // the previous row order is preserved
    let order_sql = if orderings.is_empty() {
        IDENTITY_ALIAS.to_string()
    } else {
        orderings
            .iter()
            .map(Ordering::as_sql)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut query = format!(
        "SELECT ROW_NUMBER() OVER (ORDER BY {order_sql}) AS {IDENTITY_ALIAS}, {columns} FROM {}",
        source.name()
    );
    if let Some(pred) = predicate {
        query.push_str(&format!(" WHERE {}", pred.fragment()));
    }
    if let Some(n) = limit {
        // ranks are assigned over the whole filtered set first, so the
        // kept rows carry identities 1..=n
        query.push_str(&format!(" ORDER BY {IDENTITY_ALIAS} LIMIT {n}"));
    }

    let name = random_view_name(source.name());
    debug!(view = %name, %query, "materializing view");
    source.exec().engine().create_view(&name, &query)?;
    source.registry().register(&name);

    Ok(Relation::view(name, source.exec().clone(), source.registry().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationKind;
    use crate::testing;
    use rowview_core::Value;

    #[test]
    fn test_filter_reassigns_contiguous_identity() {
        let session = testing::numbers_session(40);
        let numbers = session.table("numbers").unwrap();

        // 15 matching rows scattered across the base table
        let pred = numbers.column("n").unwrap().le(15i64);
        let view = numbers.filter(&pred).unwrap();
        assert_eq!(view.kind(), RelationKind::View);
        assert_eq!(view.len().unwrap(), 15);

        // identity is 1..=15 and gap-free regardless of source identities
        let identities = view
            .exec()
            .engine()
            .query(&format!("SELECT {IDENTITY_ALIAS} FROM {}", view.name()))
            .unwrap();
        let got: Vec<i64> = identities
            .iter()
            .map(|row| row[0].as_integer().unwrap())
            .collect();
        assert_eq!(got, (1..=15).collect::<Vec<i64>>());
    }

    #[test]
    fn test_identity_hidden_from_columns() {
        let session = testing::stocks_session();
        let stocks = session.table("stocks").unwrap();
        let pred = stocks.column("active").unwrap().eq(1i64);
        let view = stocks.filter(&pred).unwrap();
        assert_eq!(view.columns().unwrap(), vec!["symbol", "price", "active"]);
    }

    #[test]
    fn test_sort_ranks_after_ordering() {
        let session = testing::stocks_session();
        let stocks = session.table("stocks").unwrap();
        let sorted = stocks.sort_by(&[Ordering::desc("price")]).unwrap();

        // position 0 must be the most expensive row, not storage order
        let top = sorted.positional().unwrap().at(0).unwrap();
        assert_eq!(top[0], Value::Text("AAPL".into()));

        // NULL prices sort last under DESC
        let bottom = sorted.positional().unwrap().at(-1).unwrap();
        assert_eq!(bottom[0], Value::Text("PLTR".into()));
    }

    #[test]
    fn test_limit_keeps_leading_identities() {
        let session = testing::numbers_session(30);
        let numbers = session.table("numbers").unwrap();
        let first = numbers.limit(5).unwrap();
        assert_eq!(first.len().unwrap(), 5);
        let rows = first.rows(None).unwrap();
        let ns: Vec<i64> = rows.iter().map(|r| r[0].as_integer().unwrap()).collect();
        assert_eq!(ns, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_refiltering_a_view_composes() {
        let session = testing::numbers_session(20);
        let numbers = session.table("numbers").unwrap();

        let first = numbers.filter(&numbers.column("n").unwrap().gt(5i64)).unwrap();
        let second = first.filter(&first.column("n").unwrap().le(10i64)).unwrap();

        assert_eq!(second.len().unwrap(), 5);
        let rows = second.rows(None).unwrap();
        let ns: Vec<i64> = rows.iter().map(|r| r[0].as_integer().unwrap()).collect();
        assert_eq!(ns, vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_foreign_predicate_rejected() {
        let session = testing::stocks_session();
        let stocks = session.table("stocks").unwrap();
        let foreign = crate::predicate::Predicate::new("x > 1", "elsewhere");
        assert!(matches!(
            stocks.filter(&foreign),
            Err(RowviewError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_sort_column_rejected() {
        let session = testing::stocks_session();
        let stocks = session.table("stocks").unwrap();
        assert!(matches!(
            stocks.sort_by(&[Ordering::asc("ghost")]),
            Err(RowviewError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_ensure_identity_alias() {
        assert!(ensure_identity_alias(
            "SELECT ROW_NUMBER() OVER (ORDER BY x) AS _rowid_, x FROM t"
        )
        .is_ok());
        assert!(matches!(
            ensure_identity_alias("SELECT x FROM t"),
            Err(RowviewError::Config(_))
        ));
    }

    #[test]
    fn test_views_recorded_for_teardown() {
        let session = testing::numbers_session(10);
        let numbers = session.table("numbers").unwrap();
        let before = numbers.registry().len();
        numbers.limit(3).unwrap();
        numbers.limit(4).unwrap();
        assert_eq!(numbers.registry().len(), before + 2);
    }
}
