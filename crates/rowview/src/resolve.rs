//! Positional index resolution.
//!
//! Translates external positional requests (single index, index list,
//! span) into identity-column queries against a relation. Negative indices
//! count from the end; all requests are bounds-checked against a length
//! computed once per resolver.

use crate::materialize::IDENTITY_ALIAS;
use crate::relation::Relation;
use rowview_core::{sql_tuple, Result, Row, RowviewError};
use std::collections::HashMap;

/// A `start..stop` request with a step, normalized like a Python slice:
/// omitted bounds default to the ends, negative bounds count from the end,
/// and everything is clipped to the relation's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: i64,
}

impl Span {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: i64) -> Result<Self> {
        if step == 0 {
            return Err(RowviewError::Config("span step cannot be zero".into()));
        }
        Ok(Self { start, stop, step })
    }

    /// `start..stop` with step 1.
    pub fn range(start: i64, stop: i64) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }

    /// Same bounds, different step.
    pub fn with_step(self, step: i64) -> Result<Self> {
        Self::new(self.start, self.stop, step)
    }

    /// The whole relation.
    pub fn all() -> Self {
        Self {
            start: None,
            stop: None,
            step: 1,
        }
    }

    /// Absolute 0-based indices selected by this span against `len`.
    pub(crate) fn indices(&self, len: usize) -> Vec<usize> {
        let len = len as i64;
        let (lower, upper) = if self.step > 0 { (0, len) } else { (-1, len - 1) };

        let clip = |bound: Option<i64>, default: i64| match bound {
            None => default,
            Some(v) if v < 0 => (v + len).max(lower),
            Some(v) => v.min(upper),
        };
        let start = clip(self.start, if self.step > 0 { lower } else { upper });
        let stop = clip(self.stop, if self.step > 0 { upper } else { lower });

        let mut out = Vec::new();
        let mut i = start;
        if self.step > 0 {
            while i < stop {
                out.push(i as usize);
                i += self.step;
            }
        } else {
            while i > stop {
                out.push(i as usize);
                i += self.step;
            }
        }
        out
    }
}

/// The request shapes the resolver accepts.
#[derive(Debug, Clone)]
pub enum IndexRequest {
    Single(i64),
    Many(Vec<i64>),
    Span(Span),
}

/// Resolver output: one row for a single index, a row list otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    One(Row),
    Many(Vec<Row>),
}

/// Positional access over one relation.
///
/// The length is computed once at construction and reused across requests;
/// rows addressed through an instance reflect that snapshot.
pub struct Positional {
    relation: Relation,
    len: usize,
}

impl Positional {
    pub(crate) fn new(relation: &Relation) -> Result<Self> {
        Ok(Self {
            relation: relation.clone(),
            len: relation.len()?,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Normalize a possibly negative index and check bounds.
    fn absolute(&self, index: i64) -> Result<usize> {
        let abs = if index < 0 { self.len as i64 + index } else { index };
        if abs < 0 || abs >= self.len as i64 {
            return Err(RowviewError::Bounds {
                index,
                len: self.len,
            });
        }
        Ok(abs as usize)
    }

    /// Fetch rows by identity set, returning `(identity, visible row)`
    /// pairs. Point lookups bypass the cache; their key space is unbounded.
    fn fetch_keyed(&self, identities: &[i64]) -> Result<Vec<(i64, Row)>> {
        let sql = format!(
            "{} WHERE {IDENTITY_ALIAS} IN {}",
            self.relation.keyed_query()?,
            sql_tuple(identities.iter().copied())
        );
        let rows = self.relation.exec().engine().query(&sql)?;
        rows.into_iter()
            .map(|mut row| {
                if row.is_empty() {
                    return Err(RowviewError::Internal(
                        "keyed fetch returned an empty row".into(),
                    ));
                }
                let identity = row.remove(0).as_integer().ok_or_else(|| {
                    RowviewError::Internal("identity column is not an integer".into())
                })?;
                Ok((identity, row))
            })
            .collect()
    }

    /// The row at `index` (identity columns are 1-based).
    pub fn at(&self, index: i64) -> Result<Row> {
        let identity = self.absolute(index)? as i64 + 1;
        let mut fetched = self.fetch_keyed(&[identity])?;
        if fetched.len() != 1 {
            return Err(RowviewError::Internal(format!(
                "identity {identity} matched {} rows in {}",
                fetched.len(),
                self.relation.name()
            )));
        }
        Ok(fetched.remove(0).1)
    }

    /// All rows selected by `span`, in requested order.
    ///
    /// One batched membership fetch; the batch is explicitly re-sorted by
    /// identity per the step's sign, since the engine does not guarantee
    /// `IN (...)` input order.
    pub fn span(&self, span: &Span) -> Result<Vec<Row>> {
        let identities: Vec<i64> = span
            .indices(self.len)
            .into_iter()
            .map(|idx| idx as i64 + 1)
            .collect();
        if identities.is_empty() {
            return Ok(Vec::new());
        }

        let mut fetched = self.fetch_keyed(&identities)?;
        if fetched.len() != identities.len() {
            return Err(RowviewError::Internal(format!(
                "requested {} identities from {} but fetched {}; stale length?",
                identities.len(),
                self.relation.name(),
                fetched.len()
            )));
        }

        if span.step > 0 {
            fetched.sort_by_key(|(identity, _)| *identity);
        } else {
            fetched.sort_by_key(|(identity, _)| std::cmp::Reverse(*identity));
        }
        Ok(fetched.into_iter().map(|(_, row)| row).collect())
    }

    /// The rows at each requested index, preserving caller order and
    /// duplicate count, with a single batched fetch over the distinct
    /// identity set.
    pub fn select(&self, indices: &[i64]) -> Result<Vec<Row>> {
        let identities = indices
            .iter()
            .map(|&idx| Ok(self.absolute(idx)? as i64 + 1))
            .collect::<Result<Vec<i64>>>()?;
        if identities.is_empty() {
            return Ok(Vec::new());
        }

        let mut unique = identities.clone();
        unique.sort_unstable();
        unique.dedup();

        let fetched = self.fetch_keyed(&unique)?;
        if fetched.len() != unique.len() {
            return Err(RowviewError::Internal(format!(
                "requested {} identities from {} but fetched {}; stale length?",
                unique.len(),
                self.relation.name(),
                fetched.len()
            )));
        }

        let by_identity: HashMap<i64, Row> = fetched.into_iter().collect();
        identities
            .iter()
            .map(|identity| {
                // duplicates in the fetch collapse in the map, so a missing
                // key means the relation's identity column is not unique
                by_identity.get(identity).cloned().ok_or_else(|| {
                    RowviewError::Internal(format!(
                        "identity {identity} missing from keyed fetch on {}",
                        self.relation.name()
                    ))
                })
            })
            .collect()
    }

    /// Unified entry point over the three request shapes.
    pub fn resolve(&self, request: &IndexRequest) -> Result<Resolved> {
        match request {
            IndexRequest::Single(idx) => Ok(Resolved::One(self.at(*idx)?)),
            IndexRequest::Many(indices) => Ok(Resolved::Many(self.select(indices)?)),
            IndexRequest::Span(span) => Ok(Resolved::Many(self.span(span)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn nth(row: &Row) -> i64 {
        row[0].as_integer().unwrap()
    }

    #[test]
    fn test_span_indices_match_python_semantics() {
        let span = Span::new(Some(2), Some(24), 2).unwrap();
        assert_eq!(span.indices(30).len(), 11);
        assert_eq!(
            span.indices(30),
            vec![2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22]
        );

        assert_eq!(Span::all().indices(3), vec![0, 1, 2]);
        assert_eq!(Span::range(-2, 10).indices(5), vec![3, 4]);
        // stop clipped past the end
        assert_eq!(Span::range(3, 100).indices(5), vec![3, 4]);
        // reversed
        assert_eq!(
            Span::new(None, None, -1).unwrap().indices(4),
            vec![3, 2, 1, 0]
        );
        assert_eq!(
            Span::new(Some(10), Some(2), -2).unwrap().indices(8),
            vec![7, 5, 3]
        );
        // empty outcomes
        assert_eq!(Span::range(4, 2).indices(10), Vec::<usize>::new());
        assert_eq!(Span::range(0, 5).indices(0), Vec::<usize>::new());
    }

    #[test]
    fn test_zero_step_rejected() {
        assert!(matches!(
            Span::new(None, None, 0),
            Err(RowviewError::Config(_))
        ));
    }

    #[test]
    fn test_single_index_agreement() {
        let session = testing::numbers_session(12);
        let positional = session.table("numbers").unwrap().positional().unwrap();

        // every index in [-n, n) resolves to the row at that position of
        // the declared order (numbers holds 1..=12 in order)
        let n = positional.len() as i64;
        for i in -n..n {
            let row = positional.at(i).unwrap();
            let expected = if i < 0 { n + i + 1 } else { i + 1 };
            assert_eq!(nth(&row), expected, "index {i}");
        }

        for bad in [n, n + 5, -n - 1] {
            assert!(
                matches!(positional.at(bad), Err(RowviewError::Bounds { index, .. }) if index == bad)
            );
        }
    }

    #[test]
    fn test_list_preserves_order_and_duplicates() {
        let session = testing::numbers_session(20);
        let positional = session.table("numbers").unwrap().positional().unwrap();

        let rows = positional.select(&[3, -1, 5, 3, -1]).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], rows[3]);
        assert_eq!(rows[1], rows[4]);
        assert_eq!(nth(&rows[0]), 4);
        assert_eq!(nth(&rows[1]), 20);
        assert_eq!(nth(&rows[2]), 6);
    }

    #[test]
    fn test_list_bounds_error_names_offender() {
        let session = testing::numbers_session(5);
        let positional = session.table("numbers").unwrap().positional().unwrap();
        assert!(matches!(
            positional.select(&[0, 2, 9]),
            Err(RowviewError::Bounds { index: 9, len: 5 })
        ));
    }

    #[test]
    fn test_duplicate_identities_surface_as_internal_error() {
        let session = testing::numbers_session(2);
        // a hand-built view whose identity column is constant: both rows
        // share identity 1, so requesting positions {0, 1} fetches two rows
        // that collapse onto one key
        let broken = session
            .view_from_query("SELECT 1 AS _rowid_, n FROM numbers")
            .unwrap();
        let positional = broken.positional().unwrap();
        assert!(matches!(
            positional.select(&[0, 1]),
            Err(RowviewError::Internal(_))
        ));
    }

    #[test]
    fn test_span_equivalence() {
        let session = testing::numbers_session(30);
        let positional = session.table("numbers").unwrap().positional().unwrap();

        let rows = positional.span(&Span::new(Some(2), Some(24), 2).unwrap()).unwrap();
        assert_eq!(rows.len(), 11);
        let got: Vec<i64> = rows.iter().map(nth).collect();
        assert_eq!(got, vec![3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23]);
    }

    #[test]
    fn test_negative_step_span_returns_requested_order() {
        let session = testing::numbers_session(10);
        let positional = session.table("numbers").unwrap().positional().unwrap();

        let rows = positional.span(&Span::new(None, None, -3).unwrap()).unwrap();
        let got: Vec<i64> = rows.iter().map(nth).collect();
        assert_eq!(got, vec![10, 7, 4, 1]);
    }

    #[test]
    fn test_resolve_shapes() {
        let session = testing::numbers_session(6);
        let positional = session.table("numbers").unwrap().positional().unwrap();

        assert!(matches!(
            positional.resolve(&IndexRequest::Single(0)).unwrap(),
            Resolved::One(_)
        ));
        match positional.resolve(&IndexRequest::Many(vec![0, 1])).unwrap() {
            Resolved::Many(rows) => assert_eq!(rows.len(), 2),
            other => panic!("expected Many, got {other:?}"),
        }
        match positional.resolve(&IndexRequest::Span(Span::all())).unwrap() {
            Resolved::Many(rows) => assert_eq!(rows.len(), 6),
            other => panic!("expected Many, got {other:?}"),
        }
    }

    #[test]
    fn test_positional_on_view() {
        let session = testing::numbers_session(40);
        let numbers = session.table("numbers").unwrap();
        let evens = numbers
            .filter(&crate::predicate::Predicate::new("n % 2 = 0", "numbers"))
            .unwrap();
        let positional = evens.positional().unwrap();
        assert_eq!(positional.len(), 20);

        // view identity is dense, so position i is the (i+1)-th even number
        assert_eq!(nth(&positional.at(0).unwrap()), 2);
        assert_eq!(nth(&positional.at(9).unwrap()), 20);
        assert_eq!(nth(&positional.at(-1).unwrap()), 40);
        assert_eq!(positional.at(0).unwrap().len(), 1);

        let rows = positional.span(&Span::range(0, 3)).unwrap();
        let got: Vec<i64> = rows.iter().map(nth).collect();
        assert_eq!(got, vec![2, 4, 6]);
    }
}
