//! Boolean filter fragments tied to one owning relation.

use rowview_core::{Result, RowviewError};

/// An immutable SQL filter fragment (e.g. `price BETWEEN 5 AND 15`) owned
/// by a single relation.
///
/// Predicates compose with [`and`](Predicate::and) / [`or`](Predicate::or);
/// combining fragments from different relations is an error. The fragment
/// is pure text; only primitive-to-literal conversion is applied when
/// predicates are built from column comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    fragment: String,
    relation: String,
}

impl Predicate {
    pub fn new(fragment: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            relation: relation.into(),
        }
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Name of the relation this predicate filters.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    fn combine(&self, other: &Predicate, op: &str) -> Result<Predicate> {
        if self.relation != other.relation {
            return Err(RowviewError::PredicateMismatch {
                left: self.relation.clone(),
                right: other.relation.clone(),
            });
        }
        // each side is parenthesized so OR compositions keep their meaning
        Ok(Predicate {
            fragment: format!("({}) {op} ({})", self.fragment, other.fragment),
            relation: self.relation.clone(),
        })
    }

    /// Conjunction of two predicates over the same relation.
    pub fn and(&self, other: &Predicate) -> Result<Predicate> {
        self.combine(other, "AND")
    }

    /// Disjunction of two predicates over the same relation.
    pub fn or(&self, other: &Predicate) -> Result<Predicate> {
        self.combine(other, "OR")
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SELECT ... WHERE {}", self.fragment)
    }
}
