use rusqlite::types::ValueRef;

/// A single cell value, mirroring SQLite's storage classes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Approximate in-memory footprint, used for cache byte accounting.
    pub fn approx_bytes(&self) -> usize {
        match self {
            Value::Null => 8,
            Value::Integer(_) => 8,
            Value::Real(_) => 8,
            Value::Text(s) => s.len() + 24,
            Value::Blob(b) => b.len() + 24,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer value, if this is an `Integer`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value widened to `f64`, if this is an `Integer` or `Real`.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// One result row as fetched from the engine.
pub type Row = Vec<Value>;

/// Approximate byte cost of a row.
pub fn row_bytes(row: &Row) -> usize {
    row.iter().map(Value::approx_bytes).sum()
}

/// Conversion of primitive values into SQL literal text.
///
/// Only primitives are covered; no escaping beyond single-quote doubling is
/// performed (matching the engine's literal syntax).
pub trait ToSqlLiteral {
    fn to_sql_literal(&self) -> String;
}

impl ToSqlLiteral for &str {
    fn to_sql_literal(&self) -> String {
        format!("'{}'", self.replace('\'', "''"))
    }
}

impl ToSqlLiteral for String {
    fn to_sql_literal(&self) -> String {
        self.as_str().to_sql_literal()
    }
}

impl ToSqlLiteral for i64 {
    fn to_sql_literal(&self) -> String {
        self.to_string()
    }
}

impl ToSqlLiteral for i32 {
    fn to_sql_literal(&self) -> String {
        self.to_string()
    }
}

impl ToSqlLiteral for f64 {
    fn to_sql_literal(&self) -> String {
        self.to_string()
    }
}

impl ToSqlLiteral for bool {
    fn to_sql_literal(&self) -> String {
        if *self { "true".into() } else { "false".into() }
    }
}

impl ToSqlLiteral for Value {
    fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".into(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Text(s) => s.as_str().to_sql_literal(),
            Value::Blob(_) => "NULL".into(),
        }
    }
}

/// Render an iterator of literals as an SQL tuple: `(1, 2, 3)`.
pub fn sql_tuple<T: ToSqlLiteral>(items: impl IntoIterator<Item = T>) -> String {
    let parts: Vec<String> = items.into_iter().map(|x| x.to_sql_literal()).collect();
    format!("({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_ref() {
        assert_eq!(Value::from(ValueRef::Integer(7)), Value::Integer(7));
        assert_eq!(Value::from(ValueRef::Null), Value::Null);
        assert_eq!(
            Value::from(ValueRef::Text(b"abc")),
            Value::Text("abc".into())
        );
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!("it's".to_sql_literal(), "'it''s'");
        assert_eq!(42i64.to_sql_literal(), "42");
        assert_eq!(true.to_sql_literal(), "true");
        assert_eq!(2.5f64.to_sql_literal(), "2.5");
    }

    #[test]
    fn test_sql_tuple() {
        assert_eq!(sql_tuple([1i64, 2, 3]), "(1, 2, 3)");
        assert_eq!(sql_tuple(["a", "b"]), "('a', 'b')");
        assert_eq!(sql_tuple::<i64>([]), "()");
    }

    #[test]
    fn test_approx_bytes() {
        assert_eq!(Value::Integer(1).approx_bytes(), 8);
        assert_eq!(Value::Text("abcd".into()).approx_bytes(), 28);
        assert_eq!(row_bytes(&vec![Value::Integer(1), Value::Null]), 16);
    }
}
