use crate::error::{Result, RowviewError};

/// Metadata for one column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    name: String,
    sql_type: String,
    notnull: bool,
    primary_key: bool,
}

impl ColumnInfo {
    pub fn new(
        name: impl Into<String>,
        sql_type: impl Into<String>,
        notnull: bool,
        primary_key: bool,
    ) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into().to_uppercase(),
            notnull,
            primary_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared SQL type, uppercased (e.g. `INTEGER`, `TEXT`, `REAL`).
    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    pub fn notnull(&self) -> bool {
        self.notnull
    }

    pub fn primary_key(&self) -> bool {
        self.primary_key
    }

    /// Whether the declared type has numeric affinity.
    pub fn is_numeric(&self) -> bool {
        const NUMERIC_MARKERS: [&str; 6] = ["INT", "REAL", "FLOA", "DOUB", "NUM", "DEC"];
        NUMERIC_MARKERS.iter().any(|m| self.sql_type.contains(m))
    }

    /// Whether the column's values are cheap to group by (bounded cardinality
    /// in practice: integer or text affinity).
    pub fn is_bounded_cardinality(&self) -> bool {
        self.sql_type.contains("INT") || self.sql_type.contains("TEXT")
            || self.sql_type.contains("CHAR")
    }
}

/// The ordered column list of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnInfo>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self { columns }
    }

    pub fn empty() -> Self {
        Self { columns: vec![] }
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name() == name)
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| RowviewError::ColumnNotFound {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    pub fn column(&self, name: &str) -> Result<&ColumnInfo> {
        let idx = self.index_of(name)?;
        Ok(&self.columns[idx])
    }

    /// A copy of this schema without the named column.
    pub fn without(&self, name: &str) -> Schema {
        Schema {
            columns: self
                .columns
                .iter()
                .filter(|c| c.name() != name)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new(vec![
            ColumnInfo::new("id", "INTEGER", true, true),
            ColumnInfo::new("name", "TEXT", false, false),
            ColumnInfo::new("price", "REAL", false, false),
        ])
    }

    #[test]
    fn test_numeric_affinity() {
        let schema = sample();
        assert!(schema.column("id").unwrap().is_numeric());
        assert!(schema.column("price").unwrap().is_numeric());
        assert!(!schema.column("name").unwrap().is_numeric());
    }

    #[test]
    fn test_index_of() {
        let schema = sample();
        assert_eq!(schema.index_of("price").unwrap(), 2);
        assert!(matches!(
            schema.index_of("missing"),
            Err(RowviewError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_without() {
        let schema = sample().without("id");
        assert_eq!(schema.names(), vec!["name", "price"]);
    }
}
