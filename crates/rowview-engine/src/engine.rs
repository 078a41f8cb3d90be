//! Thread-safe wrapper around a single SQLite connection.
//!
//! All statement execution serializes on a connection-level lock so that
//! warm-up workers and foreground callers can share one connection.

use parking_lot::Mutex;
use rowview_core::{ColumnInfo, Result, Row, RowviewError, Schema, Value};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Handle to the backing SQLite database, cheap to clone.
#[derive(Clone)]
pub struct StorageEngine {
    conn: Arc<Mutex<Connection>>,
}

impl StorageEngine {
    /// Open a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    /// Open a fresh in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a query and collect every row.
    pub fn query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!(sql, "executing query");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let ncols = stmt.column_count();
        let mut out = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(ncols);
            for i in 0..ncols {
                values.push(Value::from(row.get_ref(i)?));
            }
            out.push(values);
        }
        Ok(out)
    }

    /// Execute a statement that returns no rows (DDL/DML).
    pub fn execute(&self, sql: &str) -> Result<usize> {
        debug!(sql, "executing statement");
        let conn = self.conn.lock();
        Ok(conn.execute(sql, [])?)
    }

    /// Execute a multi-statement SQL script.
    pub fn run_script(&self, script: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(script)?;
        Ok(())
    }

    /// Names of all base tables in the database.
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.object_names("table")
    }

    /// Names of all views in the database.
    pub fn view_names(&self) -> Result<Vec<String>> {
        self.object_names("view")
    }

    fn object_names(&self, kind: &str) -> Result<Vec<String>> {
        let rows = self.query(&format!(
            "SELECT name FROM sqlite_master WHERE type = '{kind}' AND name NOT LIKE 'sqlite_%'"
        ))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_iter().next() {
                Some(Value::Text(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Schema of a table or view via `PRAGMA table_info`.
    ///
    /// Returns `TableNotFound` when the pragma reports no columns.
    pub fn table_info(&self, name: &str) -> Result<Schema> {
        let rows = self.query(&format!("PRAGMA table_info('{name}')"))?;
        if rows.is_empty() {
            let mut available = self.table_names()?;
            available.extend(self.view_names()?);
            return Err(RowviewError::TableNotFound {
                name: name.to_string(),
                available: available.join(", "),
            });
        }

        // table_info rows: (cid, name, type, notnull, dflt_value, pk)
        let columns = rows
            .into_iter()
            .map(|row| {
                let col_name = row
                    .get(1)
                    .and_then(|v| v.as_text())
                    .unwrap_or_default()
                    .to_string();
                let sql_type = row
                    .get(2)
                    .and_then(|v| v.as_text())
                    .unwrap_or_default()
                    .to_string();
                let notnull = row.get(3).and_then(|v| v.as_integer()).unwrap_or(0) != 0;
                let pk = row.get(5).and_then(|v| v.as_integer()).unwrap_or(0) != 0;
                ColumnInfo::new(col_name, sql_type, notnull, pk)
            })
            .collect();
        Ok(Schema::new(columns))
    }

    /// Create a view backed by `query`.
    ///
    /// Fails with a configuration error if a view with that name exists.
    pub fn create_view(&self, name: &str, query: &str) -> Result<()> {
        if self.view_names()?.iter().any(|v| v == name) {
            return Err(RowviewError::Config(format!(
                "view '{name}' already exists"
            )));
        }
        self.execute(&format!("CREATE VIEW {name} AS {query}"))?;
        Ok(())
    }

    /// Drop a view by name.
    pub fn drop_view(&self, name: &str) -> Result<()> {
        self.execute(&format!("DROP VIEW {name}"))?;
        Ok(())
    }
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine").finish()
    }
}
