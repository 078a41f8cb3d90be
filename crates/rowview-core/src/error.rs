use thiserror::Error;

#[derive(Error, Debug)]
pub enum RowviewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index out of range: {index} (valid range: -{len}..{len})")]
    Bounds { index: i64, len: usize },

    #[error("Cannot combine predicates from different relations ({left} and {right})")]
    PredicateMismatch { left: String, right: String },

    #[error("Table not found: {name}, must be one of: {available}")]
    TableNotFound { name: String, available: String },

    #[error("Column not found: {name}, must be one of: {available}")]
    ColumnNotFound { name: String, available: String },

    #[error("Column {column} is not numeric (declared type: {sql_type})")]
    NonNumeric { column: String, sql_type: String },

    #[error("Engine error: {0}")]
    Engine(#[from] rusqlite::Error),

    #[error("Internal consistency error: {0}")]
    Internal(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, RowviewError>;
