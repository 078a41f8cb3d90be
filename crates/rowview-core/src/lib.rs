pub mod error;
pub mod schema;
pub mod types;

pub use error::{Result, RowviewError};
pub use schema::{ColumnInfo, Schema};
pub use types::*;
