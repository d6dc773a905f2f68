//! Primary key resolution from backend metadata.

use crate::config::Backend;
use crate::error::{ErrorKind, Result, SqonError};

/// Metadata query listing a table's primary key columns in key order.
/// The table name is bound as the single parameter.
pub fn primary_key_query(backend: Backend) -> &'static str {
    match backend {
        Backend::Mysql => {
            r#"
            SELECT COLUMN_NAME
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = DATABASE()
                AND TABLE_NAME = ?
                AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
            "#
        }
        Backend::Postgres => {
            r#"
            SELECT a.attname::text
            FROM pg_index i
            JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
            WHERE i.indrelid = $1::text::regclass
                AND i.indisprimary
            ORDER BY array_position(i.indkey, a.attnum)
            "#
        }
    }
}

/// Reduces the primary key columns of `table` to the single key column.
///
/// Composite keys are rejected with `PrimaryKeyNotUnique`, tables without a
/// key with `PrimaryKeyNotFound`.
pub fn single_primary_key(table: &str, columns: Vec<String>) -> Result<String> {
    let mut columns = columns.into_iter();
    match (columns.next(), columns.next()) {
        (None, _) => Err(SqonError::with_message(
            ErrorKind::PrimaryKeyNotFound,
            format!("Table '{}' has no primary key", table),
        )),
        (Some(column), None) => Ok(column),
        (Some(_), Some(_)) => Err(SqonError::with_message(
            ErrorKind::PrimaryKeyNotUnique,
            format!("Table '{}' has a composite primary key", table),
        )),
    }
}
