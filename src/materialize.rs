//! Folding a flat driver result into a [`RecordDocument`].

use serde_json::{Map, Value};

use crate::error::{ErrorKind, Result, SqonError};
use crate::types::{RawResultSet, Record, RecordDocument};

/// Builds the document for `raw`, keyed by `primary_key` when one is given.
///
/// Fails with `EmptyResultSet` when the result has no columns, with
/// `PrimaryKeyNotFound` when the key column is absent or NULL in some row, and
/// with `PrimaryKeyNotUnique` when two rows share a key. Nothing is returned on
/// failure.
pub fn materialize(raw: RawResultSet, primary_key: Option<&str>) -> Result<RecordDocument> {
    if raw.columns.is_empty() {
        return Err(SqonError::new(ErrorKind::EmptyResultSet));
    }

    match primary_key {
        None => Ok(RecordDocument::Rows(rows(raw))),
        Some(key) => keyed(raw, key).map(RecordDocument::Keyed),
    }
}

fn rows(raw: RawResultSet) -> Vec<Record> {
    let RawResultSet { columns, rows } = raw;
    rows.into_iter()
        .map(|values| {
            debug_assert_eq!(values.len(), columns.len(), "row width differs from column count");
            columns
                .iter()
                .zip(values.iter())
                .map(|(column, value)| (column.clone(), value.to_json()))
                .collect()
        })
        .collect()
}

fn keyed(raw: RawResultSet, key: &str) -> Result<Map<String, Value>> {
    let key_index = raw.column_index(key).ok_or_else(|| {
        SqonError::with_message(
            ErrorKind::PrimaryKeyNotFound,
            format!("Primary key column '{}' is not in the result set", key),
        )
    })?;

    let mut out = Map::new();
    for (row_number, values) in raw.rows.iter().enumerate() {
        let key_value = values
            .get(key_index)
            .and_then(|value| value.key_text())
            .ok_or_else(|| {
                SqonError::with_message(
                    ErrorKind::PrimaryKeyNotFound,
                    format!("Row {} has no value for primary key '{}'", row_number, key),
                )
            })?;

        if out.contains_key(&key_value) {
            return Err(SqonError::with_message(
                ErrorKind::PrimaryKeyNotUnique,
                format!("Primary key '{}' has duplicate value '{}'", key, key_value),
            ));
        }

        debug_assert_eq!(
            values.len(),
            raw.columns.len(),
            "row width differs from column count"
        );
        let record: Record = raw
            .columns
            .iter()
            .zip(values.iter())
            .filter(|(column, _)| column.as_str() != key)
            .map(|(column, value)| (column.clone(), value.to_json()))
            .collect();
        out.insert(key_value, Value::Object(record));
    }

    Ok(out)
}
