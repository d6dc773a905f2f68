use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// One materialized row: column name to value, in column order.
pub type Record = Map<String, Value>;

/// The structured output of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordDocument {
    /// One record per row, in the backend's row order.
    Rows(Vec<Record>),
    /// Records keyed by the primary key's text form; the key column is left out of each record.
    Keyed(Map<String, Value>),
}

impl RecordDocument {
    /// Returns the number of records.
    pub fn len(&self) -> usize {
        match self {
            RecordDocument::Rows(rows) => rows.len(),
            RecordDocument::Keyed(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows of an unkeyed document.
    pub fn as_rows(&self) -> Option<&[Record]> {
        match self {
            RecordDocument::Rows(rows) => Some(rows),
            RecordDocument::Keyed(_) => None,
        }
    }

    /// Looks up a record of a keyed document.
    pub fn get(&self, key: &str) -> Option<&Record> {
        match self {
            RecordDocument::Keyed(map) => map.get(key).and_then(Value::as_object),
            RecordDocument::Rows(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RecordDocument::Rows(rows) => {
                Value::Array(rows.iter().cloned().map(Value::Object).collect())
            }
            RecordDocument::Keyed(map) => Value::Object(map.clone()),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            RecordDocument::Rows(rows) => Value::Array(rows.into_iter().map(Value::Object).collect()),
            RecordDocument::Keyed(map) => Value::Object(map),
        }
    }
}

impl Serialize for RecordDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordDocument::Rows(rows) => rows.serialize(serializer),
            RecordDocument::Keyed(map) => map.serialize(serializer),
        }
    }
}

impl From<RecordDocument> for Value {
    fn from(document: RecordDocument) -> Self {
        document.into_json()
    }
}
