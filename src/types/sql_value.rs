use serde_json::{Number, Value};

/// A single column value as produced by a driver.
/// Drivers are responsible for converting their native types to one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Binary(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Converts to a document value. Numbers pass through, everything else is text.
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Number((*i).into()),
            SqlValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Binary(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// The value's natural text form, used as a document key. `None` for NULL.
    pub fn key_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Integer(i) => Some(i.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Binary(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// How a driver should read a column that arrives as text on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnClass {
    Integer,
    Float,
    Boolean,
    Binary,
    Text,
}

impl ColumnClass {
    /// Decodes a textual wire value. Values that do not parse as their
    /// declared class are kept as text rather than dropped.
    pub fn decode(&self, text: &str) -> SqlValue {
        match self {
            ColumnClass::Integer => text
                .parse::<i64>()
                .map(SqlValue::Integer)
                .unwrap_or_else(|_| SqlValue::Text(text.to_string())),
            ColumnClass::Float => text
                .parse::<f64>()
                .map(SqlValue::Float)
                .unwrap_or_else(|_| SqlValue::Text(text.to_string())),
            ColumnClass::Boolean => match text {
                "t" | "true" | "1" => SqlValue::Integer(1),
                "f" | "false" | "0" => SqlValue::Integer(0),
                other => SqlValue::Text(other.to_string()),
            },
            // PostgreSQL hex output: \x0a0b...
            ColumnClass::Binary => match text.strip_prefix("\\x") {
                Some(digits) => hex::decode(digits)
                    .map(SqlValue::Binary)
                    .unwrap_or_else(|_| SqlValue::Binary(text.as_bytes().to_vec())),
                None => SqlValue::Binary(text.as_bytes().to_vec()),
            },
            ColumnClass::Text => SqlValue::Text(text.to_string()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(value as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Binary(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}
