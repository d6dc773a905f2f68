mod document;
mod result_set;
mod sql_value;

pub use document::{Record, RecordDocument};
pub use result_set::RawResultSet;
pub use sql_value::{ColumnClass, SqlValue};
