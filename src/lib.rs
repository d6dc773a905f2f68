//! sqon - MySQL and PostgreSQL query results as structured JSON documents
//!
//! # Example
//! ```ignore
//! use sqon::{Backend, Connection, ConnectionConfig};
//!
//! sqon::init();
//!
//! let config = ConnectionConfig::new(Backend::Mysql)
//!     .host("localhost")
//!     .user("root")
//!     .database("app");
//! let mut conn = Connection::new(config)?;
//!
//! // [{"id": 1, "name": "Ann"}, {"id": 2, "name": "Bo"}]
//! let rows = conn.query("SELECT id, name FROM users", None).await?;
//!
//! // {"1": {"name": "Ann"}, "2": {"name": "Bo"}}
//! let key = conn.primary_key_of("users").await?;
//! let by_id = conn.query("SELECT id, name FROM users", Some(&key)).await?;
//!
//! let name = conn.escape("O'Brien", true).await?;
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod escape;
pub mod materialize;
pub mod schema;
pub mod traits;
pub mod types;

mod connection;

// Re-export main types for convenient access
pub use config::{Backend, ConnectionConfig};
pub use connection::{Connection, ConnectionScope};
pub use drivers::init;
pub use error::{DriverError, ErrorKind, Result, SqonError};
pub use traits::{DatabaseDriver, DriverSession};
pub use types::{RawResultSet, Record, RecordDocument, SqlValue};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the structured query object notation contract implemented here.
pub const C_API_VERSION: &str = "1.2";
