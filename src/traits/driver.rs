use async_trait::async_trait;

use crate::config::{Backend, ConnectionConfig};
use crate::error::DriverError;
use crate::types::RawResultSet;

/// Result of a driver call, before translation.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Opening physical sessions to the database
/// - Converting native column values to SqlValue
/// - Classifying backend failures into status codes
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// The backend this driver talks to.
    fn backend(&self) -> Backend;

    /// Open a new physical session.
    async fn open(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn DriverSession>>;

    /// Whether escaping depends on session state (character set, SQL mode).
    /// When true, [`DriverSession::escape`] is used instead of [`DatabaseDriver::escape`].
    fn escape_needs_session(&self) -> bool {
        false
    }

    /// Escape text without a session.
    fn escape(&self, text: &str) -> DriverResult<String>;
}

/// One open session to a database server.
/// Sessions release their resources when dropped; `close` does so gracefully.
#[async_trait]
pub trait DriverSession: Send {
    /// Execute SQL text and return the column names and rows it produced.
    async fn execute(&mut self, sql: &str) -> DriverResult<RawResultSet>;

    /// Escape text using the session's current settings.
    fn escape(&self, text: &str) -> DriverResult<String>;

    /// Names of the columns making up the table's primary key, in key order.
    async fn primary_key_columns(&mut self, table: &str) -> DriverResult<Vec<String>>;

    /// Close the session.
    async fn close(self: Box<Self>);
}
