use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::debug;

use crate::config::{Backend, ConnectionConfig};
use crate::drivers;
use crate::error::{translate, DriverError, ErrorKind, Result, SqonError, CONNECTION_FAILURE};
use crate::escape;
use crate::materialize::materialize;
use crate::schema::single_primary_key;
use crate::traits::{DatabaseDriver, DriverSession};
use crate::types::RecordDocument;

/// Main entry point for sqon.
///
/// Owns at most one physical session to the configured server and counts the
/// logical users of that session. Every query-issuing call connects on demand
/// and lets go again when it is done, so without an explicit [`connect`] the
/// session lives only as long as one call. An explicit [`connect`] keeps it
/// open until the matching [`close`].
///
/// Methods take `&mut self`: one connection runs one statement at a time.
/// Share it across tasks behind a mutex, or open one connection per worker.
///
/// # Example
/// ```ignore
/// sqon::init();
/// let config = ConnectionConfig::new(Backend::Mysql).user("root").database("app");
/// let mut conn = Connection::new(config)?;
///
/// let users = conn.query("SELECT id, name FROM users", Some("id")).await?;
/// // {"1": {"name": "Ann"}, "2": {"name": "Bo"}}
/// ```
///
/// [`connect`]: Connection::connect
/// [`close`]: Connection::close
pub struct Connection {
    config: ConnectionConfig,
    driver: Arc<dyn DatabaseDriver>,
    session: Option<Box<dyn DriverSession>>,
    acquisitions: u64,
}

impl Connection {
    /// Create a disconnected connection using the driver registered for the
    /// configured backend. Requires [`crate::init`] to have run.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let driver = drivers::registered(config.backend())?;
        Self::with_driver(config, driver)
    }

    /// Create a new connection with a custom driver.
    /// Useful for testing or using alternative database drivers.
    pub fn with_driver(config: ConnectionConfig, driver: Arc<dyn DatabaseDriver>) -> Result<Self> {
        if driver.backend() != config.backend() {
            return Err(SqonError::with_message(
                ErrorKind::Unsupported,
                format!(
                    "A {} driver cannot serve a {} connection",
                    driver.backend(),
                    config.backend()
                ),
            ));
        }
        Ok(Self {
            config,
            driver,
            session: None,
            acquisitions: 0,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.config.backend()
    }

    /// Whether a physical session is currently open.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Number of logical users currently holding the connection.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }

    /// Connect to the database, or join the already open session.
    ///
    /// Each successful call must be paired with a [`Connection::close`]. On
    /// failure the connection stays exactly as it was.
    pub async fn connect(&mut self) -> Result<()> {
        if self.session.is_none() {
            let session = self.driver.open(&self.config).await.map_err(translate)?;
            debug!(
                backend = %self.config.backend(),
                host = self.config.host_name(),
                port = self.config.port_number(),
                "opened database session"
            );
            self.session = Some(session);
        }
        self.acquisitions += 1;
        debug!(acquisitions = self.acquisitions, "acquired connection");
        Ok(())
    }

    /// Let go of the connection. The session is closed once the last user lets go.
    /// Closing a connection nobody holds does nothing.
    pub async fn close(&mut self) {
        if let Some(session) = self.release() {
            session.close().await;
            debug!(backend = %self.config.backend(), "closed database session");
        }
    }

    /// Acquire the connection for the lifetime of the returned guard.
    ///
    /// The guard releases on drop, including on early returns and `?`.
    /// [`ConnectionScope::finish`] releases with an awaited, graceful close.
    /// Scopes nest: a scope derefs to the connection and can open another.
    pub async fn scope(&mut self) -> Result<ConnectionScope<'_>> {
        self.connect().await?;
        Ok(ConnectionScope {
            conn: self,
            finished: false,
        })
    }

    /// Run a query and build its document.
    ///
    /// Without a primary key the result is one record per row in backend
    /// order. With one, records are keyed by that column's values, which must
    /// be present and unique.
    pub async fn query(&mut self, sql: &str, primary_key: Option<&str>) -> Result<RecordDocument> {
        self.connect().await?;
        let result = match self.session.as_mut() {
            Some(session) => session.execute(sql).await,
            None => Err(not_connected()),
        };
        self.forget_broken_session(&result);
        self.close().await;

        let raw = result.map_err(translate)?;
        debug!(
            backend = %self.config.backend(),
            columns = raw.columns.len(),
            rows = raw.len(),
            "query executed"
        );
        materialize(raw, primary_key)
    }

    /// Name of the single column forming `table`'s primary key.
    pub async fn primary_key_of(&mut self, table: &str) -> Result<String> {
        self.connect().await?;
        let result = match self.session.as_mut() {
            Some(session) => session.primary_key_columns(table).await,
            None => Err(not_connected()),
        };
        self.forget_broken_session(&result);
        self.close().await;

        single_primary_key(table, result.map_err(translate)?)
    }

    /// Escape `text` for use inside a string literal, optionally wrapped in quotes.
    ///
    /// Backends whose escaping depends on session settings are connected first.
    pub async fn escape(&mut self, text: &str, quote: bool) -> Result<String> {
        let escaped = if self.driver.escape_needs_session() {
            self.connect().await?;
            let result = match self.session.as_ref() {
                Some(session) => session.escape(text),
                None => Err(not_connected()),
            };
            self.close().await;
            result
        } else {
            self.driver.escape(text)
        };

        let escaped = escaped.map_err(translate)?;
        Ok(if quote {
            escape::quote(&escaped)
        } else {
            escaped
        })
    }

    /// Drops one acquisition and hands back the session when it was the last.
    fn release(&mut self) -> Option<Box<dyn DriverSession>> {
        if self.acquisitions == 0 {
            return None;
        }
        self.acquisitions -= 1;
        debug!(acquisitions = self.acquisitions, "released connection");
        if self.acquisitions == 0 {
            self.session.take()
        } else {
            None
        }
    }

    /// A session that lost its server is dropped so the next call reconnects.
    fn forget_broken_session<T>(&mut self, result: &std::result::Result<T, DriverError>) {
        if matches!(result, Err(err) if err.code == CONNECTION_FAILURE) && self.session.take().is_some() {
            debug!(backend = %self.config.backend(), "dropped broken database session");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            debug!(
                backend = %self.config.backend(),
                acquisitions = self.acquisitions,
                "closed database session on drop"
            );
        }
    }
}

fn not_connected() -> DriverError {
    DriverError::connection("Not connected to database")
}

/// A held acquisition of a [`Connection`]. See [`Connection::scope`].
pub struct ConnectionScope<'a> {
    conn: &'a mut Connection,
    finished: bool,
}

impl ConnectionScope<'_> {
    /// Release the acquisition, awaiting a graceful close if it was the last one.
    pub async fn finish(mut self) {
        self.finished = true;
        self.conn.close().await;
    }
}

impl Deref for ConnectionScope<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &*self.conn
    }
}

impl DerefMut for ConnectionScope<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut *self.conn
    }
}

impl Drop for ConnectionScope<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.conn.release().is_some() {
            debug!(backend = %self.conn.config.backend(), "closed database session on scope exit");
        }
    }
}
