use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::{Backend, ConnectionConfig};
use crate::error::DriverError;
use crate::escape::{escape_mysql, escape_postgres};
use crate::schema::primary_key_query;
use crate::traits::{DatabaseDriver, DriverResult, DriverSession};
use crate::types::{RawResultSet, SqlValue};

/// A recorded query execution for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Default)]
struct State {
    responses: Mutex<VecDeque<DriverResult<RawResultSet>>>,
    recorded_queries: Mutex<Vec<RecordedQuery>>,
    open_errors: Mutex<VecDeque<DriverError>>,
    primary_keys: Mutex<HashMap<String, Vec<String>>>,
    opens: Mutex<usize>,
    closes: Mutex<usize>,
}

/// An in-memory database driver for testing.
///
/// Allows configuring expected responses and verifying executed queries and
/// session lifecycle.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use sqon::drivers::{InMemoryTestDriver, InMemoryTestResponseBuilder};
/// use sqon::types::SqlValue;
///
/// let driver = Arc::new(
///     InMemoryTestDriver::new().with_response(
///         InMemoryTestResponseBuilder::new()
///             .columns(&["id", "name"])
///             .row(vec![SqlValue::Integer(1), SqlValue::from("Alice")])
///             .build(),
///     ),
/// );
/// ```
pub struct InMemoryTestDriver {
    backend: Backend,
    session_escaping: bool,
    standard_strings: bool,
    state: Arc<State>,
    default_response: RawResultSet,
}

impl InMemoryTestDriver {
    /// Create a new MySQL-flavoured test driver with no pre-configured responses.
    pub fn new() -> Self {
        Self::for_backend(Backend::Mysql)
    }

    /// Create a new PostgreSQL-flavoured test driver.
    pub fn postgres() -> Self {
        Self::for_backend(Backend::Postgres)
    }

    fn for_backend(backend: Backend) -> Self {
        Self {
            backend,
            session_escaping: true,
            standard_strings: true,
            state: Arc::new(State::default()),
            default_response: RawResultSet::empty(),
        }
    }

    /// Add a response to be returned by the next query.
    /// Responses are returned in FIFO order.
    pub fn with_response(self, response: RawResultSet) -> Self {
        self.state.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Add multiple responses to be returned by subsequent queries.
    pub fn with_responses(self, responses: impl IntoIterator<Item = RawResultSet>) -> Self {
        let mut queue = self.state.responses.lock().unwrap();
        for response in responses {
            queue.push_back(Ok(response));
        }
        drop(queue);
        self
    }

    /// Make the next query fail with the given driver error.
    pub fn with_error(self, error: DriverError) -> Self {
        self.state.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(mut self, response: RawResultSet) -> Self {
        self.default_response = response;
        self
    }

    /// Make the next attempt to open a session fail.
    pub fn with_open_error(self, error: DriverError) -> Self {
        self.state.open_errors.lock().unwrap().push_back(error);
        self
    }

    /// Declare the primary key columns of a table.
    pub fn with_primary_key(self, table: &str, columns: &[&str]) -> Self {
        self.state.primary_keys.lock().unwrap().insert(
            table.to_string(),
            columns.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Choose whether escaping goes through an open session.
    pub fn with_session_escaping(mut self, enabled: bool) -> Self {
        self.session_escaping = enabled;
        self
    }

    /// Set the PostgreSQL `standard_conforming_strings` setting reported by sessions.
    pub fn with_standard_conforming_strings(mut self, enabled: bool) -> Self {
        self.standard_strings = enabled;
        self
    }

    /// Get all recorded queries that have been executed.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.state.recorded_queries.lock().unwrap().clone()
    }

    /// Get the last recorded query, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.state.recorded_queries.lock().unwrap().last().cloned()
    }

    /// Clear all recorded queries.
    pub fn clear_recorded_queries(&self) {
        self.state.recorded_queries.lock().unwrap().clear();
    }

    /// Number of sessions opened so far.
    pub fn opens(&self) -> usize {
        *self.state.opens.lock().unwrap()
    }

    /// Number of sessions closed or dropped so far.
    pub fn closes(&self) -> usize {
        *self.state.closes.lock().unwrap()
    }

    /// Number of sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.opens() - self.closes()
    }

    /// Assert that the last query matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n queries were executed.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = self.state.recorded_queries.lock().unwrap().len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }

    fn escape_for_backend(backend: Backend, standard_strings: bool, text: &str) -> String {
        match backend {
            Backend::Mysql => escape_mysql(text, true),
            Backend::Postgres => escape_postgres(text, standard_strings),
        }
    }
}

impl Default for InMemoryTestDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for InMemoryTestDriver {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn open(&self, _config: &ConnectionConfig) -> DriverResult<Box<dyn DriverSession>> {
        if let Some(error) = self.state.open_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        *self.state.opens.lock().unwrap() += 1;
        Ok(Box::new(InMemoryTestSession {
            backend: self.backend,
            standard_strings: self.standard_strings,
            state: Arc::clone(&self.state),
            default_response: self.default_response.clone(),
        }))
    }

    fn escape_needs_session(&self) -> bool {
        self.session_escaping
    }

    fn escape(&self, text: &str) -> DriverResult<String> {
        Ok(Self::escape_for_backend(self.backend, true, text))
    }
}

struct InMemoryTestSession {
    backend: Backend,
    standard_strings: bool,
    state: Arc<State>,
    default_response: RawResultSet,
}

#[async_trait]
impl DriverSession for InMemoryTestSession {
    async fn execute(&mut self, sql: &str) -> DriverResult<RawResultSet> {
        // Record the query
        self.state.recorded_queries.lock().unwrap().push(RecordedQuery {
            sql: sql.to_string(),
            params: Vec::new(),
        });

        // Return next queued response or default
        self.state
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_response.clone()))
    }

    fn escape(&self, text: &str) -> DriverResult<String> {
        Ok(InMemoryTestDriver::escape_for_backend(
            self.backend,
            self.standard_strings,
            text,
        ))
    }

    async fn primary_key_columns(&mut self, table: &str) -> DriverResult<Vec<String>> {
        self.state.recorded_queries.lock().unwrap().push(RecordedQuery {
            sql: primary_key_query(self.backend).to_string(),
            params: vec![SqlValue::from(table)],
        });

        Ok(self
            .state
            .primary_keys
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) {}
}

impl Drop for InMemoryTestSession {
    fn drop(&mut self) {
        *self.state.closes.lock().unwrap() += 1;
    }
}

/// Builder for creating test responses easily.
pub struct InMemoryTestResponseBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl InMemoryTestResponseBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set the column names for the response.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of values.
    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        self.rows.push(values);
        self
    }

    /// Add a row of text values.
    pub fn text_row(mut self, values: &[&str]) -> Self {
        self.rows.push(values.iter().map(|s| SqlValue::from(*s)).collect());
        self
    }

    /// Build the RawResultSet.
    pub fn build(self) -> RawResultSet {
        RawResultSet::new(self.columns, self.rows)
    }
}

impl Default for InMemoryTestResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
