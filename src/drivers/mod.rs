mod in_memory_test;
mod mysql;
mod postgres;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::Backend;
use crate::error::{ErrorKind, Result, SqonError};
use crate::traits::DatabaseDriver;

pub use self::in_memory_test::{InMemoryTestDriver, InMemoryTestResponseBuilder, RecordedQuery};
pub use self::mysql::MySqlDriver;
pub use self::postgres::PostgresDriver;

static REGISTRY: OnceCell<HashMap<Backend, Arc<dyn DatabaseDriver>>> = OnceCell::new();

/// Register the built-in MySQL and PostgreSQL drivers for [`crate::Connection::new`].
///
/// Call once at process startup. Later calls are no-ops; returns `true` only
/// for the call that did the registration.
pub fn init() -> bool {
    let mut registered_now = false;
    REGISTRY.get_or_init(|| {
        registered_now = true;
        let mut drivers: HashMap<Backend, Arc<dyn DatabaseDriver>> = HashMap::new();
        drivers.insert(Backend::Mysql, Arc::new(MySqlDriver));
        drivers.insert(Backend::Postgres, Arc::new(PostgresDriver));
        tracing::debug!(drivers = drivers.len(), "registered database drivers");
        drivers
    });
    registered_now
}

pub(crate) fn registered(backend: Backend) -> Result<Arc<dyn DatabaseDriver>> {
    let registry = REGISTRY.get().ok_or_else(|| {
        SqonError::with_message(
            ErrorKind::Unsupported,
            "Database drivers are not initialized; call sqon::init() first",
        )
    })?;
    registry.get(&backend).cloned().ok_or_else(|| {
        SqonError::with_message(
            ErrorKind::Unsupported,
            format!("No driver registered for {}", backend),
        )
    })
}
