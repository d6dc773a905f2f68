use async_trait::async_trait;
use sqlx::mysql::{MySqlColumn, MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection as _, Executor, Row, Statement, TypeInfo, ValueRef};
use tracing::debug;

use crate::config::{Backend, ConnectionConfig};
use crate::error::{DriverError, CONNECTION_FAILURE, OUT_OF_MEMORY, QUERY_FAILED};
use crate::escape::escape_mysql;
use crate::schema::primary_key_query;
use crate::traits::{DatabaseDriver, DriverResult, DriverSession};
use crate::types::{ColumnClass, RawResultSet, SqlValue};

/// Server errors meaning the session could not be established or was lost.
const CONNECTION_ERRNOS: &[u16] = &[1044, 1045, 1049, 2002, 2003, 2005, 2006, 2013];
const OUT_OF_MEMORY_ERRNOS: &[u16] = &[1037, 1038];
/// ER_UNSUPPORTED_PS: the statement cannot be prepared, so it has no metadata.
const UNSUPPORTED_PS_ERRNO: u16 = 1295;

/// MySQL driver implementation using a single sqlx connection.
pub struct MySqlDriver;

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn backend(&self) -> Backend {
        Backend::Mysql
    }

    async fn open(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn DriverSession>> {
        let mut options = MySqlConnectOptions::new()
            .host(config.host_name())
            .port(config.port_number())
            .username(config.user_name());
        if let Some(password) = config.password_value() {
            options = options.password(password);
        }
        if let Some(database) = config.database_name() {
            options = options.database(database);
        }

        let mut conn = options.connect().await.map_err(classify)?;

        let sql_mode: String = sqlx::query_scalar("SELECT CAST(@@SESSION.sql_mode AS CHAR)")
            .fetch_one(&mut conn)
            .await
            .map_err(classify)?;
        let backslash_escapes = !sql_mode
            .split(',')
            .any(|mode| mode.trim().eq_ignore_ascii_case("NO_BACKSLASH_ESCAPES"));
        debug!(sql_mode = %sql_mode, "mysql session ready");

        Ok(Box::new(MySqlSession {
            conn,
            backslash_escapes,
        }))
    }

    fn escape_needs_session(&self) -> bool {
        true
    }

    fn escape(&self, text: &str) -> DriverResult<String> {
        Ok(escape_mysql(text, true))
    }
}

struct MySqlSession {
    conn: MySqlConnection,
    backslash_escapes: bool,
}

#[async_trait]
impl DriverSession for MySqlSession {
    async fn execute(&mut self, sql: &str) -> DriverResult<RawResultSet> {
        // A bare `&str` carries no arguments and runs over the text protocol.
        let rows: Vec<MySqlRow> = (&mut self.conn).fetch_all(sql).await.map_err(classify)?;

        // An empty result carries no column list; fall back to statement metadata.
        let (columns, classes) = match rows.first() {
            Some(row) => describe(row.columns()),
            None => match (&mut self.conn).prepare(sql).await {
                Ok(statement) => describe(statement.columns()),
                Err(err) => unpreparable_columns(err)?,
            },
        };

        let rows = rows
            .iter()
            .map(|row| {
                classes
                    .iter()
                    .enumerate()
                    .map(|(index, class)| decode_value(row, index, *class))
                    .collect::<DriverResult<Vec<SqlValue>>>()
            })
            .collect::<DriverResult<Vec<_>>>()?;

        Ok(RawResultSet::new(columns, rows))
    }

    fn escape(&self, text: &str) -> DriverResult<String> {
        Ok(escape_mysql(text, self.backslash_escapes))
    }

    async fn primary_key_columns(&mut self, table: &str) -> DriverResult<Vec<String>> {
        sqlx::query_scalar(primary_key_query(Backend::Mysql))
            .bind(table)
            .fetch_all(&mut self.conn)
            .await
            .map_err(classify)
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.conn.close().await {
            debug!(error = %e, "mysql session did not close cleanly");
        }
    }
}

fn describe(columns: &[MySqlColumn]) -> (Vec<String>, Vec<ColumnClass>) {
    columns
        .iter()
        .map(|column| {
            (
                column.name().to_string(),
                column_class(column.type_info().name()),
            )
        })
        .unzip()
}

fn column_class(type_name: &str) -> ColumnClass {
    match type_name.trim_end_matches(" UNSIGNED") {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" => {
            ColumnClass::Integer
        }
        "BOOLEAN" => ColumnClass::Boolean,
        "FLOAT" | "DOUBLE" => ColumnClass::Float,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            ColumnClass::Binary
        }
        _ => ColumnClass::Text,
    }
}

/// Statements the server refuses to prepare still ran; they report no columns.
fn unpreparable_columns(err: sqlx::Error) -> DriverResult<(Vec<String>, Vec<ColumnClass>)> {
    if server_errno(&err) == Some(UNSUPPORTED_PS_ERRNO) {
        Ok((Vec::new(), Vec::new()))
    } else {
        Err(classify(err))
    }
}

/// Text-protocol rows carry every value as its textual form.
fn decode_value(row: &MySqlRow, index: usize, class: ColumnClass) -> DriverResult<SqlValue> {
    if row.try_get_raw(index).map_err(classify)?.is_null() {
        return Ok(SqlValue::Null);
    }
    let bytes = row.try_get_unchecked::<Vec<u8>, _>(index).map_err(classify)?;
    Ok(decode_bytes(bytes, class))
}

/// Values that are not valid UTF-8 are kept as binary whatever their column type.
fn decode_bytes(bytes: Vec<u8>, class: ColumnClass) -> SqlValue {
    if class == ColumnClass::Binary {
        return SqlValue::Binary(bytes);
    }
    match String::from_utf8(bytes) {
        Ok(text) => class.decode(&text),
        Err(err) => SqlValue::Binary(err.into_bytes()),
    }
}

fn server_errno(err: &sqlx::Error) -> Option<u16> {
    match err {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(MySqlDatabaseError::number),
        _ => None,
    }
}

fn classify(err: sqlx::Error) -> DriverError {
    match &err {
        sqlx::Error::Database(db) => match server_errno(&err) {
            Some(errno) => {
                let code = if CONNECTION_ERRNOS.contains(&errno) {
                    CONNECTION_FAILURE
                } else if OUT_OF_MEMORY_ERRNOS.contains(&errno) {
                    OUT_OF_MEMORY
                } else {
                    -i32::from(errno)
                };
                DriverError::new(code, db.message()).with_native(errno.to_string())
            }
            None => DriverError::new(QUERY_FAILED, db.message()),
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::Configuration(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => DriverError::connection(err.to_string()),
        _ => DriverError::new(QUERY_FAILED, err.to_string()),
    }
}
