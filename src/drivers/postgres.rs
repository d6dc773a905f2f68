use async_trait::async_trait;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use crate::config::{Backend, ConnectionConfig};
use crate::error::{DriverError, CONNECTION_FAILURE, OUT_OF_MEMORY, QUERY_FAILED};
use crate::escape::escape_postgres;
use crate::schema::primary_key_query;
use crate::traits::{DatabaseDriver, DriverResult, DriverSession};
use crate::types::{ColumnClass, RawResultSet, SqlValue};

/// PostgreSQL driver implementation using tokio-postgres.
pub struct PostgresDriver;

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn open(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn DriverSession>> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(config.host_name())
            .port(config.port_number())
            .user(config.user_name());
        if let Some(password) = config.password_value() {
            pg.password(password);
        }
        if let Some(database) = config.database_name() {
            pg.dbname(database);
        }

        let (client, connection) = pg.connect(NoTls).await.map_err(classify)?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        let setting: String = client
            .query_one("SHOW standard_conforming_strings", &[])
            .await
            .and_then(|row| row.try_get(0))
            .map_err(classify)?;
        let standard_strings = standard_strings_enabled(&setting);
        tracing::debug!(standard_conforming_strings = %setting, "postgres session ready");

        Ok(Box::new(PostgresSession {
            client,
            standard_strings,
        }))
    }

    fn escape_needs_session(&self) -> bool {
        true
    }

    fn escape(&self, text: &str) -> DriverResult<String> {
        Ok(escape_postgres(text, true))
    }
}

struct PostgresSession {
    client: Client,
    standard_strings: bool,
}

#[async_trait]
impl DriverSession for PostgresSession {
    async fn execute(&mut self, sql: &str) -> DriverResult<RawResultSet> {
        // Column names and types come from the prepared statement, values from
        // the text protocol so every type has a readable form.
        let statement = self.client.prepare(sql).await.map_err(classify)?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let classes: Vec<ColumnClass> = statement
            .columns()
            .iter()
            .map(|c| column_class(c.type_()))
            .collect();

        let messages = self.client.simple_query(sql).await.map_err(classify)?;
        let rows = messages
            .iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => Some(row),
                _ => None,
            })
            .map(|row| {
                (0..row.len())
                    .map(|index| match row.get(index) {
                        Some(text) => classes
                            .get(index)
                            .copied()
                            .unwrap_or(ColumnClass::Text)
                            .decode(text),
                        None => SqlValue::Null,
                    })
                    .collect()
            })
            .collect();

        Ok(RawResultSet::new(columns, rows))
    }

    fn escape(&self, text: &str) -> DriverResult<String> {
        Ok(escape_postgres(text, self.standard_strings))
    }

    async fn primary_key_columns(&mut self, table: &str) -> DriverResult<Vec<String>> {
        let rows = self
            .client
            .query(primary_key_query(Backend::Postgres), &[&table])
            .await
            .map_err(classify)?;

        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(classify))
            .collect()
    }

    async fn close(self: Box<Self>) {
        // Dropping the client ends the spawned connection task.
        drop(self);
    }
}

fn standard_strings_enabled(setting: &str) -> bool {
    !setting.trim().eq_ignore_ascii_case("off")
}

fn column_class(type_: &Type) -> ColumnClass {
    match type_.name() {
        "int2" | "int4" | "int8" | "oid" => ColumnClass::Integer,
        "float4" | "float8" => ColumnClass::Float,
        "bool" => ColumnClass::Boolean,
        "bytea" => ColumnClass::Binary,
        _ => ColumnClass::Text,
    }
}

fn classify(err: tokio_postgres::Error) -> DriverError {
    let Some(state) = err.code() else {
        return DriverError::connection(err.to_string());
    };

    let sqlstate = state.code();
    let code = if sqlstate.starts_with("08") || sqlstate.starts_with("28") || sqlstate == "3D000" {
        CONNECTION_FAILURE
    } else if sqlstate == "53200" {
        OUT_OF_MEMORY
    } else {
        QUERY_FAILED
    };
    let message = err
        .as_db_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| err.to_string());
    DriverError::new(code, message).with_native(sqlstate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_class() {
        assert_eq!(column_class(&Type::INT8), ColumnClass::Integer);
        assert_eq!(column_class(&Type::FLOAT8), ColumnClass::Float);
        assert_eq!(column_class(&Type::BOOL), ColumnClass::Boolean);
        assert_eq!(column_class(&Type::BYTEA), ColumnClass::Binary);
        assert_eq!(column_class(&Type::TEXT), ColumnClass::Text);
        assert_eq!(column_class(&Type::NUMERIC), ColumnClass::Text);
        assert_eq!(column_class(&Type::TIMESTAMPTZ), ColumnClass::Text);
    }

    #[test]
    fn test_standard_strings_setting() {
        assert!(standard_strings_enabled("on"));
        assert!(!standard_strings_enabled("off"));
        assert!(!standard_strings_enabled("OFF"));
    }
}
