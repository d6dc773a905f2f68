use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{ErrorKind, Result, SqonError};

/// Database engine behind a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Mysql,
    Postgres,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Mysql => "mysql",
            Backend::Postgres => "postgres",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Backend::Mysql => 3306,
            Backend::Postgres => 5432,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = SqonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Backend::Mysql),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            _ => Err(SqonError::with_message(
                ErrorKind::Unsupported,
                format!("Unsupported database type: {}", s),
            )),
        }
    }
}

/// Connection parameters for one database server.
///
/// Defaults mirror the usual local development setup: MySQL on `localhost`
/// as `root`, no password, no default database, backend default port.
///
/// # Example
/// ```
/// use sqon::{Backend, ConnectionConfig};
///
/// let config = ConnectionConfig::new(Backend::Mysql)
///     .host("db.internal")
///     .user("app")
///     .password("secret")
///     .database("app");
/// assert_eq!(config.port_number(), 3306);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    backend: Backend,
    host: String,
    user: String,
    password: Option<String>,
    database: Option<String>,
    port: Option<u16>,
}

impl ConnectionConfig {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            host: "localhost".to_string(),
            user: "root".to_string(),
            password: None,
            database: None,
            port: None,
        }
    }

    /// Like [`ConnectionConfig::new`], with the backend given by name.
    pub fn for_backend(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Port `0` means "backend default", same as leaving it unset.
    pub fn port(mut self, port: u16) -> Self {
        self.port = (port != 0).then_some(port);
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn host_name(&self) -> &str {
        &self.host
    }

    pub fn user_name(&self) -> &str {
        &self.user
    }

    pub fn password_value(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn database_name(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// The configured port, or the backend default.
    pub fn port_number(&self) -> u16 {
        self.port.unwrap_or_else(|| self.backend.default_port())
    }

    /// Parses a configuration from a TOML document.
    ///
    /// ```
    /// use sqon::{Backend, ConnectionConfig};
    ///
    /// let config = ConnectionConfig::from_toml_str(r#"
    ///     type = "postgres"
    ///     host = "db"
    ///     user = "reporting"
    ///     database = "warehouse"
    /// "#).unwrap();
    /// assert_eq!(config.backend(), Backend::Postgres);
    /// assert_eq!(config.port_number(), 5432);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let raw: RawConnectionConfig = toml::from_str(source).map_err(|e| {
            SqonError::with_message(
                ErrorKind::Unsupported,
                format!("Invalid connection configuration: {}", e.message()),
            )
        })?;
        raw.try_into()
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("port", &self.port_number())
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(Backend::Mysql)
    }
}

/// On-disk shape of a connection configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConnectionConfig {
    #[serde(alias = "backend", rename = "type", default = "default_backend")]
    backend: String,
    host: Option<String>,
    user: Option<String>,
    #[serde(alias = "passwd")]
    password: Option<String>,
    database: Option<String>,
    port: Option<u16>,
}

fn default_backend() -> String {
    Backend::Mysql.name().to_string()
}

impl TryFrom<RawConnectionConfig> for ConnectionConfig {
    type Error = SqonError;

    fn try_from(raw: RawConnectionConfig) -> Result<Self> {
        let mut config = ConnectionConfig::for_backend(&raw.backend)?;
        if let Some(host) = raw.host {
            config = config.host(host);
        }
        if let Some(user) = raw.user {
            config = config.user(user);
        }
        config.password = raw.password;
        config.database = raw.database;
        if let Some(port) = raw.port {
            config = config.port(port);
        }
        Ok(config)
    }
}
