use std::fmt;

use thiserror::Error;

/// Status code reported by a driver call. `0` is success, anything below is a failure.
pub type StatusCode = i32;

pub const SUCCESS: StatusCode = 0;
pub const OUT_OF_MEMORY: StatusCode = -1;
pub const BUFFER_OVERFLOW: StatusCode = -2;
pub const CONNECTION_FAILURE: StatusCode = -3;
pub const UNSUPPORTED: StatusCode = -4;
pub const EMPTY_RESULT_SET: StatusCode = -5;
pub const PRIMARY_KEY_NOT_FOUND: StatusCode = -6;
pub const PRIMARY_KEY_NOT_UNIQUE: StatusCode = -7;
/// Backend rejected the statement for a reason with no dedicated kind.
pub const QUERY_FAILED: StatusCode = -100;

/// Message used for status codes outside the fixed taxonomy.
pub const UNKNOWN_ERROR_TEMPLATE: &str = "Error code {} occurred while processing query";

/// The fixed error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfMemory,
    BufferOverflow,
    Unsupported,
    ConnectionFailure,
    EmptyResultSet,
    PrimaryKeyNotFound,
    PrimaryKeyNotUnique,
    Unknown(StatusCode),
}

impl ErrorKind {
    /// Maps a failure status code onto the taxonomy. Returns `None` for success.
    pub fn from_code(code: StatusCode) -> Option<Self> {
        let kind = match code {
            SUCCESS => return None,
            OUT_OF_MEMORY => ErrorKind::OutOfMemory,
            BUFFER_OVERFLOW => ErrorKind::BufferOverflow,
            CONNECTION_FAILURE => ErrorKind::ConnectionFailure,
            UNSUPPORTED => ErrorKind::Unsupported,
            EMPTY_RESULT_SET => ErrorKind::EmptyResultSet,
            PRIMARY_KEY_NOT_FOUND => ErrorKind::PrimaryKeyNotFound,
            PRIMARY_KEY_NOT_UNIQUE => ErrorKind::PrimaryKeyNotUnique,
            other => ErrorKind::Unknown(other),
        };
        Some(kind)
    }

    pub fn code(&self) -> StatusCode {
        match self {
            ErrorKind::OutOfMemory => OUT_OF_MEMORY,
            ErrorKind::BufferOverflow => BUFFER_OVERFLOW,
            ErrorKind::ConnectionFailure => CONNECTION_FAILURE,
            ErrorKind::Unsupported => UNSUPPORTED,
            ErrorKind::EmptyResultSet => EMPTY_RESULT_SET,
            ErrorKind::PrimaryKeyNotFound => PRIMARY_KEY_NOT_FOUND,
            ErrorKind::PrimaryKeyNotUnique => PRIMARY_KEY_NOT_UNIQUE,
            ErrorKind::Unknown(code) => *code,
        }
    }

    fn default_message(&self) -> String {
        match self {
            ErrorKind::OutOfMemory => "Out of memory".to_string(),
            ErrorKind::BufferOverflow => "Buffer overflow".to_string(),
            ErrorKind::Unsupported => "Operation not supported".to_string(),
            ErrorKind::ConnectionFailure => "Could not connect to database".to_string(),
            ErrorKind::EmptyResultSet => "Query returned no columns".to_string(),
            ErrorKind::PrimaryKeyNotFound => "Primary key not found".to_string(),
            ErrorKind::PrimaryKeyNotUnique => "Primary key is not unique".to_string(),
            ErrorKind::Unknown(code) => UNKNOWN_ERROR_TEMPLATE.replace("{}", &code.to_string()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Unknown(code) => write!(f, "Unknown({})", code),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Error type for sqon operations
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SqonError {
    kind: ErrorKind,
    message: String,
    native_code: Option<String>,
    detail: Option<String>,
}

impl SqonError {
    /// Creates an error of the given kind with its standard message.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            message: kind.default_message(),
            kind,
            native_code: None,
            detail: None,
        }
    }

    /// Creates an error with a custom message. `Unknown` always keeps the standard message.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        match kind {
            ErrorKind::Unknown(_) => Self::new(kind).detail(message),
            _ => Self {
                kind,
                message: message.into(),
                native_code: None,
                detail: None,
            },
        }
    }

    pub(crate) fn native_code(mut self, code: Option<String>) -> Self {
        self.native_code = code;
        self
    }

    pub(crate) fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Backend-native error code (MySQL errno, PostgreSQL SQLSTATE), when known.
    pub fn native(&self) -> Option<&str> {
        self.native_code.as_deref()
    }

    /// The backend's own description of the failure, when it gave one.
    pub fn backend_message(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn code(&self) -> StatusCode {
        self.kind.code()
    }
}

/// Failure reported by a driver adapter, before translation.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverError {
    pub code: StatusCode,
    pub native_code: Option<String>,
    pub message: String,
}

impl DriverError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            native_code: None,
            message: message.into(),
        }
    }

    pub fn with_native(mut self, native_code: impl Into<String>) -> Self {
        self.native_code = Some(native_code.into());
        self
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(CONNECTION_FAILURE, message)
    }
}

/// Turns a driver status code into an error. `Ok(())` for success.
pub fn check(code: StatusCode) -> Result<()> {
    match ErrorKind::from_code(code) {
        None => Ok(()),
        Some(kind) => Err(SqonError::new(kind)),
    }
}

/// Translates a driver failure into the fixed taxonomy.
pub fn translate(err: DriverError) -> SqonError {
    let kind = match ErrorKind::from_code(err.code) {
        Some(kind) => kind,
        // a driver reporting success as an error is itself a bug in the driver
        None => ErrorKind::Unknown(err.code),
    };
    let translated = match kind {
        ErrorKind::Unknown(_) => SqonError::new(kind).detail(err.message),
        _ if err.message.is_empty() => SqonError::new(kind),
        _ => SqonError::with_message(kind, err.message),
    };
    let translated = translated.native_code(err.native_code);
    tracing::warn!(
        kind = %translated.kind(),
        native = translated.native().unwrap_or("-"),
        "{}",
        translated
    );
    translated
}

impl From<DriverError> for SqonError {
    fn from(err: DriverError) -> Self {
        translate(err)
    }
}

/// Result type alias for sqon operations
pub type Result<T> = std::result::Result<T, SqonError>;
