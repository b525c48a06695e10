//! Error plumbing shared across the workspace.
//!
//! Fallible functions return [`Result`] (anyhow). Conditions a caller needs to tell
//! apart are raised as a [`ConnectorError`] and recovered with `downcast_ref`.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

pub use anyhow::{anyhow, bail, ensure, Context, Error, Result};

/// The classes of failure reported by connectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnsupportedOperator,
    UnsupportedLogicalOperator,
    NullOperatorNotValid,
    ColumnNotFound,
    UnsupportedType,
    DataType,
    TooManyRows,
    DuplicateKey,
    NoRowsFound,
    Backend,
    Generic,
}

impl ErrorKind {
    /// Stable numeric code reported to hosts
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::UnsupportedOperator => 1001,
            ErrorKind::UnsupportedLogicalOperator => 1002,
            ErrorKind::NullOperatorNotValid => 1003,
            ErrorKind::ColumnNotFound => 1004,
            ErrorKind::UnsupportedType => 1005,
            ErrorKind::DataType => 1006,
            ErrorKind::TooManyRows => 1007,
            ErrorKind::DuplicateKey => 1008,
            ErrorKind::NoRowsFound => 1009,
            ErrorKind::Backend => 1010,
            ErrorKind::Generic => 1099,
        }
    }
}

/// An error raised by the data source while executing a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendError {
    /// The backend's native error number
    pub code: i32,
    pub message: String,
    pub detail: Option<String>,
    /// Whether the failure left the connection unusable
    pub fatal: bool,
}

impl BackendError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
            fatal: false,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Backend error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for BackendError {}

/// Failures raised while compiling or executing connector operations
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorError {
    UnsupportedOperator(String),
    UnsupportedLogicalOperator(String),
    NullOperatorNotValid(String),
    ColumnNotFound { table: String, column: String },
    UnsupportedType(String),
    DataType { column: String, message: String },
    TooManyRows(u64),
    DuplicateKey(BackendError),
    NoRowsFound,
}

impl ConnectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectorError::UnsupportedOperator(_) => ErrorKind::UnsupportedOperator,
            ConnectorError::UnsupportedLogicalOperator(_) => ErrorKind::UnsupportedLogicalOperator,
            ConnectorError::NullOperatorNotValid(_) => ErrorKind::NullOperatorNotValid,
            ConnectorError::ColumnNotFound { .. } => ErrorKind::ColumnNotFound,
            ConnectorError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            ConnectorError::DataType { .. } => ErrorKind::DataType,
            ConnectorError::TooManyRows(_) => ErrorKind::TooManyRows,
            ConnectorError::DuplicateKey(_) => ErrorKind::DuplicateKey,
            ConnectorError::NoRowsFound => ErrorKind::NoRowsFound,
        }
    }
}

impl Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorError::UnsupportedOperator(op) => {
                write!(f, "Operator \"{op}\" is not supported")
            }
            ConnectorError::UnsupportedLogicalOperator(op) => {
                write!(f, "Logical operator \"{op}\" is not supported")
            }
            ConnectorError::NullOperatorNotValid(op) => {
                write!(f, "Operator \"{op}\" cannot be used with a null operand")
            }
            ConnectorError::ColumnNotFound { table, column } => {
                write!(f, "Column \"{column}\" does not exist on table \"{table}\"")
            }
            ConnectorError::UnsupportedType(ty) => write!(f, "Unsupported data type: {ty}"),
            ConnectorError::DataType { column, message } => {
                write!(f, "Invalid value for column \"{column}\": {message}")
            }
            ConnectorError::TooManyRows(count) => write!(
                f,
                "Operation would affect {count} rows but only a single row is permitted"
            ),
            ConnectorError::DuplicateKey(err) => {
                write!(f, "Duplicate key violation: {}", err.message)
            }
            ConnectorError::NoRowsFound => write!(f, "No rows matched the lookup condition"),
        }
    }
}

impl std::error::Error for ConnectorError {}

/// A failure description carried in a result slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    /// See [`ErrorKind::code`]
    pub code: u32,
    /// The native error number, when the failure came from the backend
    pub backend_code: Option<i32>,
    pub message: String,
    pub detail: Option<String>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            backend_code: None,
            message: message.into(),
            detail: None,
        }
    }
}

impl From<&ConnectorError> for ErrorInfo {
    fn from(err: &ConnectorError) -> Self {
        let mut info = Self::new(err.kind(), err.to_string());

        if let ConnectorError::DuplicateKey(backend) = err {
            info.backend_code = Some(backend.code);
            info.message = backend.message.clone();
            info.detail = backend.detail.clone();
        }

        info
    }
}

impl From<&BackendError> for ErrorInfo {
    fn from(err: &BackendError) -> Self {
        Self {
            kind: ErrorKind::Backend,
            code: ErrorKind::Backend.code(),
            backend_code: Some(err.code),
            message: err.message.clone(),
            detail: err.detail.clone(),
        }
    }
}

impl From<&Error> for ErrorInfo {
    fn from(err: &Error) -> Self {
        if let Some(err) = err.downcast_ref::<ConnectorError>() {
            return err.into();
        }

        if let Some(err) = err.downcast_ref::<BackendError>() {
            return err.into();
        }

        let mut info = Self::new(ErrorKind::Generic, format!("{:#}", err));
        info.detail = Some(format!("{:?}", err));
        info
    }
}
