//! Error taxonomy for SQLDB Rust.
//!
//! Every failure surfaced by the public API is one of the [`Error`] variants.
//! Low-level driver failures are never returned raw: they are wrapped into
//! [`Error::Operation`] (or carried by [`Error::Timeout`] / [`Error::Open`])
//! so callers can match on a stable category with [`Error::kind`].

use crate::driver::DriverError;
use thiserror::Error;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in database operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing database handler.
    #[error("invalid database handler")]
    InvalidHandler,

    /// Invalid or unsupported database backend.
    #[error("invalid database backend")]
    InvalidBackend,

    /// Invalid or missing database engine.
    #[error("invalid database engine")]
    InvalidEngine,

    /// Invalid or missing database session.
    #[error("invalid database session")]
    InvalidSession,

    /// Invalid database configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The driver handle could not be opened.
    #[error("connection failed - {0}")]
    Open(#[source] DriverError),

    /// The database has been shut down.
    #[error("connection closed")]
    Closed,

    /// The operation was interrupted by an explicit cancel.
    #[error("operation break")]
    Break,

    /// The operation deadline expired.
    #[error("operation timeout")]
    Timeout {
        /// The last transient error observed before the deadline.
        #[source]
        last: Option<DriverError>,
    },

    /// Generic operation failure.
    #[error("operation error - {message}")]
    Operation {
        /// Human readable description.
        message: String,
        /// The underlying driver error, when there is one.
        #[source]
        source: Option<DriverError>,
    },
}

/// Configuration errors, all matching [`ErrorKind::Config`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Missing or invalid database file path.
    #[error("invalid database path")]
    Path,

    /// Missing or invalid database name.
    #[error("invalid database name")]
    Name,

    /// Missing or invalid database host.
    #[error("invalid database host")]
    Host,

    /// Missing or invalid database port.
    #[error("invalid database port")]
    Port,

    /// Any other invalid configuration value.
    #[error("invalid database config - {0}")]
    Invalid(String),
}

/// Stable error categories for matching without inspecting payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// [`Error::InvalidHandler`]
    Handler,
    /// [`Error::InvalidBackend`]
    Backend,
    /// [`Error::InvalidEngine`]
    Engine,
    /// [`Error::InvalidSession`]
    Session,
    /// [`Error::Config`], any variant.
    Config,
    /// [`Error::Open`]
    Open,
    /// [`Error::Closed`]
    Closed,
    /// [`Error::Break`]
    Break,
    /// [`Error::Timeout`]
    Timeout,
    /// [`Error::Operation`]
    Operation,
}

impl Error {
    /// Create an operation error without an underlying driver error.
    pub fn operation(message: impl Into<String>) -> Self {
        Error::Operation {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a driver error into an operation error.
    pub fn driver(err: DriverError) -> Self {
        Error::Operation {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidHandler => ErrorKind::Handler,
            Error::InvalidBackend => ErrorKind::Backend,
            Error::InvalidEngine => ErrorKind::Engine,
            Error::InvalidSession => ErrorKind::Session,
            Error::Config(_) => ErrorKind::Config,
            Error::Open(_) => ErrorKind::Open,
            Error::Closed => ErrorKind::Closed,
            Error::Break => ErrorKind::Break,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Operation { .. } => ErrorKind::Operation,
        }
    }

    /// Whether this error belongs to `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// The underlying driver error, if any.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Error::Open(e) => Some(e),
            Error::Timeout { last } => last.as_ref(),
            Error::Operation { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}
