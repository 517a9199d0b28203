//! Driver contract consumed by the session layer.
//!
//! A driver adapter opens a [`DriverConn`] from a DSN; the connection runs
//! statements and starts transactions. Statements arrive already rendered in
//! the backend's native placeholder syntax, with positional parameters.
//!
//! Implementations must be safe to share across sessions: pooling and
//! connection multiplexing are the adapter's business, not the core's.

use std::fmt;
use std::sync::Arc;

use crate::backend::Backend;
use crate::data::Data;
use crate::scope::Scope;
use crate::value::Value;

/// Broad classification of a driver failure, used by engines to decide
/// whether an operation may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverErrorKind {
    /// Database file or table is busy (embedded backends).
    Busy,
    /// Database or table is locked (embedded backends).
    Locked,
    /// Driver-side send buffer is busy.
    BusyBuffer,
    /// Connection-level failure.
    Connection,
    /// The statement was interrupted.
    Interrupted,
    /// Anything else.
    Other,
}

/// An error reported by a driver adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    /// Broad failure class.
    pub kind: DriverErrorKind,
    /// Backend specific code (SQLSTATE, vendor error number), if reported.
    pub code: Option<String>,
    /// Human readable message from the driver.
    pub message: String,
}

impl DriverError {
    /// Create a driver error without a backend code.
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    /// Attach a backend specific code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Shorthand for [`DriverErrorKind::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Other, message)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DriverError {}

/// Result type for driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Opens driver connections for one database product.
pub trait Driver: Send + Sync {
    /// The database product this driver talks to.
    fn backend(&self) -> Backend;

    /// Open a connection handle for `dsn`.
    fn open(&self, dsn: &str) -> DriverResult<Arc<dyn DriverConn>>;
}

/// An open driver handle.
///
/// `scope` carries cancellation and the operation deadline; adapters should
/// stop early once [`Scope::is_done`] reports true.
pub trait DriverConn: Send + Sync {
    /// Run a statement that returns no rows; yields the rows affected.
    fn execute(&self, scope: &Scope, stmt: &str, params: &[Value]) -> DriverResult<u64>;

    /// Run a statement that returns rows.
    fn query(&self, scope: &Scope, stmt: &str, params: &[Value]) -> DriverResult<Vec<Data>>;

    /// Start a transaction.
    fn begin(&self) -> DriverResult<Box<dyn DriverTx>>;

    /// Check the connection is alive.
    fn ping(&self) -> DriverResult<()>;

    /// Close the handle. Further calls fail.
    fn close(&self) -> DriverResult<()>;
}

/// An open transaction on a driver handle.
pub trait DriverTx: Send + Sync {
    /// Run a statement that returns no rows inside the transaction.
    fn execute(&self, scope: &Scope, stmt: &str, params: &[Value]) -> DriverResult<u64>;

    /// Run a statement that returns rows inside the transaction.
    fn query(&self, scope: &Scope, stmt: &str, params: &[Value]) -> DriverResult<Vec<Data>>;

    /// Commit the transaction.
    fn commit(self: Box<Self>) -> DriverResult<()>;

    /// Roll the transaction back.
    fn rollback(self: Box<Self>) -> DriverResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_code() {
        let err = DriverError::new(DriverErrorKind::Connection, "connection failure")
            .with_code("08006");
        assert_eq!(err.to_string(), "connection failure (code 08006)");
    }

    #[test]
    fn test_display_without_code() {
        assert_eq!(DriverError::other("syntax error").to_string(), "syntax error");
    }
}
