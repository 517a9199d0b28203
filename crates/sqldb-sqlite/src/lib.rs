//! Embedded SQLite driver for SQLDB Rust.
//!
//! Implements the `sqldb-core` driver contract over `rusqlite` with the
//! bundled SQLite library.
//!
//! # Example
//!
//! ```ignore
//! use sqldb_sqlite::SqliteDriver;
//!
//! let config = BackendConfig::Sqlite(SqliteConfig::new("app.db"));
//! let db = Database::open(&config, Arc::new(SqliteDriver), DatabaseOptions::default())?;
//! ```
//!
//! Busy and locked failures are reported as
//! [`DriverErrorKind::Busy`](sqldb_core::DriverErrorKind::Busy) and
//! [`DriverErrorKind::Locked`](sqldb_core::DriverErrorKind::Locked), which
//! the session layer retries.

pub mod connection;
pub mod dsn;
pub mod types;

use std::sync::Arc;

use sqldb_core::{Backend, Driver, DriverConn, DriverResult};

pub use connection::{SqliteConn, SqliteTx};
pub use dsn::{MEMORY_PATH, SqliteDsn, Target};

/// [`Driver`] opening [`SqliteConn`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn open(&self, dsn: &str) -> DriverResult<Arc<dyn DriverConn>> {
        Ok(Arc::new(SqliteConn::open(dsn)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldb_core::{DriverErrorKind, Scope};

    #[test]
    fn test_file_database_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let dsn = format!(
            "{}?_pragma=foreign_keys(1)&_pragma=busy_timeout(100)",
            path.display()
        );
        let scope = Scope::root();

        let conn = SqliteDriver.open(&dsn).unwrap();
        conn.execute(&scope, "CREATE TABLE t (a INTEGER)", &[]).unwrap();
        conn.execute(&scope, "INSERT INTO t (a) VALUES (?)", &[7.into()])
            .unwrap();
        conn.close().unwrap();

        let conn = SqliteDriver.open(&dsn).unwrap();
        let rows = conn.query(&scope, "SELECT a FROM t", &[]).unwrap();
        assert_eq!(rows[0].get_i64("a"), Some(7));

        let fk = conn.query(&scope, "PRAGMA foreign_keys", &[]).unwrap();
        assert_eq!(fk[0].get_i64("foreign_keys"), Some(1));
    }

    #[test]
    fn test_concurrent_writer_reports_busy() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = format!(
            "{}?_pragma=busy_timeout(10)",
            dir.path().join("busy.db").display()
        );
        let scope = Scope::root();
        let conn = SqliteDriver.open(&dsn).unwrap();
        conn.execute(&scope, "CREATE TABLE t (a INTEGER)", &[]).unwrap();

        let tx = conn.begin().unwrap();
        tx.execute(&scope, "INSERT INTO t (a) VALUES (1)", &[]).unwrap();

        let err = conn
            .execute(&scope, "INSERT INTO t (a) VALUES (2)", &[])
            .unwrap_err();
        assert_eq!(err.kind, DriverErrorKind::Busy);

        tx.commit().unwrap();
        conn.execute(&scope, "INSERT INTO t (a) VALUES (2)", &[]).unwrap();
    }

    #[test]
    fn test_second_transaction_waits_at_begin() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = format!(
            "{}?_pragma=busy_timeout(10)",
            dir.path().join("begin.db").display()
        );
        let scope = Scope::root();
        let conn = SqliteDriver.open(&dsn).unwrap();
        conn.execute(&scope, "CREATE TABLE t (a INTEGER)", &[]).unwrap();

        let first = conn.begin().unwrap();
        first.query(&scope, "SELECT count(*) AS n FROM t", &[]).unwrap();

        let err = conn.begin().err().unwrap();
        assert_eq!(err.kind, DriverErrorKind::Busy);

        first.execute(&scope, "INSERT INTO t (a) VALUES (1)", &[]).unwrap();
        first.commit().unwrap();

        let second = conn.begin().unwrap();
        second.execute(&scope, "INSERT INTO t (a) VALUES (2)", &[]).unwrap();
        second.commit().unwrap();

        let rows = conn.query(&scope, "SELECT count(*) AS n FROM t", &[]).unwrap();
        assert_eq!(rows[0].get_i64("n"), Some(2));
    }

    #[test]
    fn test_backend() {
        assert_eq!(SqliteDriver.backend(), Backend::Sqlite);
    }
}
