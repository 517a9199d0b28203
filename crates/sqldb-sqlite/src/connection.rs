//! SQLite connection handle and transactions.
//!
//! A [`SqliteConn`] keeps one primary connection for statements outside
//! transactions, serialized by a mutex. Each transaction runs on its own
//! connection to the same database and takes the write lock when it begins,
//! so concurrent writers see SQLite's locking (reported as busy/locked
//! errors) at `begin` rather than at commit.
//!
//! While a statement runs, a progress handler polls the operation scope and
//! interrupts the statement once the scope is cancelled or past its
//! deadline.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use sqldb_core::{Data, DriverConn, DriverError, DriverErrorKind, DriverResult, DriverTx, Scope, Value};

use crate::dsn::{SqliteDsn, Target};
use crate::types::{driver_error, from_sql, to_sql};

/// Longest wait for the primary connection before reporting it busy.
const LOCK_WAIT: Duration = Duration::from_millis(100);

/// Virtual machine steps between scope checks.
const PROGRESS_STEPS: i32 = 1000;

/// An open SQLite database handle.
pub struct SqliteConn {
    dsn: SqliteDsn,
    primary: Mutex<Option<Connection>>,
}

impl SqliteConn {
    /// Open the database described by `dsn`.
    pub fn open(dsn: &str) -> DriverResult<Self> {
        let dsn = SqliteDsn::parse(dsn)?;
        let conn = connect(&dsn)?;
        tracing::debug!(database = ?dsn.target, "Opened sqlite database");
        Ok(Self {
            dsn,
            primary: Mutex::new(Some(conn)),
        })
    }

    /// Open a private in-memory database.
    pub fn open_memory() -> DriverResult<Self> {
        Self::open(crate::dsn::MEMORY_PATH)
    }

    fn with_primary<T>(
        &self,
        scope: &Scope,
        f: impl FnOnce(&Connection) -> DriverResult<T>,
    ) -> DriverResult<T> {
        let wait = scope.remaining().map_or(LOCK_WAIT, |r| r.min(LOCK_WAIT));
        let guard = self
            .primary
            .try_lock_for(wait)
            .ok_or_else(|| DriverError::new(DriverErrorKind::Busy, "connection is busy"))?;
        let conn = guard.as_ref().ok_or_else(closed)?;
        f(conn)
    }
}

impl std::fmt::Debug for SqliteConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConn")
            .field("target", &self.dsn.target)
            .finish_non_exhaustive()
    }
}

impl DriverConn for SqliteConn {
    fn execute(&self, scope: &Scope, stmt: &str, params: &[Value]) -> DriverResult<u64> {
        self.with_primary(scope, |conn| guarded(conn, scope, || execute(conn, stmt, params)))
    }

    fn query(&self, scope: &Scope, stmt: &str, params: &[Value]) -> DriverResult<Vec<Data>> {
        self.with_primary(scope, |conn| guarded(conn, scope, || query(conn, stmt, params)))
    }

    fn begin(&self) -> DriverResult<Box<dyn DriverTx>> {
        if self.primary.lock().is_none() {
            return Err(closed());
        }
        // Write lock held from BEGIN; a competing writer fails here with Busy.
        let conn = connect(&self.dsn)?;
        conn.execute_batch("BEGIN IMMEDIATE").map_err(driver_error)?;
        tracing::trace!("sqlite transaction started");
        Ok(Box::new(SqliteTx {
            conn: Mutex::new(conn),
        }))
    }

    fn ping(&self) -> DriverResult<()> {
        self.with_primary(&Scope::root(), |conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(driver_error)
        })
    }

    fn close(&self) -> DriverResult<()> {
        match self.primary.lock().take() {
            Some(conn) => conn.close().map_err(|(_, e)| driver_error(e)),
            None => Ok(()),
        }
    }
}

/// A transaction on a dedicated connection.
pub struct SqliteTx {
    conn: Mutex<Connection>,
}

impl DriverTx for SqliteTx {
    fn execute(&self, scope: &Scope, stmt: &str, params: &[Value]) -> DriverResult<u64> {
        let conn = self.conn.lock();
        guarded(&conn, scope, || execute(&conn, stmt, params))
    }

    fn query(&self, scope: &Scope, stmt: &str, params: &[Value]) -> DriverResult<Vec<Data>> {
        let conn = self.conn.lock();
        guarded(&conn, scope, || query(&conn, stmt, params))
    }

    fn commit(self: Box<Self>) -> DriverResult<()> {
        let conn = self.conn.into_inner();
        conn.execute_batch("COMMIT").map_err(driver_error)?;
        tracing::trace!("sqlite transaction committed");
        Ok(())
    }

    fn rollback(self: Box<Self>) -> DriverResult<()> {
        let conn = self.conn.into_inner();
        conn.execute_batch("ROLLBACK").map_err(driver_error)?;
        tracing::trace!("sqlite transaction rolled back");
        Ok(())
    }
}

fn closed() -> DriverError {
    DriverError::new(DriverErrorKind::Connection, "connection closed")
}

fn connect(dsn: &SqliteDsn) -> DriverResult<Connection> {
    let conn = match &dsn.target {
        Target::File(path) => Connection::open(path),
        Target::Memory(uri) => Connection::open_with_flags(
            uri,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        ),
    }
    .map_err(|e| {
        let mut err = driver_error(e);
        err.kind = DriverErrorKind::Connection;
        err
    })?;

    for pragma in &dsn.pragmas {
        execute(&conn, &format!("PRAGMA {}", pragma), &[])?;
    }
    Ok(conn)
}

/// Run `f` with a progress handler that interrupts it once `scope` is done.
fn guarded<T>(
    conn: &Connection,
    scope: &Scope,
    f: impl FnOnce() -> DriverResult<T>,
) -> DriverResult<T> {
    if scope.is_done() {
        return Err(DriverError::new(DriverErrorKind::Interrupted, "interrupted"));
    }
    let watched = AssertUnwindSafe(scope.clone());
    conn.progress_handler(
        PROGRESS_STEPS,
        Some(move || {
            let scope = &watched;
            scope.0.is_done()
        }),
    );
    let res = f();
    conn.progress_handler(0, None::<fn() -> bool>);
    res
}

fn execute(conn: &Connection, stmt: &str, params: &[Value]) -> DriverResult<u64> {
    let mut prepared = conn.prepare(stmt).map_err(driver_error)?;
    let args = params_from_iter(params.iter().map(to_sql));
    if prepared.column_count() > 0 {
        let mut rows = prepared.query(args).map_err(driver_error)?;
        while rows.next().map_err(driver_error)?.is_some() {}
        return Ok(0);
    }
    let n = prepared.execute(args).map_err(driver_error)?;
    Ok(n as u64)
}

fn query(conn: &Connection, stmt: &str, params: &[Value]) -> DriverResult<Vec<Data>> {
    let mut prepared = conn.prepare(stmt).map_err(driver_error)?;
    let names: Vec<String> = prepared
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = prepared
        .query(params_from_iter(params.iter().map(to_sql)))
        .map_err(driver_error)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(driver_error)? {
        let mut data = Data::new();
        for (i, name) in names.iter().enumerate() {
            let value = row.get(i).map_err(driver_error)?;
            data.insert(name.as_str(), from_sql(value));
        }
        out.push(data);
    }
    Ok(out)
}
