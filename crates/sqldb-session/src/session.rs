//! Sessions: transactions, retry, timeouts and cancellation.
//!
//! A [`Session`] runs statements against its [`Database`]. Outside a
//! transaction every statement acquires the engine's handle and releases it
//! afterwards; inside one, statements run on the transaction in submission
//! order.
//!
//! Every statement, and the start of a transaction, runs in an operation
//! scope derived from the database's lifecycle scope and bounded by the
//! operation timeout. Transient failures, as classified by the engine, are
//! retried every retry interval until the attempt succeeds, the deadline
//! passes ([`Error::Timeout`]) or the operation is cancelled
//! ([`Error::Break`]). There is no bound on the number of attempts.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use sqldb_core::{
    Data, DriverConn, DriverErrorKind, DriverResult, DriverTx, Error, Result, Scope, ScopeStatus,
    Value,
};

use crate::database::Database;
use crate::model::Model;
use crate::query::Query;

/// Aborts the running operation of a [`Session`] from another thread.
#[derive(Debug, Clone, Default)]
pub struct Canceller {
    current: Arc<Mutex<Option<Scope>>>,
}

impl Canceller {
    /// Cancel the operation running right now, if any. The operation fails
    /// with [`Error::Break`]; later operations are unaffected, and a cancel
    /// with nothing in flight is a no-op.
    pub fn cancel(&self) {
        if let Some(scope) = self.current.lock().as_ref() {
            tracing::debug!("Session operation break");
            scope.cancel();
        }
    }

    fn register(&self, scope: &Scope) -> OperationGuard<'_> {
        *self.current.lock() = Some(scope.clone());
        OperationGuard { canceller: self }
    }
}

struct OperationGuard<'a> {
    canceller: &'a Canceller,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        *self.canceller.current.lock() = None;
    }
}

struct ActiveTx {
    handle: Arc<dyn DriverConn>,
    tx: Box<dyn DriverTx>,
}

/// Execution unit bound to one [`Database`].
///
/// A session is used by one caller at a time: `begin`/`commit`/`rollback`
/// take `&mut self`, statements take `&self`. Dropping a session with an
/// open transaction rolls it back.
pub struct Session<'db> {
    db: &'db Database,
    tx: Option<ActiveTx>,
    canceller: Canceller,
}

impl<'db> Session<'db> {
    pub(crate) fn new(db: &'db Database) -> Self {
        tracing::debug!(backend = %db.backend(), "New session");
        Self {
            db,
            tx: None,
            canceller: Canceller::default(),
        }
    }

    /// The parent database.
    pub fn database(&self) -> &'db Database {
        self.db
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Start a query for `model`.
    pub fn query<'a>(&'a self, model: &'a dyn Model) -> Query<'a> {
        Query::borrowed(self, model)
    }

    /// Cancel the running operation. See [`Canceller::cancel`].
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// A handle that cancels this session's running operation from any
    /// thread.
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Open a transaction. No-op if one is already open.
    ///
    /// A driver that reports lock contention while starting the transaction
    /// is retried like any statement, until the operation timeout.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn begin(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Ok(());
        }
        if self.db.is_closed() {
            return Err(Error::Closed);
        }

        let engine = self.db.engine();
        let handle = engine.sql_db()?;
        tracing::trace!("Begin transaction");
        match self.retrying(|_| handle.begin()) {
            Ok(tx) => {
                self.tx = Some(ActiveTx { handle, tx });
                Ok(())
            }
            Err(e) => {
                engine.release(&handle);
                Err(e)
            }
        }
    }

    /// Commit the open transaction.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commit(&mut self) -> Result<()> {
        let active = self.take_tx()?;
        tracing::trace!("Commit transaction");
        let res = active.tx.commit().map_err(Error::driver);
        self.db.engine().release(&active.handle);
        res
    }

    /// Roll back the open transaction.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(&mut self) -> Result<()> {
        let active = self.take_tx()?;
        tracing::trace!("Rollback transaction");
        let res = active.tx.rollback().map_err(Error::driver);
        self.db.engine().release(&active.handle);
        res
    }

    /// Run `f` inside a transaction: commit when it succeeds, roll back and
    /// return its error when it fails. Joins an already open transaction
    /// without committing it.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&Session<'db>) -> Result<T>) -> Result<T> {
        if self.in_transaction() {
            return f(self);
        }
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb) = self.rollback() {
                    tracing::warn!(error = %rb, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    fn take_tx(&mut self) -> Result<ActiveTx> {
        self.tx
            .take()
            .ok_or_else(|| Error::operation("not in transaction"))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Run a statement that returns no rows; yields the rows affected.
    ///
    /// `stmt` uses the neutral placeholder for each of `params`.
    #[tracing::instrument(level = "debug", skip(self, params))]
    pub fn exec(&self, stmt: &str, params: &[Value]) -> Result<u64> {
        match &self.tx {
            Some(active) => self.run(stmt, params, |scope, s, p| active.tx.execute(scope, s, p)),
            None => self.with_handle(|handle| {
                self.run(stmt, params, |scope, s, p| handle.execute(scope, s, p))
            }),
        }
    }

    /// Run a statement that returns rows.
    ///
    /// `stmt` uses the neutral placeholder for each of `params`.
    #[tracing::instrument(level = "debug", skip(self, params))]
    pub fn fetch(&self, stmt: &str, params: &[Value]) -> Result<Vec<Data>> {
        match &self.tx {
            Some(active) => self.run(stmt, params, |scope, s, p| active.tx.query(scope, s, p)),
            None => self.with_handle(|handle| {
                self.run(stmt, params, |scope, s, p| handle.query(scope, s, p))
            }),
        }
    }

    fn with_handle<T>(&self, f: impl FnOnce(&Arc<dyn DriverConn>) -> Result<T>) -> Result<T> {
        if self.db.is_closed() {
            return Err(Error::Closed);
        }
        let engine = self.db.engine();
        let handle = engine.sql_db()?;
        let res = f(&handle);
        engine.release(&handle);
        res
    }

    fn run<T>(
        &self,
        stmt: &str,
        params: &[Value],
        attempt: impl Fn(&Scope, &str, &[Value]) -> DriverResult<T>,
    ) -> Result<T> {
        if self.db.is_closed() {
            return Err(Error::Closed);
        }

        let stmt = self.db.engine().sql_generator().format_stmt(stmt);
        tracing::debug!(sql = %stmt, params = ?params, "SQL");
        self.retrying(|scope| attempt(scope, &stmt, params))
    }

    /// The retry loop shared by statements and [`Session::begin`].
    ///
    /// `attempt` runs in an operation scope bounded by the operation timeout
    /// and is repeated while it fails with errors the engine can retry.
    fn retrying<T>(&self, mut attempt: impl FnMut(&Scope) -> DriverResult<T>) -> Result<T> {
        let engine = self.db.engine();
        let options = self.db.options();
        let deadline = options
            .operation_timeout()
            .and_then(|t| Instant::now().checked_add(t));
        let scope = self.db.scope().child(deadline);
        let _guard = self.canceller.register(&scope);
        let interval = options.retry_interval();

        let mut last = None;
        loop {
            match scope.status() {
                ScopeStatus::Cancelled => return Err(Error::Break),
                ScopeStatus::DeadlineExceeded => return Err(Error::Timeout { last }),
                ScopeStatus::Active => {}
            }

            match attempt(&scope) {
                Ok(value) => return Ok(value),
                Err(e) if engine.can_retry_err(&e) => {
                    tracing::warn!(
                        error = %e,
                        retry_in_ms = interval.as_millis() as u64,
                        "Transient database error, retrying"
                    );
                    last = Some(e);
                }
                Err(e) if e.kind == DriverErrorKind::Interrupted => {
                    return Err(match scope.status() {
                        ScopeStatus::Cancelled => Error::Break,
                        ScopeStatus::DeadlineExceeded => Error::Timeout { last: Some(e) },
                        ScopeStatus::Active => Error::driver(e),
                    });
                }
                Err(e) => return Err(Error::driver(e)),
            }

            match scope.wait(interval) {
                ScopeStatus::Cancelled => return Err(Error::Break),
                ScopeStatus::DeadlineExceeded => return Err(Error::Timeout { last }),
                ScopeStatus::Active => {}
            }
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Some(active) = self.tx.take() {
            tracing::warn!("Session dropped inside a transaction, rolling back");
            if let Err(e) = active.tx.rollback() {
                tracing::warn!(error = %e, "Rollback failed");
            }
            self.db.engine().release(&active.handle);
        }
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.db.backend())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
