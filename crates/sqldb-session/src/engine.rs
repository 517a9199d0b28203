//! Backend engines.
//!
//! An [`Engine`] owns the driver handle for one connection target. The
//! handle is opened lazily on first use, under a mutex, so concurrent
//! sessions never open it twice.

use std::sync::Arc;

use parking_lot::Mutex;
use sqldb_core::{Backend, Driver, DriverConn, DriverError, DriverErrorKind, Error, Result};
use sqldb_query::{SqlGenerator, generator_for};

use crate::config::BackendConfig;

/// SQLSTATE codes PostgreSQL reports for transient connection failures.
pub const PGSQL_RETRY_CODES: [&str; 6] = ["08000", "08006", "53300", "57P03", "58000", "58030"];

/// Per-backend connection owner.
pub trait Engine: Send + Sync {
    /// The backend this engine drives.
    fn backend(&self) -> Backend;

    /// The driver handle, opened on first call.
    fn sql_db(&self) -> Result<Arc<dyn DriverConn>>;

    /// Return a handle obtained from [`Engine::sql_db`].
    fn release(&self, handle: &Arc<dyn DriverConn>);

    /// Close the driver handle. Terminal: later [`Engine::sql_db`] calls
    /// fail with [`Error::Closed`].
    fn close(&self) -> Result<()>;

    /// Whether an operation that failed with `err` may be retried.
    fn can_retry_err(&self, err: &DriverError) -> bool;

    /// The statement generator for this backend.
    fn sql_generator(&self) -> &'static dyn SqlGenerator;
}

/// Transient-error classification per backend.
pub fn can_retry(backend: Backend, err: &DriverError) -> bool {
    match backend {
        Backend::Sqlite => matches!(err.kind, DriverErrorKind::Busy | DriverErrorKind::Locked),
        Backend::Mysql => err.kind == DriverErrorKind::BusyBuffer,
        Backend::Pgsql => err
            .code
            .as_deref()
            .is_some_and(|code| PGSQL_RETRY_CODES.contains(&code)),
        Backend::Mssql => false,
    }
}

#[derive(Default)]
struct HandleState {
    handle: Option<Arc<dyn DriverConn>>,
    closed: bool,
}

/// [`Engine`] over any [`Driver`], parameterised by backend and DSN.
pub struct BackendEngine {
    backend: Backend,
    dsn: String,
    driver: Arc<dyn Driver>,
    state: Mutex<HandleState>,
}

impl BackendEngine {
    /// Create an engine. Nothing is opened until the first
    /// [`Engine::sql_db`] call.
    pub fn new(backend: Backend, dsn: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
        Self {
            backend,
            dsn: dsn.into(),
            driver,
            state: Mutex::new(HandleState::default()),
        }
    }

    /// The data source name handed to the driver.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }
}

impl std::fmt::Debug for BackendEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendEngine")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Engine for BackendEngine {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn sql_db(&self) -> Result<Arc<dyn DriverConn>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::Closed);
        }
        if let Some(handle) = &state.handle {
            return Ok(Arc::clone(handle));
        }

        tracing::trace!(backend = %self.backend, "Open SqlDB");
        let handle = self.driver.open(&self.dsn).map_err(Error::Open)?;
        state.handle = Some(Arc::clone(&handle));
        Ok(handle)
    }

    fn release(&self, _handle: &Arc<dyn DriverConn>) {
        tracing::trace!(backend = %self.backend, "Release SqlDB");
    }

    fn close(&self) -> Result<()> {
        let handle = {
            let mut state = self.state.lock();
            state.closed = true;
            state.handle.take()
        };
        if let Some(handle) = handle {
            tracing::trace!(backend = %self.backend, "Close SqlDB");
            handle.close().map_err(Error::driver)?;
        }
        Ok(())
    }

    fn can_retry_err(&self, err: &DriverError) -> bool {
        can_retry(self.backend, err)
    }

    fn sql_generator(&self) -> &'static dyn SqlGenerator {
        generator_for(self.backend)
    }
}

/// Build the engine for `config` on top of `driver`.
///
/// Validates the configuration and fails with [`Error::InvalidEngine`] when
/// the driver serves a different backend.
pub fn create_engine(config: &BackendConfig, driver: Arc<dyn Driver>) -> Result<BackendEngine> {
    let backend = config.backend();
    if driver.backend() != backend {
        return Err(Error::InvalidEngine);
    }
    let dsn = config.dsn()?;
    tracing::debug!(config = %config, "Creating engine");
    Ok(BackendEngine::new(backend, dsn, driver))
}
