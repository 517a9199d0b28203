//! The database handle.

use std::sync::Arc;

use sqldb_core::{Backend, Driver, Error, Result, Scope};
use sqldb_query::SqlGenerator;

use crate::config::{BackendConfig, DatabaseOptions};
use crate::engine::{Engine, create_engine};
use crate::model::Model;
use crate::query::Query;
use crate::session::Session;

/// One logical connection target: an [`Engine`], the retry/timeout policy
/// and a lifecycle scope.
///
/// `Database` is `Send + Sync`; share it by reference between threads and
/// open one [`Session`] per unit of work.
///
/// # Example
///
/// ```ignore
/// let db = Database::open(&config, Arc::new(SqliteDriver), DatabaseOptions::default())?;
/// let session = db.session();
/// let rows = session.query(&roles).filter_by("title", "managers").all()?;
/// db.shutdown()?;
/// ```
pub struct Database {
    engine: Arc<dyn Engine>,
    options: DatabaseOptions,
    scope: Scope,
}

impl Database {
    /// Create a database over an existing engine.
    pub fn new(engine: Arc<dyn Engine>, options: DatabaseOptions) -> Self {
        tracing::debug!(
            backend = %engine.backend(),
            operation_timeout = options.operation_timeout,
            retry_interval = options.retry_interval,
            "New database"
        );
        Self {
            engine,
            options,
            scope: Scope::root(),
        }
    }

    /// Build the engine for `config` on `driver` and wrap it.
    pub fn open(
        config: &BackendConfig,
        driver: Arc<dyn Driver>,
        options: DatabaseOptions,
    ) -> Result<Self> {
        let engine = create_engine(config, driver)?;
        Ok(Self::new(Arc::new(engine), options))
    }

    /// The backend of the engine.
    pub fn backend(&self) -> Backend {
        self.engine.backend()
    }

    /// The engine.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Retry and timeout policy.
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    /// The engine's statement generator.
    pub fn sql_generator(&self) -> &'static dyn SqlGenerator {
        self.engine.sql_generator()
    }

    /// Open a new session.
    pub fn session(&self) -> Session<'_> {
        Session::new(self)
    }

    /// Start a query for `model` on a fresh session.
    pub fn query<'a>(&'a self, model: &'a dyn Model) -> Query<'a> {
        Query::owned(self.session(), model)
    }

    /// Check that the backend is reachable.
    pub fn ping(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let handle = self.engine.sql_db()?;
        let res = handle.ping().map_err(Error::driver);
        self.engine.release(&handle);
        res
    }

    /// Whether [`Database::shutdown`] has been called.
    pub fn is_closed(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Shut down: interrupts every running operation (they fail with
    /// [`Error::Break`]), makes later operations fail with
    /// [`Error::Closed`] and closes the driver handle.
    pub fn shutdown(&self) -> Result<()> {
        tracing::debug!(backend = %self.backend(), "Shutting down database");
        self.scope.cancel();
        self.engine.close()
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.backend())
            .field("options", &self.options)
            .field("closed", &self.is_closed())
            .finish()
    }
}
