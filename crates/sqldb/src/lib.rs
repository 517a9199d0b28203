//! SQLDB Rust: one API over SQLite, MySQL, PostgreSQL and SQL Server.
//!
//! Describe tables once with [`TableMeta`], query them through a
//! [`Session`], and let the per-dialect generators render the SQL.
//!
//! # Crates
//!
//! - `sqldb-core`: values, rows, errors, table descriptors, the driver
//!   contract and cancellation scopes.
//! - `sqldb-schema`: CREATE TABLE / CREATE INDEX generation per dialect.
//! - `sqldb-query`: statement generation per dialect.
//! - `sqldb-session`: database, sessions with retry and timeouts, queries,
//!   models and initialization.
//! - `sqldb-sqlite` (feature `sqlite`, on by default): embedded SQLite
//!   driver.
//!
//! # Example
//!
//! ```ignore
//! use sqldb::prelude::*;
//!
//! let meta = TableMeta::new()
//!     .with_auto_guid(true)
//!     .with_column(ColumnMeta::new("title", "VARCHAR(128) NOT NULL").unique_key())
//!     .with_column(ColumnMeta::new("access_level", "INTEGER NOT NULL"));
//! let roles = BaseModel::new("roles", meta);
//!
//! let config = BackendConfig::Sqlite(SqliteConfig::new("app.db"));
//! let db = Database::open(&config, Arc::new(SqliteDriver), DatabaseOptions::default())?;
//! initialize_models(&db, &[TableModel::new("roles", &roles)])?;
//!
//! let guid = db.query(&roles).insert(
//!     Data::new().with("title", "managers").with("access_level", 5),
//! )?;
//! assert_eq!(db.query(&roles).filter_by("title", "managers").count()?, 1);
//! ```

use std::sync::Arc;

pub use sqldb_core::{
    Backend, ColumnMeta, ConfigError, ConstraintMeta, Data, Driver, DriverConn, DriverError,
    DriverErrorKind, DriverResult, DriverTx, Error, ErrorKind, GUID_COLUMN, PLACEHOLDER, Result,
    Scope, ScopeStatus, StmtAttrs, TableArgs, TableMeta, Value, is_sql_ident, new_guid,
};
pub use sqldb_query::{SqlGenerator, generator_for};
pub use sqldb_schema::{DdlGenerator, ddl_generator};
pub use sqldb_session::{
    BackendConfig, BackendEngine, BaseModel, Canceller, Database, DatabaseOptions, Engine, Model,
    ModelMeta, Query, ServerConfig, Session, SqliteConfig, TableModel, create_engine,
    initialize_models,
};

#[cfg(feature = "sqlite")]
pub use sqldb_sqlite::SqliteDriver;

/// Open a database from a loosely typed configuration document.
///
/// The document holds the [`BackendConfig`] fields tagged by `backend`, plus
/// an optional `options` object parsed by [`DatabaseOptions::from_json`]:
///
/// ```json
/// {
///   "backend": "sqlite",
///   "database": "app.db",
///   "options": {"operation_timeout": 5, "retry_interval": "0.2"}
/// }
/// ```
pub fn open_json(doc: &serde_json::Value, driver: Arc<dyn Driver>) -> Result<Database> {
    let serde_json::Value::Object(fields) = doc else {
        return Err(ConfigError::Invalid("configuration must be an object".into()).into());
    };

    let mut fields = fields.clone();
    let options = match fields.remove("options") {
        Some(options) => DatabaseOptions::from_json(&options)?,
        None => DatabaseOptions::default(),
    };
    let config: BackendConfig = serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

    tracing::debug!(config = %config, "Opening database from configuration");
    Database::open(&config, driver, options)
}

/// Everything needed for day-to-day use.
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::{
        BackendConfig, BaseModel, ColumnMeta, ConstraintMeta, Data, Database, DatabaseOptions,
        Error, ErrorKind, Model, ModelMeta, Query, Result, ServerConfig, Session, SqliteConfig,
        TableMeta, TableModel, Value, initialize_models,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::SqliteDriver;
}
