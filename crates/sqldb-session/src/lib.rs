//! Database, session, query and model layer for SQLDB Rust.
//!
//! This crate runs statements produced by `sqldb-query` against a driver
//! implementing the `sqldb-core` driver contract.
//!
//! # Layers
//!
//! - [`Database`]: one connection target. Owns the [`Engine`], the retry and
//!   timeout policy ([`DatabaseOptions`]) and a lifecycle scope cancelled by
//!   [`Database::shutdown`].
//! - [`Session`]: one unit of work. Runs statements with retry on transient
//!   errors, bounded by the operation timeout and interruptible through
//!   [`Session::cancel`]. Holds at most one open transaction.
//! - [`Query`]: fluent builder bound to a session and a [`Model`].
//! - [`initialize_models`]: creates, alters and seeds tables described by
//!   [`ModelMeta`] implementations.
//!
//! # Example
//!
//! ```ignore
//! let db = Database::open(&config, Arc::new(SqliteDriver), DatabaseOptions::default())?;
//! initialize_models(&db, &[TableModel::new("roles", &roles)])?;
//!
//! let guid = db.query(&roles).insert(Data::new().with("title", "managers"))?;
//! let row = db.query(&roles).get(&guid)?;
//! ```

pub mod config;
pub mod database;
pub mod engine;
pub mod model;
pub mod query;
pub mod session;

pub use config::{BackendConfig, DatabaseOptions, ServerConfig, SqliteConfig};
pub use database::Database;
pub use engine::{BackendEngine, Engine, PGSQL_RETRY_CODES, can_retry, create_engine};
pub use model::{BaseModel, Model, ModelMeta, TableModel, initialize_models};
pub use query::Query;
pub use session::{Canceller, Session};
