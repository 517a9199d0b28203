//! Core types and the driver contract for SQLDB Rust.
//!
//! `sqldb-core` is the **foundation layer** of the workspace. Everything the
//! other crates exchange is defined here:
//!
//! - **Error taxonomy**: [`Error`], [`ErrorKind`] and [`ConfigError`].
//! - **Data model**: [`Value`] and [`Data`] (one row as a column-keyed map).
//! - **Statement shape**: [`StmtAttrs`], the dialect-neutral description of a
//!   single SQL operation.
//! - **Schema descriptors**: [`TableMeta`], [`ColumnMeta`], [`ConstraintMeta`].
//! - **Driver contract**: [`Driver`], [`DriverConn`], [`DriverTx`] and
//!   [`DriverError`], implemented by driver adapters such as `sqldb-sqlite`.
//! - **Cancellation**: [`Scope`], the cancellable, deadline-bound context every
//!   database operation runs in.
//!
//! # Who Uses This Crate
//!
//! - `sqldb-schema` renders [`TableMeta`] into DDL.
//! - `sqldb-query` renders [`StmtAttrs`] into dialect SQL.
//! - `sqldb-session` drives [`Driver`] handles with retry and timeouts.
//! - `sqldb-sqlite` implements the driver contract for the embedded dialect.

pub mod backend;
pub mod data;
pub mod driver;
pub mod error;
pub mod identifiers;
pub mod meta;
pub mod scope;
pub mod stmt;
pub mod value;

pub use backend::Backend;
pub use data::Data;
pub use driver::{Driver, DriverConn, DriverError, DriverErrorKind, DriverResult, DriverTx};
pub use error::{ConfigError, Error, ErrorKind, Result};
pub use identifiers::{is_sql_ident, new_guid};
pub use meta::{ColumnMeta, ConstraintMeta, GUID_COLUMN, GUID_SQL_TYPE, TableArgs, TableMeta};
pub use scope::{Scope, ScopeStatus};
pub use stmt::{PLACEHOLDER, StmtAttrs};
pub use value::Value;
