//! SQL statement generation for SQLDB Rust.
//!
//! [`SqlGenerator`] renders the dialect-neutral [`StmtAttrs`](sqldb_core::StmtAttrs)
//! into statement text and positional parameters. One unit struct per
//! dialect overrides what differs from standard SQL; [`generator_for`]
//! picks one for a [`Backend`](sqldb_core::Backend).

pub mod dialect;
pub mod generator;

pub use dialect::{MssqlGenerator, MysqlGenerator, PgsqlGenerator, SqliteGenerator, generator_for};
pub use generator::{SqlGenerator, format_numbered, format_repeated};
