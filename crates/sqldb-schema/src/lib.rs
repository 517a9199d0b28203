//! Schema DDL generation for SQLDB Rust.
//!
//! `sqldb-schema` turns a [`TableMeta`](sqldb_core::TableMeta) into the
//! ordered statements that create a table: exactly one `CREATE TABLE`
//! followed by zero or more `CREATE INDEX` statements, each guarded against
//! re-creation so the output can be run on every startup.
//!
//! One [`DdlGenerator`](ddl::DdlGenerator) exists per dialect; pick one with
//! [`ddl_generator`](ddl::ddl_generator).

pub mod ddl;

pub use ddl::{
    DdlGenerator, IndexDef, MssqlDdlGenerator, MysqlDdlGenerator, PostgresDdlGenerator,
    SqliteDdlGenerator, ddl_generator,
};
