//! SQLite data source names.
//!
//! Format: `<path>?<key>=<value>&...`. Every `_pragma=name(value)` argument
//! becomes a `PRAGMA name = value` run on each opened connection; other
//! arguments are ignored. The path `:memory:` selects a private in-memory
//! database shared by all connections of one handle.

use sqldb_core::{DriverError, DriverErrorKind, DriverResult, is_sql_ident, new_guid};

/// Path of an in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A database file.
    File(String),
    /// A shared-cache in-memory database, addressed by URI.
    Memory(String),
}

/// A parsed data source name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteDsn {
    /// Database location.
    pub target: Target,
    /// Pragmas as `name = value` (or bare `name`), in argument order.
    pub pragmas: Vec<String>,
}

impl SqliteDsn {
    /// Parse `dsn`.
    pub fn parse(dsn: &str) -> DriverResult<Self> {
        let (path, args) = dsn.split_once('?').unwrap_or((dsn, ""));
        let path = path.trim();
        if path.is_empty() {
            return Err(DriverError::new(
                DriverErrorKind::Connection,
                "missing database path",
            ));
        }

        let target = if path == MEMORY_PATH {
            Target::Memory(format!(
                "file:sqldb-{}?mode=memory&cache=shared",
                new_guid()
            ))
        } else {
            Target::File(path.to_string())
        };

        let mut pragmas = Vec::new();
        for arg in args.split('&').filter(|a| !a.is_empty()) {
            match arg.split_once('=') {
                Some(("_pragma", value)) => pragmas.push(parse_pragma(value)?),
                _ => tracing::debug!(arg, "Ignoring sqlite connection argument"),
            }
        }

        Ok(Self { target, pragmas })
    }
}

fn parse_pragma(arg: &str) -> DriverResult<String> {
    let invalid = || DriverError::new(DriverErrorKind::Connection, format!("invalid pragma '{}'", arg));
    let (name, value) = match arg.strip_suffix(')').and_then(|s| s.split_once('(')) {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (arg.trim(), None),
    };
    if !is_sql_ident(name) {
        return Err(invalid());
    }
    match value {
        Some(value) if is_sql_ident(value.trim_start_matches('-')) => {
            Ok(format!("{} = {}", name, value))
        }
        Some(_) => Err(invalid()),
        None => Ok(name.to_string()),
    }
}
