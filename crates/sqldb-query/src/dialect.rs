//! Dialect generators.
//!
//! | dialect | placeholder | pagination                                    |
//! |---------|-------------|-----------------------------------------------|
//! | sqlite  | `?`         | `LIMIT n OFFSET m`, `LIMIT -1` for offset-only |
//! | mysql   | `?`         | `LIMIT n OFFSET m`, max u64 for offset-only   |
//! | pgsql   | `$n`        | `LIMIT n`, `OFFSET m` independently           |
//! | mssql   | `@pn`       | `TOP(n)` or `OFFSET m ROWS FETCH NEXT n ROWS` |

use std::fmt::Write as _;

use sqldb_core::{Backend, StmtAttrs};

use crate::generator::{SqlGenerator, format_numbered};

/// SQLite generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGenerator;

impl SqlGenerator for SqliteGenerator {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn pagination(&self, attrs: &StmtAttrs) -> String {
        match (attrs.limit, attrs.offset) {
            (0, 0) => String::new(),
            (0, offset) => format!(" LIMIT -1 OFFSET {}", offset),
            (limit, 0) => format!(" LIMIT {}", limit),
            (limit, offset) => format!(" LIMIT {} OFFSET {}", limit, offset),
        }
    }
}

/// MySQL generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlGenerator;

impl SqlGenerator for MysqlGenerator {
    fn backend(&self) -> Backend {
        Backend::Mysql
    }

    fn pagination(&self, attrs: &StmtAttrs) -> String {
        match (attrs.limit, attrs.offset) {
            (0, 0) => String::new(),
            (0, offset) => format!(" LIMIT {} OFFSET {}", u64::MAX, offset),
            (limit, 0) => format!(" LIMIT {}", limit),
            (limit, offset) => format!(" LIMIT {} OFFSET {}", limit, offset),
        }
    }
}

/// PostgreSQL generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgsqlGenerator;

impl SqlGenerator for PgsqlGenerator {
    fn backend(&self) -> Backend {
        Backend::Pgsql
    }

    fn format_stmt(&self, stmt: &str) -> String {
        format_numbered(stmt, "$")
    }
}

/// SQL Server generator.
///
/// Without ORDER BY a bare row limit renders as `TOP`; an offset renders
/// `OFFSET .. FETCH` behind a neutral `ORDER BY (SELECT NULL)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlGenerator;

impl SqlGenerator for MssqlGenerator {
    fn backend(&self) -> Backend {
        Backend::Mssql
    }

    fn format_stmt(&self, stmt: &str) -> String {
        format_numbered(stmt, "@p")
    }

    fn select_head(&self, attrs: &StmtAttrs) -> String {
        if attrs.limit > 0 && attrs.offset == 0 && attrs.order_by.is_empty() {
            format!("SELECT TOP({})", attrs.limit)
        } else {
            "SELECT".to_string()
        }
    }

    fn pagination(&self, attrs: &StmtAttrs) -> String {
        let mut clause = String::new();
        if attrs.order_by.is_empty() {
            if attrs.offset == 0 {
                return clause;
            }
            clause.push_str(" ORDER BY (SELECT NULL)");
        }
        if attrs.offset > 0 || attrs.limit > 0 {
            let _ = write!(clause, " OFFSET {} ROWS", attrs.offset);
        }
        if attrs.limit > 0 {
            let _ = write!(clause, " FETCH NEXT {} ROWS ONLY", attrs.limit);
        }
        clause
    }
}

/// The generator for `backend`.
pub fn generator_for(backend: Backend) -> &'static dyn SqlGenerator {
    match backend {
        Backend::Sqlite => &SqliteGenerator,
        Backend::Mysql => &MysqlGenerator,
        Backend::Pgsql => &PgsqlGenerator,
        Backend::Mssql => &MssqlGenerator,
    }
}
