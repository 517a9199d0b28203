//! DDL generation.
//!
//! The table layout is the same for every dialect:
//!
//! ```text
//! CREATE TABLE IF NOT EXISTS roles (
//!   guid VARCHAR(32) NOT NULL,
//!   title VARCHAR(128) NOT NULL,
//!   PRIMARY KEY (guid),
//!   UNIQUE (title)
//! );
//! CREATE UNIQUE INDEX IF NOT EXISTS ix_roles_guid ON roles (guid);
//! ```
//!
//! Column flags map to constraints and indexes as follows:
//!
//! | flags          | table body          | extra statement       |
//! |----------------|---------------------|-----------------------|
//! | primary        | `PRIMARY KEY (c)`   | `CREATE UNIQUE INDEX` |
//! | unique + index | -                   | `CREATE UNIQUE INDEX` |
//! | unique         | `UNIQUE (c)`        | -                     |
//! | index          | -                   | `CREATE INDEX`        |
//!
//! Dialects differ in type spelling, boolean checks, guard syntax and
//! trailing table clauses; those are the hooks of [`DdlGenerator`].

mod mssql;
mod mysql;
mod postgres;
mod sqlite;

pub use mssql::MssqlDdlGenerator;
pub use mysql::MysqlDdlGenerator;
pub use postgres::PostgresDdlGenerator;
pub use sqlite::SqliteDdlGenerator;

use std::borrow::Cow;

use sqldb_core::{Backend, TableArgs, TableMeta};

/// An index synthesized from column flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    /// Index name, `ix_<table>_<column>`.
    pub name: String,
    /// Indexed column.
    pub column: String,
    /// `CREATE UNIQUE INDEX` rather than `CREATE INDEX`.
    pub unique: bool,
}

impl IndexDef {
    fn new(table: &str, column: &str, unique: bool) -> Self {
        Self {
            name: index_name(table, column),
            column: column.to_string(),
            unique,
        }
    }
}

/// Deterministic index name for a single-column index.
pub fn index_name(table: &str, column: &str) -> String {
    format!("ix_{}_{}", table, column)
}

/// Per-dialect schema generator.
///
/// Implementors override the hooks; [`DdlGenerator::create_table`] assembles
/// the statements.
pub trait DdlGenerator: Send + Sync {
    /// Dialect name, matching [`Backend::as_str`].
    fn dialect(&self) -> &'static str;

    /// Column type as written in the table body.
    fn column_type<'a>(&self, sql_type: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(sql_type)
    }

    /// Whether boolean columns get a `CHECK (c IN (0,1))` constraint.
    fn boolean_check(&self) -> bool {
        false
    }

    /// Explicit constraint definition as written in the table body.
    fn constraint_definition<'a>(&self, definition: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(definition)
    }

    /// The `CREATE TABLE` header, up to and excluding the opening paren.
    fn create_table_header(&self, table: &str, guarded: bool) -> String {
        if guarded {
            format!("CREATE TABLE IF NOT EXISTS {}", table)
        } else {
            format!("CREATE TABLE {}", table)
        }
    }

    /// Clause appended after the closing paren of the table body.
    fn table_suffix(&self, _args: &TableArgs) -> Option<String> {
        None
    }

    /// One `CREATE INDEX` statement.
    fn create_index(&self, table: &str, index: &IndexDef, guarded: bool) -> String {
        format!(
            "CREATE {}INDEX {}{} ON {} ({});",
            if index.unique { "UNIQUE " } else { "" },
            if guarded { "IF NOT EXISTS " } else { "" },
            index.name,
            table,
            index.column
        )
    }

    /// Render `meta` into ordered DDL statements for `table`.
    ///
    /// The guid column is prepended on a local copy when `auto_guid` asks
    /// for it; `meta` itself is never modified.
    fn create_table(&self, table: &str, meta: &TableMeta) -> Vec<String> {
        tracing::debug!(dialect = self.dialect(), table = table, "Generating DDL");

        let meta = meta.with_guid_column();
        let mut body = Vec::new();
        let mut constraints = Vec::new();
        let mut indexes = Vec::new();

        for c in &meta.columns {
            body.push(format!("{} {}", c.name, self.column_type(&c.sql_type)));

            if self.boolean_check() && c.is_boolean() {
                constraints.push(format!("CHECK ({} IN (0,1))", c.name));
            }

            if c.primary {
                constraints.push(format!("PRIMARY KEY ({})", c.name));
                indexes.push(IndexDef::new(table, &c.name, true));
            } else if c.unique && c.index {
                indexes.push(IndexDef::new(table, &c.name, true));
            } else if c.unique {
                constraints.push(format!("UNIQUE ({})", c.name));
            } else if c.index {
                indexes.push(IndexDef::new(table, &c.name, false));
            }
        }
        body.append(&mut constraints);

        for c in &meta.constraints {
            let definition = self.constraint_definition(&c.definition);
            if c.name.is_empty() {
                body.push(definition.into_owned());
            } else {
                body.push(format!("CONSTRAINT {} {}", c.name, definition));
            }
        }

        let table_guard = !meta.args.get_bool(TableArgs::DISABLE_TABLE_EXISTS);
        let index_guard = !meta.args.get_bool(TableArgs::DISABLE_INDEX_EXISTS);

        let mut stmt = format!(
            "{} (\n  {}\n)",
            self.create_table_header(table, table_guard),
            body.join(",\n  ")
        );
        if let Some(suffix) = self.table_suffix(&meta.args) {
            stmt.push(' ');
            stmt.push_str(&suffix);
        }
        stmt.push(';');

        let mut stmts = Vec::with_capacity(indexes.len() + 1);
        stmts.push(stmt);
        stmts.extend(
            indexes
                .iter()
                .map(|idx| self.create_index(table, idx, index_guard)),
        );
        stmts
    }
}

/// The DDL generator for `backend`.
pub fn ddl_generator(backend: Backend) -> &'static dyn DdlGenerator {
    match backend {
        Backend::Sqlite => &SqliteDdlGenerator,
        Backend::Mysql => &MysqlDdlGenerator,
        Backend::Pgsql => &PostgresDdlGenerator,
        Backend::Mssql => &MssqlDdlGenerator,
    }
}
