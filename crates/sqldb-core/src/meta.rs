//! Table schema descriptors.
//!
//! A [`TableMeta`] is an immutable description of one table: its columns,
//! extra constraints, whether it uses an auto-generated guid primary key,
//! and dialect-specific arguments. The DDL generators in `sqldb-schema`
//! render it; the query layer reads it to know which columns are primary.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::Value;

/// Name of the auto-generated primary key column.
pub const GUID_COLUMN: &str = "guid";

/// SQL type of the auto-generated primary key column.
pub const GUID_SQL_TYPE: &str = "VARCHAR(32) NOT NULL";

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,
    /// SQL type and column modifiers, e.g. `VARCHAR(128) NOT NULL`.
    pub sql_type: String,
    /// Part of the primary key.
    pub primary: bool,
    /// Values must be unique.
    pub unique: bool,
    /// Create an index on this column.
    pub index: bool,
}

impl ColumnMeta {
    /// A plain column.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            primary: false,
            unique: false,
            index: false,
        }
    }

    /// Mark as primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Mark as unique.
    pub fn unique_key(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark as indexed.
    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    /// Whether the SQL type is a boolean.
    pub fn is_boolean(&self) -> bool {
        self.sql_type
            .split_whitespace()
            .next()
            .is_some_and(|t| t.eq_ignore_ascii_case("BOOLEAN"))
    }
}

/// An explicit table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintMeta {
    /// Constraint name; rendered as `CONSTRAINT <name>` when non-empty.
    pub name: String,
    /// SQL definition, e.g. `FOREIGN KEY (role_id) REFERENCES roles (guid)`.
    pub definition: String,
}

impl ConstraintMeta {
    /// A named constraint.
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }

    /// An anonymous constraint.
    pub fn unnamed(definition: impl Into<String>) -> Self {
        Self::new("", definition)
    }
}

/// Dialect-specific table arguments.
///
/// Recognised keys: `disable_table_exists`, `disable_index_exists`,
/// `without_rowid` (SQLite) and `mysql_storage_engine` (MySQL).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TableArgs(BTreeMap<String, Value>);

impl TableArgs {
    /// Skip the "table exists" guard.
    pub const DISABLE_TABLE_EXISTS: &'static str = "disable_table_exists";
    /// Skip the "index exists" guards.
    pub const DISABLE_INDEX_EXISTS: &'static str = "disable_index_exists";
    /// Create a SQLite `WITHOUT ROWID` table.
    pub const WITHOUT_ROWID: &'static str = "without_rowid";
    /// MySQL storage engine name.
    pub const MYSQL_STORAGE_ENGINE: &'static str = "mysql_storage_engine";

    /// Empty argument map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an argument.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw argument value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Boolean argument; absent or non-boolean reads as `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// String argument; absent, non-text or blank reads as `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether no arguments are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Schema descriptor for one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableMeta {
    /// Columns, in declaration order.
    pub columns: Vec<ColumnMeta>,
    /// Explicit constraints, appended after the column-derived ones.
    pub constraints: Vec<ConstraintMeta>,
    /// Use a generated 32-character guid as primary key.
    pub auto_guid: bool,
    /// Dialect-specific arguments.
    pub args: TableArgs,
}

impl TableMeta {
    /// An empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the auto-generated guid primary key.
    pub fn with_auto_guid(mut self, auto_guid: bool) -> Self {
        self.auto_guid = auto_guid;
        self
    }

    /// Append a column.
    pub fn with_column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    /// Append a constraint.
    pub fn with_constraint(mut self, constraint: ConstraintMeta) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Set a dialect argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.set(key, value);
        self
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the primary key columns.
    pub fn primary_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.primary)
            .map(|c| c.name.as_str())
    }

    /// Whether the guid column has to be prepended before rendering.
    pub fn needs_guid_column(&self) -> bool {
        self.auto_guid && self.columns.first().is_none_or(|c| c.name != GUID_COLUMN)
    }

    /// The descriptor with the guid column prepended when `auto_guid` asks
    /// for it. Borrows `self` unchanged when nothing has to be added.
    pub fn with_guid_column(&self) -> Cow<'_, TableMeta> {
        if !self.needs_guid_column() {
            return Cow::Borrowed(self);
        }
        let mut meta = self.clone();
        meta.columns
            .insert(0, ColumnMeta::new(GUID_COLUMN, GUID_SQL_TYPE).primary_key());
        Cow::Owned(meta)
    }
}
