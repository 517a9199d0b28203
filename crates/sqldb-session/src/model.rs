//! Table models and schema initialization.
//!
//! A [`Model`] describes how queries address one table: its name, default
//! columns, ordering and row limit, plus encode/decode hooks applied to rows
//! on write and read. [`ModelMeta`] adds the lifecycle hooks run by
//! [`initialize_models`].

use sqldb_core::{Data, Result, TableMeta};

use crate::database::Database;
use crate::session::Session;

/// Query-facing description of one table.
pub trait Model: Send + Sync {
    /// Schema descriptor of the table.
    fn table_meta(&self) -> &TableMeta;

    /// Table name used in statements.
    fn table_name(&self) -> &str;

    /// Default selected columns; empty selects all.
    fn columns(&self) -> &[String] {
        &[]
    }

    /// Default ORDER BY expressions.
    fn orders(&self) -> &[String] {
        &[]
    }

    /// Default row limit; 0 for none.
    fn limit(&self) -> u64 {
        0
    }

    /// Whether inserts generate a guid and updates never touch it.
    fn is_auto_guid(&self) -> bool {
        self.table_meta().auto_guid
    }

    /// Transform rows before they are written.
    fn data_encode(&self, _rows: &mut [Data]) -> Result<()> {
        Ok(())
    }

    /// Transform rows after they are read.
    fn data_decode(&self, _rows: &mut [Data]) -> Result<()> {
        Ok(())
    }
}

/// A [`Model`] with schema lifecycle hooks.
///
/// Every hook receives the session of the running initialization phase and
/// the table it is bound to, which may differ from [`Model::table_name`]
/// when one model backs several tables.
pub trait ModelMeta: Model {
    /// Create the table. Runs the generated DDL by default.
    fn create_schema(&self, session: &Session<'_>, table: &str) -> Result<()> {
        tracing::debug!(table, "Creating schema");
        let generator = session.database().sql_generator();
        for stmt in generator.schema(table, self.table_meta()) {
            session.exec(&stmt, &[])?;
        }
        Ok(())
    }

    /// Modify an existing table.
    fn alter_schema(&self, _session: &Session<'_>, _table: &str) -> Result<()> {
        Ok(())
    }

    /// Seed the table. Runs on every initialization, so implementations
    /// must check before inserting.
    fn initial_data(&self, _session: &Session<'_>, _table: &str) -> Result<()> {
        Ok(())
    }
}

/// Data-driven [`Model`] and [`ModelMeta`].
///
/// # Example
///
/// ```ignore
/// let roles = BaseModel::new("roles", meta)
///     .with_columns(["guid", "title", "access_level"])
///     .with_orders(["title ASC"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BaseModel {
    table: String,
    meta: TableMeta,
    columns: Vec<String>,
    orders: Vec<String>,
    limit: u64,
}

impl BaseModel {
    /// A model for `table` described by `meta`.
    pub fn new(table: impl Into<String>, meta: TableMeta) -> Self {
        Self {
            table: table.into(),
            meta,
            ..Self::default()
        }
    }

    /// Set the default columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default ordering.
    pub fn with_orders<I, S>(mut self, orders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orders = orders.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default row limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

impl Model for BaseModel {
    fn table_meta(&self) -> &TableMeta {
        &self.meta
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn orders(&self) -> &[String] {
        &self.orders
    }

    fn limit(&self) -> u64 {
        self.limit
    }
}

impl ModelMeta for BaseModel {}

/// Binds a model to the table it initializes.
#[derive(Clone, Copy)]
pub struct TableModel<'a> {
    /// Target table.
    pub table: &'a str,
    /// The model whose hooks run for `table`.
    pub model: &'a dyn ModelMeta,
}

impl<'a> TableModel<'a> {
    /// Bind `model` to `table`.
    pub fn new(table: &'a str, model: &'a dyn ModelMeta) -> Self {
        Self { table, model }
    }
}

impl std::fmt::Debug for TableModel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableModel")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Create, alter and seed the tables of `models`.
///
/// Schema creation and alteration run in one transaction, seeding in a
/// second one. A failing hook rolls back its phase and the error is
/// returned; a failed schema phase never seeds.
#[tracing::instrument(level = "debug", skip(db, models))]
pub fn initialize_models(db: &Database, models: &[TableModel<'_>]) -> Result<()> {
    let mut session = db.session();

    tracing::info!(tables = models.len(), "Creating tables schema");
    session.transaction(|s| {
        for tm in models {
            tm.model.create_schema(s, tm.table)?;
        }
        for tm in models {
            tm.model.alter_schema(s, tm.table)?;
        }
        Ok(())
    })?;

    tracing::info!(tables = models.len(), "Adding tables initial data");
    session.transaction(|s| {
        for tm in models {
            tm.model.initial_data(s, tm.table)?;
        }
        Ok(())
    })
}
