//! Fluent statement builder bound to a session and a model.
//!
//! A [`Query`] starts from the model's defaults and is refined by chained
//! setters. Terminal operations (`all`, `first`, `one`, `get`, `count`,
//! `insert`, `update`, `delete`) render the statement with the backend's
//! generator and run it through the session.
//!
//! Identifiers passed to [`Query::table_name`] and [`Query::filter_by`] are
//! validated; the first invalid one is remembered and returned by the next
//! terminal operation instead of running any SQL.

use sqldb_core::{
    Data, Error, GUID_COLUMN, PLACEHOLDER, Result, StmtAttrs, Value, is_sql_ident, new_guid,
};
use sqldb_query::SqlGenerator;

use crate::model::Model;
use crate::session::Session;

enum SessionRef<'a> {
    Borrowed(&'a Session<'a>),
    Owned(Session<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterMode {
    None,
    Expr,
    Columns,
}

/// Statement builder for one model.
///
/// # Example
///
/// ```ignore
/// let admins = session
///     .query(&roles)
///     .filter_by("access_level", 5)
///     .order_by(["title DESC"])
///     .limit(10)
///     .all()?;
/// ```
pub struct Query<'a> {
    session: SessionRef<'a>,
    model: &'a dyn Model,
    attrs: StmtAttrs,
    mode: FilterMode,
    invalid_ident: Option<String>,
}

impl<'a> Query<'a> {
    pub(crate) fn borrowed(session: &'a Session<'a>, model: &'a dyn Model) -> Self {
        Self::new(SessionRef::Borrowed(session), model)
    }

    pub(crate) fn owned(session: Session<'a>, model: &'a dyn Model) -> Self {
        Self::new(SessionRef::Owned(session), model)
    }

    fn new(session: SessionRef<'a>, model: &'a dyn Model) -> Self {
        let attrs = StmtAttrs {
            columns: model.columns().to_vec(),
            order_by: model.orders().to_vec(),
            limit: model.limit(),
            ..StmtAttrs::default()
        };
        Self {
            session,
            model,
            attrs,
            mode: FilterMode::None,
            invalid_ident: None,
        }
        .table_name(model.table_name())
    }

    /// The statement attributes built so far.
    pub fn attrs(&self) -> &StmtAttrs {
        &self.attrs
    }

    fn session(&self) -> &Session<'a> {
        match &self.session {
            SessionRef::Borrowed(s) => s,
            SessionRef::Owned(s) => s,
        }
    }

    fn generator(&self) -> &'static dyn SqlGenerator {
        self.session().database().sql_generator()
    }

    fn ident(&mut self, name: &str) -> bool {
        if is_sql_ident(name) {
            return true;
        }
        if self.invalid_ident.is_none() {
            tracing::debug!(name, "Invalid sql identifier");
            self.invalid_ident = Some(name.to_string());
        }
        false
    }

    fn check(&self) -> Result<()> {
        match &self.invalid_ident {
            Some(name) => Err(Error::operation(format!("invalid sql identifier '{}'", name))),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// Run against `name` instead of the model's table.
    pub fn table_name(mut self, name: &str) -> Self {
        if self.ident(name) {
            self.attrs.table_name = name.to_string();
        }
        self
    }

    /// Select `columns`, which may be expressions with an `AS` alias.
    ///
    /// When no ordering is set yet, orders by the first column ascending.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs.columns = columns.into_iter().map(Into::into).collect();
        if self.attrs.order_by.is_empty() {
            if let Some(first) = self.attrs.columns.first() {
                let key = first
                    .rsplit_once(" AS ")
                    .or_else(|| first.rsplit_once(" as "))
                    .map_or(first.as_str(), |(_, alias)| alias)
                    .trim();
                self.attrs.order_by = vec![format!("{} ASC", key)];
            }
        }
        self
    }

    /// Use `expr` as the WHERE clause, with one argument per placeholder.
    /// Discards any conditions added by [`Query::filter_by`].
    pub fn filter(mut self, expr: impl Into<String>, args: Vec<Value>) -> Self {
        self.attrs.filters = expr.into();
        self.attrs.filters_args = args;
        self.mode = FilterMode::Expr;
        self
    }

    /// Add the condition `column = value`. Repeated calls are AND-combined;
    /// the first call discards an expression set by [`Query::filter`].
    pub fn filter_by(mut self, column: &str, value: impl Into<Value>) -> Self {
        if !self.ident(column) {
            return self;
        }
        if self.mode != FilterMode::Columns {
            self.attrs.filters.clear();
            self.attrs.filters_args.clear();
            self.mode = FilterMode::Columns;
        }
        if !self.attrs.filters.is_empty() {
            self.attrs.filters.push_str(" AND ");
        }
        self.attrs.filters.push_str(column);
        self.attrs.filters.push('=');
        self.attrs.filters.push_str(PLACEHOLDER);
        self.attrs.filters_args.push(value.into());
        self
    }

    /// Group by `columns`.
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Order by `orders`, e.g. `"title DESC"`.
    pub fn order_by<I, S>(mut self, orders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs.order_by = orders.into_iter().map(Into::into).collect();
        self
    }

    /// Use `expr` as the HAVING clause.
    pub fn having(mut self, expr: impl Into<String>, args: Vec<Value>) -> Self {
        self.attrs.having = expr.into();
        self.attrs.having_args = args;
        self
    }

    /// Skip the first `offset` rows.
    pub fn offset(mut self, offset: u64) -> Self {
        self.attrs.offset = offset;
        self
    }

    /// Return at most `limit` rows; 0 removes the limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.attrs.limit = limit;
        self
    }

    // ========================================================================
    // Reads
    // ========================================================================

    fn select(&self, attrs: &StmtAttrs) -> Result<Vec<Data>> {
        self.check()?;
        let (stmt, params) = self.generator().select(attrs);
        let mut rows = self.session().fetch(&stmt, &params)?;
        self.model.data_decode(&mut rows)?;
        Ok(rows)
    }

    /// All matching rows.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.attrs.table_name))]
    pub fn all(&self) -> Result<Vec<Data>> {
        self.select(&self.attrs)
    }

    /// The first matching row.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.attrs.table_name))]
    pub fn first(&self) -> Result<Option<Data>> {
        let attrs = StmtAttrs {
            limit: 1,
            offset: 0,
            ..self.attrs.clone()
        };
        Ok(self.select(&attrs)?.into_iter().next())
    }

    /// The only matching row. Fails when more than one row matches.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.attrs.table_name))]
    pub fn one(&self) -> Result<Option<Data>> {
        let attrs = StmtAttrs {
            limit: 2,
            offset: 0,
            ..self.attrs.clone()
        };
        single(self.select(&attrs)?)
    }

    /// The row with `guid`, ignoring every filter, grouping and ordering
    /// set so far.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.attrs.table_name))]
    pub fn get(&self, guid: &str) -> Result<Option<Data>> {
        let attrs = StmtAttrs {
            filters: format!("{}={}", GUID_COLUMN, PLACEHOLDER),
            filters_args: vec![Value::from(guid)],
            group_by: Vec::new(),
            order_by: Vec::new(),
            having: String::new(),
            having_args: Vec::new(),
            limit: 2,
            offset: 0,
            ..self.attrs.clone()
        };
        single(self.select(&attrs)?)
    }

    /// Number of matching rows, or of groups when grouped.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.attrs.table_name))]
    pub fn count(&self) -> Result<i64> {
        self.check()?;
        let (stmt, params) = self.generator().count(&self.attrs);
        let rows = self.session().fetch(&stmt, &params)?;
        rows.first()
            .and_then(|row| row.get("count"))
            .and_then(|v| {
                v.as_i64()
                    .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            })
            .ok_or_else(|| Error::operation("invalid query result"))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert one row and return its guid; empty when the model does not
    /// generate guids.
    #[tracing::instrument(level = "debug", skip(self, data), fields(table = %self.attrs.table_name))]
    pub fn insert(&self, data: Data) -> Result<String> {
        self.check()?;
        let mut data = self.encode(data)?;

        let mut guid = String::new();
        if self.model.is_auto_guid() {
            guid = data.get_string(GUID_COLUMN);
            if guid.is_empty() {
                guid = new_guid();
                data.insert(GUID_COLUMN, guid.as_str());
            }
        }

        let (stmt, params) = self.generator().insert(&self.attrs, &data);
        self.session().exec(&stmt, &params)?;
        Ok(guid)
    }

    /// Update matching rows with `data` and return the rows affected.
    ///
    /// The guid of auto-guid models and every primary key column are
    /// dropped from `data` first.
    #[tracing::instrument(level = "debug", skip(self, data), fields(table = %self.attrs.table_name))]
    pub fn update(&self, data: Data) -> Result<u64> {
        self.check()?;
        let mut data = self.encode(data)?;

        if self.model.is_auto_guid() {
            data.remove(GUID_COLUMN);
        }
        for column in self.model.table_meta().primary_columns() {
            data.remove(column);
        }
        if data.is_empty() {
            return Err(Error::operation("empty data"));
        }

        let (stmt, params) = self.generator().update(&self.attrs, &data);
        self.session().exec(&stmt, &params)
    }

    /// Delete matching rows and return the rows affected.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.attrs.table_name))]
    pub fn delete(&self) -> Result<u64> {
        self.check()?;
        let (stmt, params) = self.generator().delete(&self.attrs);
        self.session().exec(&stmt, &params)
    }

    fn encode(&self, data: Data) -> Result<Data> {
        if data.is_empty() {
            return Err(Error::operation("empty data"));
        }
        let mut rows = [data];
        self.model.data_encode(&mut rows)?;
        let [data] = rows;
        Ok(data)
    }
}

fn single(rows: Vec<Data>) -> Result<Option<Data>> {
    if rows.len() > 1 {
        return Err(Error::operation("multiple entries found"));
    }
    Ok(rows.into_iter().next())
}

impl std::fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("attrs", &self.attrs)
            .field("invalid_ident", &self.invalid_ident)
            .finish_non_exhaustive()
    }
}
