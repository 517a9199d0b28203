//! The SQL generator contract.
//!
//! A generator renders [`StmtAttrs`] into statement text plus positional
//! parameters. Statement text uses the neutral [`PLACEHOLDER`]; the session
//! passes it through [`SqlGenerator::format_stmt`] right before execution.
//!
//! The provided methods implement standard SQL. Dialects override only what
//! differs, typically pagination and placeholder syntax.

use std::fmt::Write as _;

use sqldb_core::{Backend, Data, PLACEHOLDER, StmtAttrs, TableMeta, Value};
use sqldb_schema::ddl_generator;

/// Per-dialect statement generator.
pub trait SqlGenerator: Send + Sync {
    /// The dialect this generator renders for.
    fn backend(&self) -> Backend;

    /// Rewrite neutral placeholders into the dialect's native syntax.
    fn format_stmt(&self, stmt: &str) -> String {
        format_repeated(stmt, "?")
    }

    /// Leading `SELECT` keyword and any prefix modifiers.
    fn select_head(&self, _attrs: &StmtAttrs) -> String {
        "SELECT".to_string()
    }

    /// Pagination clause appended after ORDER BY, with a leading space.
    fn pagination(&self, attrs: &StmtAttrs) -> String {
        let mut clause = String::new();
        if attrs.limit > 0 {
            let _ = write!(clause, " LIMIT {}", attrs.limit);
        }
        if attrs.offset > 0 {
            let _ = write!(clause, " OFFSET {}", attrs.offset);
        }
        clause
    }

    /// `SELECT` statement.
    fn select(&self, attrs: &StmtAttrs) -> (String, Vec<Value>) {
        let mut stmt = self.select_head(attrs);
        stmt.push(' ');
        stmt.push_str(&select_list(attrs));
        stmt.push_str(" FROM ");
        stmt.push_str(&attrs.table_name);
        push_conditions(&mut stmt, attrs);
        if !attrs.order_by.is_empty() {
            stmt.push_str(" ORDER BY ");
            stmt.push_str(&attrs.order_by.join(", "));
        }
        stmt.push_str(&self.pagination(attrs));
        stmt.push(';');

        (stmt, condition_params(attrs))
    }

    /// `SELECT count(*) AS count` statement.
    ///
    /// With GROUP BY, the grouped select is wrapped in a derived table so
    /// the single result row holds the number of groups.
    fn count(&self, attrs: &StmtAttrs) -> (String, Vec<Value>) {
        let stmt = if attrs.group_by.is_empty() {
            let mut stmt = format!("SELECT count(*) AS count FROM {}", attrs.table_name);
            push_conditions(&mut stmt, attrs);
            stmt.push(';');
            stmt
        } else {
            let mut inner = format!(
                "SELECT {} FROM {}",
                attrs.group_by.join(", "),
                attrs.table_name
            );
            push_conditions(&mut inner, attrs);
            format!("SELECT count(*) AS count FROM ({}) AS grp;", inner)
        };

        (stmt, condition_params(attrs))
    }

    /// `INSERT` statement for one row.
    fn insert(&self, attrs: &StmtAttrs, data: &Data) -> (String, Vec<Value>) {
        let mut columns = Vec::with_capacity(data.len());
        let mut params = Vec::with_capacity(data.len());
        for (column, value) in data {
            columns.push(column.as_str());
            params.push(value.clone());
        }
        let holders = vec![PLACEHOLDER; columns.len()];
        let stmt = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            attrs.table_name,
            columns.join(", "),
            holders.join(", ")
        );

        (stmt, params)
    }

    /// `UPDATE` statement. The WHERE clause comes from the attributes'
    /// filter, never from `data`.
    fn update(&self, attrs: &StmtAttrs, data: &Data) -> (String, Vec<Value>) {
        let mut sets = Vec::with_capacity(data.len());
        let mut params = Vec::with_capacity(data.len() + attrs.filters_args.len());
        for (column, value) in data {
            sets.push(format!("{}={}", column, PLACEHOLDER));
            params.push(value.clone());
        }
        let mut stmt = format!("UPDATE {} SET {}", attrs.table_name, sets.join(", "));
        if !attrs.filters.is_empty() {
            stmt.push_str(" WHERE ");
            stmt.push_str(&attrs.filters);
        }
        stmt.push(';');
        params.extend(attrs.filters_args.iter().cloned());

        (stmt, params)
    }

    /// `DELETE` statement.
    fn delete(&self, attrs: &StmtAttrs) -> (String, Vec<Value>) {
        let mut stmt = format!("DELETE FROM {}", attrs.table_name);
        if !attrs.filters.is_empty() {
            stmt.push_str(" WHERE ");
            stmt.push_str(&attrs.filters);
        }
        stmt.push(';');

        (stmt, attrs.filters_args.clone())
    }

    /// Ordered DDL creating `table`.
    fn schema(&self, table: &str, meta: &TableMeta) -> Vec<String> {
        ddl_generator(self.backend()).create_table(table, meta)
    }
}

fn select_list(attrs: &StmtAttrs) -> String {
    if attrs.columns.is_empty() {
        "*".to_string()
    } else {
        attrs.columns.join(", ")
    }
}

fn push_conditions(stmt: &mut String, attrs: &StmtAttrs) {
    if !attrs.filters.is_empty() {
        stmt.push_str(" WHERE ");
        stmt.push_str(&attrs.filters);
    }
    if !attrs.group_by.is_empty() {
        stmt.push_str(" GROUP BY ");
        stmt.push_str(&attrs.group_by.join(", "));
    }
    if !attrs.having.is_empty() {
        stmt.push_str(" HAVING ");
        stmt.push_str(&attrs.having);
    }
}

fn condition_params(attrs: &StmtAttrs) -> Vec<Value> {
    attrs
        .filters_args
        .iter()
        .chain(&attrs.having_args)
        .cloned()
        .collect()
}

/// Replace every neutral placeholder with the same native `token`.
pub fn format_repeated(stmt: &str, token: &str) -> String {
    stmt.replace(PLACEHOLDER, token)
}

/// Replace neutral placeholders left to right with `<prefix>1`,
/// `<prefix>2`, ...
pub fn format_numbered(stmt: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(stmt.len() + 8);
    let mut rest = stmt;
    let mut n = 0usize;
    while let Some(pos) = rest.find(PLACEHOLDER) {
        n += 1;
        out.push_str(&rest[..pos]);
        let _ = write!(out, "{}{}", prefix, n);
        rest = &rest[pos + PLACEHOLDER.len()..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Standard;

    impl SqlGenerator for Standard {
        fn backend(&self) -> Backend {
            Backend::Pgsql
        }
    }

    fn attrs() -> StmtAttrs {
        StmtAttrs {
            table_name: "roles".into(),
            filters: "access_level>{?}".into(),
            filters_args: vec![Value::Int(2)],
            ..StmtAttrs::default()
        }
    }

    #[test]
    fn test_select_all_columns() {
        let (stmt, params) = Standard.select(&StmtAttrs::new("roles"));
        assert_eq!(stmt, "SELECT * FROM roles;");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_full() {
        let mut a = attrs();
        a.columns = vec!["title".into(), "count(*) AS n".into()];
        a.group_by = vec!["title".into()];
        a.having = "count(*)>{?}".into();
        a.having_args = vec![Value::Int(1)];
        a.order_by = vec!["title ASC".into()];
        a.limit = 10;
        a.offset = 20;
        let (stmt, params) = Standard.select(&a);
        assert_eq!(
            stmt,
            "SELECT title, count(*) AS n FROM roles WHERE access_level>{?} \
             GROUP BY title HAVING count(*)>{?} ORDER BY title ASC LIMIT 10 OFFSET 20;"
        );
        assert_eq!(params, [Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn test_count() {
        let mut a = attrs();
        a.order_by = vec!["title ASC".into()];
        a.limit = 5;
        let (stmt, params) = Standard.count(&a);
        assert_eq!(
            stmt,
            "SELECT count(*) AS count FROM roles WHERE access_level>{?};"
        );
        assert_eq!(params, [Value::Int(2)]);
    }

    #[test]
    fn test_count_grouped_wraps_derived_table() {
        let mut a = attrs();
        a.group_by = vec!["access_level".into()];
        let (stmt, _) = Standard.count(&a);
        assert_eq!(
            stmt,
            "SELECT count(*) AS count FROM (SELECT access_level FROM roles \
             WHERE access_level>{?} GROUP BY access_level) AS grp;"
        );
    }

    #[test]
    fn test_insert_sorted_columns() {
        let data = Data::new().with("title", "managers").with("access_level", 5);
        let (stmt, params) = Standard.insert(&StmtAttrs::new("roles"), &data);
        assert_eq!(
            stmt,
            "INSERT INTO roles (access_level, title) VALUES ({?}, {?});"
        );
        assert_eq!(params, [Value::Int(5), Value::Text("managers".into())]);
    }

    #[test]
    fn test_update_params_order() {
        let data = Data::new().with("title", "admins");
        let (stmt, params) = Standard.update(&attrs(), &data);
        assert_eq!(stmt, "UPDATE roles SET title={?} WHERE access_level>{?};");
        assert_eq!(params, [Value::Text("admins".into()), Value::Int(2)]);
    }

    #[test]
    fn test_delete() {
        let (stmt, params) = Standard.delete(&attrs());
        assert_eq!(stmt, "DELETE FROM roles WHERE access_level>{?};");
        assert_eq!(params, [Value::Int(2)]);

        let (stmt, _) = Standard.delete(&StmtAttrs::new("roles"));
        assert_eq!(stmt, "DELETE FROM roles;");
    }

    #[test]
    fn test_format_numbered() {
        assert_eq!(
            format_numbered("a={?} AND b={?} OR c={?}", "$"),
            "a=$1 AND b=$2 OR c=$3"
        );
        assert_eq!(format_numbered("SELECT 1;", "$"), "SELECT 1;");
    }

    #[test]
    fn test_format_repeated() {
        assert_eq!(format_repeated("a={?} AND b={?}", "?"), "a=? AND b=?");
    }
}
