//! Microsoft SQL Server DDL generator.
//!
//! SQL Server has neither `IF NOT EXISTS` on `CREATE` nor a BOOLEAN type:
//! tables are guarded with `OBJECT_ID`, indexes with a `sys.indexes`
//! lookup, and boolean columns become `BIT` with 0/1 literals. `RESTRICT`
//! referential actions are spelled `NO ACTION`.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use super::{DdlGenerator, IndexDef};

/// DDL generator for SQL Server.
pub struct MssqlDdlGenerator;

struct Rewrites {
    boolean: Regex,
    true_literal: Regex,
    false_literal: Regex,
    restrict: Regex,
}

fn rewrites() -> Option<&'static Rewrites> {
    static REWRITES: OnceLock<Option<Rewrites>> = OnceLock::new();
    REWRITES
        .get_or_init(|| {
            let compile = |pattern: &str| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = pattern, error = %e, "Invalid DDL rewrite pattern");
                    None
                }
            };
            Some(Rewrites {
                boolean: compile(r"(?i)\bBOOLEAN\b")?,
                true_literal: compile(r"(?i)\btrue\b")?,
                false_literal: compile(r"(?i)\bfalse\b")?,
                restrict: compile(r"(?i)\bRESTRICT\b")?,
            })
        })
        .as_ref()
}

impl DdlGenerator for MssqlDdlGenerator {
    fn dialect(&self) -> &'static str {
        "mssql"
    }

    fn column_type<'a>(&self, sql_type: &'a str) -> Cow<'a, str> {
        let Some(re) = rewrites() else {
            return Cow::Borrowed(sql_type);
        };
        if !re.boolean.is_match(sql_type) {
            return Cow::Borrowed(sql_type);
        }
        let t = re.boolean.replace_all(sql_type, "BIT");
        let t = re.true_literal.replace_all(&t, "1");
        let t = re.false_literal.replace_all(&t, "0");
        Cow::Owned(t.into_owned())
    }

    fn constraint_definition<'a>(&self, definition: &'a str) -> Cow<'a, str> {
        match rewrites() {
            Some(re) => re.restrict.replace_all(definition, "NO ACTION"),
            None => Cow::Borrowed(definition),
        }
    }

    fn create_table_header(&self, table: &str, guarded: bool) -> String {
        if guarded {
            format!("IF OBJECT_ID(N'{}', N'U') IS NULL\nCREATE TABLE {}", table, table)
        } else {
            format!("CREATE TABLE {}", table)
        }
    }

    fn create_index(&self, table: &str, index: &IndexDef, guarded: bool) -> String {
        let create = format!(
            "CREATE {}INDEX {} ON {} ({});",
            if index.unique { "UNIQUE " } else { "" },
            index.name,
            table,
            index.column
        );
        if guarded {
            format!(
                "IF NOT EXISTS (SELECT * FROM sys.indexes WHERE name='{}')\n{}",
                index.name, create
            )
        } else {
            create
        }
    }
}
