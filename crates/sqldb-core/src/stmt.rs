//! Dialect-neutral statement attributes.

use crate::value::Value;

/// Neutral positional placeholder used in statement text before a generator
/// rewrites it into the backend's native syntax.
pub const PLACEHOLDER: &str = "{?}";

/// The shape of one SQL operation.
///
/// Filter and having expressions are raw SQL fragments using
/// [`PLACEHOLDER`] for each bound argument, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StmtAttrs {
    /// Target table.
    pub table_name: String,
    /// Selected columns or expressions; empty selects all.
    pub columns: Vec<String>,
    /// WHERE expression.
    pub filters: String,
    /// Arguments for `filters`.
    pub filters_args: Vec<Value>,
    /// GROUP BY columns.
    pub group_by: Vec<String>,
    /// ORDER BY expressions, e.g. `"title ASC"`.
    pub order_by: Vec<String>,
    /// HAVING expression.
    pub having: String,
    /// Arguments for `having`.
    pub having_args: Vec<Value>,
    /// Rows to skip; 0 for none.
    pub offset: u64,
    /// Maximum rows; 0 for no limit.
    pub limit: u64,
}

impl StmtAttrs {
    /// Attributes for `table_name` with everything else unset.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }
}
