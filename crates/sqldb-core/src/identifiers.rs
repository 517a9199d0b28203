//! Identifier validation and guid generation.

use regex::Regex;
use std::sync::OnceLock;

const SQL_IDENT_PATTERN: &str = r"^[A-Za-z0-9_]+$";

fn ident_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(SQL_IDENT_PATTERN) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern = SQL_IDENT_PATTERN, error = %e, "Invalid identifier pattern");
            None
        }
    })
    .as_ref()
}

/// Whether `name` is a plain SQL identifier (letters, digits, underscore).
pub fn is_sql_ident(name: &str) -> bool {
    ident_regex().is_some_and(|re| re.is_match(name))
}

/// A fresh 32-character lowercase hex guid.
pub fn new_guid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
