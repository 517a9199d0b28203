//! PostgreSQL DDL generator.
//!
//! PostgreSQL takes the standard layout as is: native BOOLEAN, `IF NOT
//! EXISTS` guards on tables and indexes.

use super::DdlGenerator;

/// DDL generator for PostgreSQL.
pub struct PostgresDdlGenerator;

impl DdlGenerator for PostgresDdlGenerator {
    fn dialect(&self) -> &'static str {
        "pgsql"
    }
}
