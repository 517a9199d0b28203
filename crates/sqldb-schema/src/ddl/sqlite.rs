//! SQLite DDL generator.
//!
//! SQLite has no native boolean storage, so boolean columns are constrained
//! to 0/1. `without_rowid` creates a `WITHOUT ROWID` table.

use super::DdlGenerator;
use sqldb_core::TableArgs;

/// DDL generator for SQLite.
pub struct SqliteDdlGenerator;

impl DdlGenerator for SqliteDdlGenerator {
    fn dialect(&self) -> &'static str {
        "sqlite"
    }

    fn boolean_check(&self) -> bool {
        true
    }

    fn table_suffix(&self, args: &TableArgs) -> Option<String> {
        args.get_bool(TableArgs::WITHOUT_ROWID)
            .then(|| "WITHOUT ROWID".to_string())
    }
}
