//! MySQL DDL generator.

use super::DdlGenerator;
use sqldb_core::TableArgs;

/// DDL generator for MySQL.
pub struct MysqlDdlGenerator;

impl DdlGenerator for MysqlDdlGenerator {
    fn dialect(&self) -> &'static str {
        "mysql"
    }

    // BOOLEAN is an alias of TINYINT(1)
    fn boolean_check(&self) -> bool {
        true
    }

    fn table_suffix(&self, args: &TableArgs) -> Option<String> {
        args.get_str(TableArgs::MYSQL_STORAGE_ENGINE)
            .map(|engine| format!("ENGINE={}", engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldb_core::{ColumnMeta, TableMeta};

    fn flags() -> TableMeta {
        TableMeta::new()
            .with_column(ColumnMeta::new("id", "INT NOT NULL").primary_key())
            .with_column(ColumnMeta::new("enabled", "BOOLEAN NOT NULL DEFAULT false"))
    }

    #[test]
    fn test_boolean_check() {
        let stmts = MysqlDdlGenerator.create_table("flags", &flags());
        assert!(stmts[0].contains("enabled BOOLEAN NOT NULL DEFAULT false"));
        assert!(stmts[0].contains("CHECK (enabled IN (0,1))"));
    }

    #[test]
    fn test_storage_engine() {
        let meta = flags().with_arg(TableArgs::MYSQL_STORAGE_ENGINE, "InnoDB");
        let stmts = MysqlDdlGenerator.create_table("flags", &meta);
        assert!(stmts[0].ends_with("\n) ENGINE=InnoDB;"));
        assert_eq!(
            stmts[1],
            "CREATE UNIQUE INDEX IF NOT EXISTS ix_flags_id ON flags (id);"
        );
    }

    #[test]
    fn test_blank_storage_engine_ignored() {
        let meta = flags().with_arg(TableArgs::MYSQL_STORAGE_ENGINE, "  ");
        let stmts = MysqlDdlGenerator.create_table("flags", &meta);
        assert!(stmts[0].ends_with("\n);"));
    }
}
