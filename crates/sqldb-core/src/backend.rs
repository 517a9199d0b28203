//! Database backend identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The SQL dialects the workspace drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Embedded SQLite file database.
    Sqlite,
    /// MySQL / MariaDB.
    Mysql,
    /// PostgreSQL.
    Pgsql,
    /// Microsoft SQL Server.
    Mssql,
}

impl Backend {
    /// All supported backends.
    pub const ALL: [Backend; 4] = [
        Backend::Sqlite,
        Backend::Mysql,
        Backend::Pgsql,
        Backend::Mssql,
    ];

    /// Short lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Mysql => "mysql",
            Backend::Pgsql => "pgsql",
            Backend::Mssql => "mssql",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
            "mysql" | "mariadb" => Ok(Backend::Mysql),
            "pgsql" | "postgres" | "postgresql" => Ok(Backend::Pgsql),
            "mssql" | "sqlserver" => Ok(Backend::Mssql),
            _ => Err(Error::InvalidBackend),
        }
    }
}
