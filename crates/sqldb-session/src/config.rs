//! Connection and database configuration.
//!
//! [`BackendConfig`] describes where to connect and renders the
//! driver-specific DSN; [`DatabaseOptions`] holds the retry and timeout
//! policy of a [`Database`](crate::Database).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqldb_core::{Backend, ConfigError, Error, Result};

// ============================================================================
// Backend configuration
// ============================================================================

/// SQLite file database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path of the database file.
    pub database: String,
    /// Extra `&`-separated connection arguments.
    #[serde(default)]
    pub connect_args: String,
}

impl SqliteConfig {
    /// Configuration for the file at `database`.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            connect_args: String::new(),
        }
    }

    /// Set extra connection arguments.
    pub fn with_connect_args(mut self, args: impl Into<String>) -> Self {
        self.connect_args = args.into();
        self
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::Path.into());
        }
        Ok(())
    }

    /// `<path>?<args>`, enabling foreign keys and a busy timeout unless the
    /// arguments already set them.
    pub fn dsn(&self) -> Result<String> {
        self.validate()?;
        let mut args = base_args(&self.connect_args);
        push_default(&mut args, "_pragma=foreign_keys(", "_pragma=foreign_keys(1)");
        push_default(&mut args, "_pragma=busy_timeout(", "_pragma=busy_timeout(100)");
        Ok(format!("{}?{}", self.database.trim(), args.join("&")))
    }
}

/// Client/server database configuration, shared by MySQL, PostgreSQL and
/// SQL Server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Database name.
    pub database: String,
    /// Server host name or address.
    pub host: String,
    /// Server port; the backend default when unset.
    #[serde(default)]
    pub port: Option<u16>,
    /// Access username.
    #[serde(default)]
    pub username: String,
    /// Access password.
    #[serde(default)]
    pub password: String,
    /// Extra `&`-separated connection arguments.
    #[serde(default)]
    pub connect_args: String,
}

impl ServerConfig {
    /// Configuration for `database` on `host`, default port, no credentials.
    pub fn new(database: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            host: host.into(),
            port: None,
            username: String::new(),
            password: String::new(),
            connect_args: String::new(),
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set extra connection arguments.
    pub fn with_connect_args(mut self, args: impl Into<String>) -> Self {
        self.connect_args = args.into();
        self
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::Name.into());
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Host.into());
        }
        if self.port == Some(0) {
            return Err(ConfigError::Port.into());
        }
        Ok(())
    }

    fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }

    fn auth(&self, password: &str) -> String {
        match (self.username.as_str(), password) {
            ("", _) => String::new(),
            (user, "") => format!("{}@", user),
            (user, pass) => format!("{}:{}@", user, pass),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("connect_args", &self.connect_args)
            .finish()
    }
}

fn mask(password: &str) -> &'static str {
    if password.is_empty() { "" } else { "***" }
}

fn base_args(connect_args: &str) -> Vec<String> {
    let args = connect_args.trim();
    if args.is_empty() {
        Vec::new()
    } else {
        vec![args.to_string()]
    }
}

fn push_default(args: &mut Vec<String>, key: &str, default: &str) {
    if !args.iter().any(|a| a.contains(key)) {
        args.push(default.to_string());
    }
}

/// Connection target for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    /// SQLite file database.
    Sqlite(SqliteConfig),
    /// MySQL server.
    Mysql(ServerConfig),
    /// PostgreSQL server.
    Pgsql(ServerConfig),
    /// SQL Server.
    Mssql(ServerConfig),
}

impl BackendConfig {
    /// Default MySQL port.
    pub const MYSQL_PORT: u16 = 3306;
    /// Default PostgreSQL port.
    pub const PGSQL_PORT: u16 = 5432;
    /// Default SQL Server port.
    pub const MSSQL_PORT: u16 = 1433;

    /// The backend this configuration targets.
    pub fn backend(&self) -> Backend {
        match self {
            BackendConfig::Sqlite(_) => Backend::Sqlite,
            BackendConfig::Mysql(_) => Backend::Mysql,
            BackendConfig::Pgsql(_) => Backend::Pgsql,
            BackendConfig::Mssql(_) => Backend::Mssql,
        }
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        match self {
            BackendConfig::Sqlite(c) => c.validate(),
            BackendConfig::Mysql(c) | BackendConfig::Pgsql(c) | BackendConfig::Mssql(c) => {
                c.validate()
            }
        }
    }

    /// Driver-specific data source name.
    pub fn dsn(&self) -> Result<String> {
        self.render_dsn(false)
    }

    fn render_dsn(&self, masked: bool) -> Result<String> {
        self.validate()?;
        let password = |c: &ServerConfig| {
            if masked {
                mask(&c.password).to_string()
            } else {
                c.password.clone()
            }
        };
        let dsn = match self {
            BackendConfig::Sqlite(c) => c.dsn()?,
            BackendConfig::Mysql(c) => {
                let mut args = base_args(&c.connect_args);
                push_default(&mut args, "charset=", "charset=utf8mb4");
                push_default(&mut args, "collation=", "collation=utf8mb4_unicode_ci");
                push_default(&mut args, "multiStatements=", "multiStatements=true");
                push_default(&mut args, "interpolateParams=", "interpolateParams=true");
                format!(
                    "{}tcp({}:{})/{}?{}",
                    c.auth(&password(c)),
                    c.host.trim(),
                    c.port_or(Self::MYSQL_PORT),
                    c.database.trim(),
                    args.join("&")
                )
            }
            BackendConfig::Pgsql(c) => {
                let mut args = base_args(&c.connect_args);
                push_default(&mut args, "sslmode=", "sslmode=disable");
                format!(
                    "postgres://{}{}:{}/{}?{}",
                    c.auth(&password(c)),
                    c.host.trim(),
                    c.port_or(Self::PGSQL_PORT),
                    c.database.trim(),
                    args.join("&")
                )
            }
            BackendConfig::Mssql(c) => {
                let mut args = vec![format!("database={}", c.database.trim())];
                args.extend(base_args(&c.connect_args));
                format!(
                    "sqlserver://{}{}:{}?{}",
                    c.auth(&password(c)),
                    c.host.trim(),
                    c.port_or(Self::MSSQL_PORT),
                    args.join("&")
                )
            }
        };
        Ok(dsn)
    }
}

impl fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render_dsn(true) {
            Ok(dsn) => write!(f, "{}:{}", self.backend(), dsn),
            Err(e) => write!(f, "{}:<{}>", self.backend(), e),
        }
    }
}

// ============================================================================
// Database options
// ============================================================================

/// Retry and timeout policy, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Deadline for one operation including retries; `<= 0` disables it.
    pub operation_timeout: f64,
    /// Pause between retries of a transient failure; `<= 0` keeps the
    /// default.
    pub retry_interval: f64,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            operation_timeout: Self::DEFAULT_OPERATION_TIMEOUT,
            retry_interval: Self::DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl DatabaseOptions {
    /// Default operation timeout.
    pub const DEFAULT_OPERATION_TIMEOUT: f64 = 5.0;
    /// Default retry interval.
    pub const DEFAULT_RETRY_INTERVAL: f64 = 0.1;

    /// Set the operation timeout in seconds.
    pub fn with_operation_timeout(mut self, seconds: f64) -> Self {
        self.operation_timeout = seconds;
        self
    }

    /// Set the retry interval in seconds.
    pub fn with_retry_interval(mut self, seconds: f64) -> Self {
        self.retry_interval = seconds;
        self
    }

    /// The operation deadline span, `None` when disabled.
    pub fn operation_timeout(&self) -> Option<Duration> {
        if self.operation_timeout > 0.0 {
            Duration::try_from_secs_f64(self.operation_timeout).ok()
        } else {
            None
        }
    }

    /// The effective retry interval.
    pub fn retry_interval(&self) -> Duration {
        let fallback = Duration::from_millis(100);
        if self.retry_interval > 0.0 {
            Duration::try_from_secs_f64(self.retry_interval).unwrap_or(fallback)
        } else {
            fallback
        }
    }

    /// Parse from a loosely typed options document.
    ///
    /// Keys are optional; numbers may be given as JSON numbers or numeric
    /// strings. `null` is the same as an absent key.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let obj = match value {
            serde_json::Value::Null => return Ok(Self::default()),
            serde_json::Value::Object(obj) => obj,
            _ => {
                return Err(ConfigError::Invalid("options must be an object".into()).into());
            }
        };

        let mut opts = Self::default();
        if let Some(v) = seconds(obj.get("operation_timeout"), "operation_timeout")? {
            opts.operation_timeout = if v > 0.0 { v } else { -1.0 };
        }
        if let Some(v) = seconds(obj.get("retry_interval"), "retry_interval")? {
            if v > 0.0 {
                opts.retry_interval = v;
            }
        }
        Ok(opts)
    }
}

fn seconds(value: Option<&serde_json::Value>, key: &str) -> Result<Option<f64>> {
    let invalid = || -> Error { ConfigError::Invalid(format!("{} must be a number", key)).into() };
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n.as_f64().map(Some).ok_or_else(invalid),
        Some(serde_json::Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}
