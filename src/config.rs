//! Configuration handling for the multi-database MCP server.
//!
//! Server flags come from the command line or environment. Named backends are
//! described entirely by `MCP_DB_<NAME>_*` environment variables.

use clap::{Parser, ValueEnum};
use std::time::Duration;
use url::Url;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";

/// Logical name of the host-supplied backend.
pub const DEFAULT_DATABASE_NAME: &str = "default";

/// Prefix shared by every per-backend environment variable.
pub const BACKEND_ENV_PREFIX: &str = "MCP_DB_";

// Pool sizing for named backends
pub const NAMED_MAX_CONNECTIONS: u32 = 3;
pub const NAMED_MIN_CONNECTIONS: u32 = 1;
pub const NAMED_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Pool sizing for the host default backend
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Connection pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSizing {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolSizing {
    /// Fixed sizing applied to every backend listed in `MCP_DB_NAMES`.
    pub const fn named() -> Self {
        Self {
            max_connections: NAMED_MAX_CONNECTIONS,
            min_connections: NAMED_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(NAMED_ACQUIRE_TIMEOUT_SECS),
        }
    }

    /// Sizing for the backend described by `DATABASE_URL`.
    pub const fn host_default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

/// Everything needed to build one backend's connection pool.
#[derive(Clone)]
pub struct BackendSettings {
    /// Logical name the caller uses to address this backend.
    pub name: String,
    /// Connection URL as configured (sensitive - log via `masked_url`).
    pub url: String,
    /// Explicit driver selection, overriding the URL scheme.
    pub driver: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pool: PoolSizing,
}

impl BackendSettings {
    /// Settings for the host default backend.
    pub fn host_default(url: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_DATABASE_NAME.to_string(),
            url: url.into(),
            driver: None,
            username: None,
            password: None,
            pool: PoolSizing::host_default(),
        }
    }

    /// Name of the environment variable holding `suffix` for backend `name`.
    ///
    /// ```
    /// use multi_db_mcp::config::BackendSettings;
    ///
    /// assert_eq!(BackendSettings::env_key("sales", "URL"), "MCP_DB_SALES_URL");
    /// ```
    pub fn env_key(name: &str, suffix: &str) -> String {
        format!("{}{}_{}", BACKEND_ENV_PREFIX, name.to_uppercase(), suffix)
    }

    /// Read the settings for `name` through `lookup`.
    ///
    /// Returns `None` when the URL variable is unset or blank. A blank driver
    /// counts as unset; user and password pass through as given.
    pub fn from_env<F>(name: &str, lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(&Self::env_key(name, "URL")).filter(|u| !u.trim().is_empty())?;
        let driver = lookup(&Self::env_key(name, "DRIVER")).filter(|d| !d.trim().is_empty());

        Some(Self {
            name: name.to_string(),
            url: url.trim().to_string(),
            driver,
            username: lookup(&Self::env_key(name, "USER")),
            password: lookup(&Self::env_key(name, "PASSWORD")),
            pool: PoolSizing::named(),
        })
    }

    /// Pool label used in logs.
    pub fn pool_name(&self) -> String {
        format!("pool-{}", self.name)
    }

    /// URL with any embedded password replaced by `****`.
    pub fn masked_url(&self) -> String {
        mask_password(&self.url)
    }
}

impl std::fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSettings")
            .field("name", &self.name)
            .field("url", &self.masked_url())
            .field("driver", &self.driver)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("pool", &self.pool)
            .finish()
    }
}

/// Replace the password component of a URL, leaving other text untouched.
pub fn mask_password(raw: &str) -> String {
    let stripped = raw.strip_prefix("jdbc:").unwrap_or(raw);
    match Url::parse(stripped) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("****")).is_err() {
                return raw.to_string();
            }
            let masked = url.to_string();
            if stripped.len() == raw.len() {
                masked
            } else {
                format!("jdbc:{masked}")
            }
        }
        _ => raw.to_string(),
    }
}

/// Split a comma-separated list of logical names, dropping blanks.
pub fn parse_db_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Configuration for the multi-database MCP server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "multi-db-mcp-server",
    about = "MCP server exposing read-only SQL tools over several named database backends",
    version,
    author
)]
pub struct Config {
    /// Comma-separated logical database names.
    /// Each name NAME is configured via MCP_DB_<NAME>_URL, _DRIVER, _USER and _PASSWORD.
    #[arg(long = "db-names", value_name = "NAMES", env = "MCP_DB_NAMES")]
    pub db_names: Option<String>,

    /// URL of the default backend, used when no named backend is available
    #[arg(long = "database-url", value_name = "URL", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value_t = TransportMode::Stdio,
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            db_names: None,
            database_url: None,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Logical names configured via `--db-names` / `MCP_DB_NAMES`.
    pub fn database_names(&self) -> Vec<String> {
        self.db_names
            .as_deref()
            .map(parse_db_names)
            .unwrap_or_default()
    }

    /// Settings for the default backend, if a URL was supplied.
    pub fn default_backend(&self) -> Option<BackendSettings> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(BackendSettings::host_default)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
