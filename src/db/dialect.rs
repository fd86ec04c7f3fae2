//! SQL dialect detection.

use schemars::JsonSchema;
use serde::Serialize;

/// SQL variant a backend speaks, derived from its connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Oracle,
    H2,
    PostgreSql,
    /// Includes MariaDB
    MySql,
    SqlServer,
    Unknown,
}

impl Dialect {
    /// Detect the dialect of a connection URL.
    ///
    /// Checks run in a fixed order (oracle, h2, postgresql, mysql/mariadb,
    /// sqlserver) against the lower-cased URL and accept both JDBC-style
    /// (`jdbc:postgresql://...`) and native (`postgres://...`) forms.
    ///
    /// ```
    /// use multi_db_mcp::db::Dialect;
    ///
    /// assert_eq!(Dialect::detect("jdbc:oracle:thin:@host:1521/XE"), Dialect::Oracle);
    /// assert_eq!(Dialect::detect("postgres://localhost/app"), Dialect::PostgreSql);
    /// assert_eq!(Dialect::detect(""), Dialect::Unknown);
    /// ```
    pub fn detect(url: &str) -> Self {
        let lower = url.trim().to_lowercase();
        let mentions = |token: &str| {
            lower.contains(&format!(":{token}:")) || lower.starts_with(&format!("{token}:"))
        };

        if mentions("oracle") {
            Self::Oracle
        } else if mentions("h2") {
            Self::H2
        } else if mentions("postgresql") || mentions("postgres") {
            Self::PostgreSql
        } else if mentions("mysql") || mentions("mariadb") {
            Self::MySql
        } else if mentions("sqlserver") || mentions("mssql") {
            Self::SqlServer
        } else {
            Self::Unknown
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::PostgreSql => format!("${index}"),
            Self::Oracle => format!(":{index}"),
            Self::SqlServer => format!("@P{index}"),
            Self::H2 | Self::MySql | Self::Unknown => "?".to_string(),
        }
    }

    /// Lower-case tag used in logs and tool output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::H2 => "h2",
            Self::PostgreSql => "postgresql",
            Self::MySql => "mysql",
            Self::SqlServer => "sqlserver",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
