//! Error types for the multi-database MCP server.
//!
//! All runtime errors surface directly to the caller. Only backend
//! construction failures are absorbed, and only while the registry is built.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Database '{database}' not found. Available: {}", available.join(", "))]
    DatabaseNotFound {
        database: String,
        available: Vec<String>,
    },

    #[error("Failed to configure database '{name}': {message}")]
    Construction { name: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Passed through from the backend untouched.
    #[error(transparent)]
    Execution(#[from] sqlx::Error),

    #[error(transparent)]
    Mssql(#[from] tiberius::error::Error),

    #[cfg(feature = "oracle")]
    #[error(transparent)]
    Oracle(#[from] oracle::Error),

    #[error("Introspection error: {message}")]
    Introspection { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a database not found error listing the registered names.
    pub fn database_not_found(database: impl Into<String>, available: Vec<String>) -> Self {
        Self::DatabaseNotFound {
            database: database.into(),
            available,
        }
    }

    /// Create a backend construction error.
    pub fn construction(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an introspection error.
    pub fn introspection(message: impl Into<String>) -> Self {
        Self::Introspection {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// SQLSTATE reported by the backend, if any.
    pub fn sql_state(&self) -> Option<String> {
        match self {
            Self::Execution(sqlx::Error::Database(db_err)) => db_err.code().map(|c| c.to_string()),
            _ => None,
        }
    }

    /// Vendor error number (SQL Server message number, Oracle ORA code).
    pub fn vendor_code(&self) -> Option<i64> {
        match self {
            Self::Mssql(tiberius::error::Error::Server(token)) => Some(token.code() as i64),
            #[cfg(feature = "oracle")]
            Self::Oracle(e) => e.db_error().map(|db| db.code() as i64),
            _ => None,
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Convert DbError to MCP ErrorData for semantic error categorization.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::InvalidInput { .. } => rmcp::ErrorData::invalid_params(err.to_string(), None),

            DbError::DatabaseNotFound { available, .. } => rmcp::ErrorData::resource_not_found(
                err.to_string(),
                Some(serde_json::json!({ "available": available })),
            ),

            DbError::Execution(_) => {
                let data = err
                    .sql_state()
                    .map(|code| serde_json::json!({ "sql_state": code }));
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }

            #[cfg(feature = "oracle")]
            DbError::Oracle(_) => {
                let data = err
                    .vendor_code()
                    .map(|code| serde_json::json!({ "vendor_code": code }));
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }

            DbError::Mssql(_) => {
                let data = err
                    .vendor_code()
                    .map(|code| serde_json::json!({ "vendor_code": code }));
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }

            DbError::Construction { .. }
            | DbError::Configuration { .. }
            | DbError::Introspection { .. }
            | DbError::Internal { .. } => rmcp::ErrorData::internal_error(err.to_string(), None),
        }
    }
}
