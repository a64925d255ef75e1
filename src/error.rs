//! Error types for the SQL Server configuration advisor.
//!
//! This module defines semantic error types with SQL Server error code mapping
//! so per-server failures can be recorded with a readable message.

use std::time::Duration;
use thiserror::Error;

/// Domain-specific errors for the advisor.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// A run precondition is not met (for example the server list is missing)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A diagnostic query against a reachable server failed
    #[error("Collection error: {message}")]
    Collection {
        message: String,
        sql_error_code: Option<i32>,
    },

    /// Connection or collection timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Report file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error classes used when deciding how a failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal, aborts the run before any server is processed.
    Precondition,
    /// A server is unreachable or rejected the login.
    Connectivity,
    /// A query against a reachable server failed.
    Collection,
    /// Anything else.
    Internal,
}

impl AdvisorError {
    /// Create a precondition error.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error with a source.
    pub fn connection_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authentication error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a collection error.
    pub fn collection(msg: impl Into<String>) -> Self {
        Self::Collection {
            message: msg.into(),
            sql_error_code: None,
        }
    }

    /// Create a collection error with the SQL Server error number.
    pub fn collection_with_code(msg: impl Into<String>, code: i32) -> Self {
        Self::Collection {
            message: msg.into(),
            sql_error_code: Some(code),
        }
    }

    /// Create a timeout error for a known time limit.
    pub fn timeout(limit: Duration) -> Self {
        let limit = if limit.subsec_millis() == 0 {
            format!("{} seconds", limit.as_secs())
        } else {
            format!("{} ms", limit.as_millis())
        };
        Self::Timeout(format!("operation exceeded {}", limit))
    }

    /// Create a timeout error reported by the driver, whose limit is not known here.
    pub fn driver_timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Precondition(_) | Self::Config(_) => ErrorKind::Precondition,
            Self::Connection { .. } | Self::Authentication(_) | Self::Timeout(_) => {
                ErrorKind::Connectivity
            }
            Self::Collection { .. } => ErrorKind::Collection,
            Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get a user-friendly suggestion for how to fix this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Precondition(_) => Some("Check that the server list file exists and is readable"),
            Self::Config(_) => Some("Check your environment variables and command line options"),
            Self::Connection { .. } => {
                Some("Check server hostname, port, and network connectivity")
            }
            Self::Authentication(_) => Some("Verify your username and password are correct"),
            Self::Collection { .. } => {
                Some("Ensure the login has VIEW SERVER STATE and VIEW ANY DEFINITION permissions")
            }
            Self::Timeout(_) => Some("Increase MSSQL_CONNECT_TIMEOUT or MSSQL_QUERY_TIMEOUT"),
            _ => None,
        }
    }
}

/// Map SQL Server error codes to semantic AdvisorError types.
pub fn from_sql_error(code: i32, message: &str) -> AdvisorError {
    match code {
        // Authentication errors
        18456 => AdvisorError::auth(format!("Login failed: {}", message)),

        // Timeout
        -2 => AdvisorError::driver_timeout(format!("Query timed out: {}", message)),

        // Connection errors
        -1 => AdvisorError::connection("Connection broken"),
        53 => AdvisorError::connection("Server not found or not accessible"),

        // Permission errors surface while collecting DMV data
        229 | 230 | 297 | 300 => {
            AdvisorError::collection_with_code(format!("Permission denied: {}", message), code)
        }

        // Invalid column/object, typically an older engine version
        207 => AdvisorError::collection_with_code(format!("Invalid column: {}", message), code),
        208 => AdvisorError::collection_with_code(format!("Invalid object: {}", message), code),

        // Default: generic collection error
        _ => AdvisorError::collection_with_code(message, code),
    }
}

impl From<mssql_client::Error> for AdvisorError {
    fn from(e: mssql_client::Error) -> Self {
        use mssql_client::Error;

        match &e {
            Error::Server {
                number, message, ..
            } => from_sql_error(*number, message),
            Error::Io(_) => AdvisorError::connection(format!("IO error: {}", e)),
            Error::Tls(_) => AdvisorError::connection(format!("TLS error: {}", e)),
            Error::Protocol(_) => AdvisorError::connection(format!("Protocol error: {}", e)),
            Error::Authentication(_) => AdvisorError::auth(e.to_string()),
            Error::Connection(_) => AdvisorError::connection(e.to_string()),
            Error::ConnectionClosed => AdvisorError::connection("Connection closed"),
            Error::ConnectTimeout | Error::ConnectionTimeout => {
                AdvisorError::driver_timeout("Connection attempt timed out")
            }
            Error::CommandTimeout => AdvisorError::driver_timeout("Query timed out"),
            Error::Type(_) => AdvisorError::collection(format!("Type conversion error: {}", e)),
            Error::Codec(_) => AdvisorError::collection(format!("Codec error: {}", e)),
            Error::Query(_) => AdvisorError::collection(e.to_string()),
            Error::Config(_) => AdvisorError::config(e.to_string()),
            Error::PoolExhausted => AdvisorError::connection("Connection pool exhausted"),
            Error::Cancelled => AdvisorError::collection("Query was cancelled"),
            _ => AdvisorError::internal(e.to_string()),
        }
    }
}

impl From<mssql_driver_pool::PoolError> for AdvisorError {
    fn from(e: mssql_driver_pool::PoolError) -> Self {
        AdvisorError::connection(format!("Pool error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_error_mapping() {
        let err = from_sql_error(18456, "Login failed for user 'audit'");
        assert!(matches!(err, AdvisorError::Authentication(_)));
        assert_eq!(err.kind(), ErrorKind::Connectivity);

        let err = from_sql_error(300, "VIEW SERVER STATE permission was denied");
        assert!(matches!(
            err,
            AdvisorError::Collection {
                sql_error_code: Some(300),
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Collection);

        let err = from_sql_error(53, "network path not found");
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AdvisorError::precondition("servers.txt not found").kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            AdvisorError::timeout(Duration::from_secs(30)).kind(),
            ErrorKind::Connectivity
        );
        assert_eq!(AdvisorError::internal("x").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_display() {
        let err = AdvisorError::connection("Failed to connect to db01:1433");
        assert_eq!(
            err.to_string(),
            "Connection error: Failed to connect to db01:1433"
        );
        assert_eq!(
            AdvisorError::timeout(Duration::from_secs(30)).to_string(),
            "Timeout: operation exceeded 30 seconds"
        );
        assert_eq!(
            AdvisorError::timeout(Duration::from_millis(50)).to_string(),
            "Timeout: operation exceeded 50 ms"
        );
    }

    #[test]
    fn test_driver_timeouts_do_not_claim_a_limit() {
        let err = from_sql_error(-2, "Execution Timeout Expired");
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert_eq!(err.to_string(), "Timeout: Query timed out: Execution Timeout Expired");

        let err = AdvisorError::from(mssql_client::Error::ConnectTimeout);
        assert_eq!(err.to_string(), "Timeout: Connection attempt timed out");
        assert!(!err.to_string().contains("seconds"));
    }

    #[test]
    fn test_error_suggestions() {
        assert!(AdvisorError::auth("Login failed").suggestion().is_some());
        assert!(AdvisorError::internal("unknown").suggestion().is_none());
    }
}
