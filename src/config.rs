//! Configuration management for the SQL Server configuration advisor.
//!
//! Configuration is loaded from environment variables following the 12-factor app pattern.
//! The binary layers command line overrides on top (see `main.rs`).

use crate::constants::{
    APPLICATION_NAME, CONNECTIONS_PER_SERVER, DEFAULT_CONCURRENCY, DEFAULT_CONNECTION_TIMEOUT,
    DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_OUTPUT_DIR, DEFAULT_PORT,
    DEFAULT_QUERY_TIMEOUT, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_SERVER_LIST,
};
use crate::error::AdvisorError;
use std::path::PathBuf;
use std::time::Duration;

/// Advisor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// How to reach each server in the list
    pub connection: ConnectionConfig,

    /// Run inputs and outputs
    pub run: RunConfig,
}

/// Connection settings shared by every server in the list.
///
/// The host is not part of this struct: it comes from the server list.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// SQL Server port used when the server list entry does not name one
    pub port: u16,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Enable TLS encryption
    pub encrypt: bool,

    /// Trust server certificate (for self-signed certs)
    pub trust_server_certificate: bool,

    /// Application name sent to SQL Server
    pub application_name: String,

    /// Connection pool configuration
    pub pool: PoolConfig,

    /// Upper bound on connecting to and collecting from a single server
    pub query_timeout: Duration,
}

/// Authentication configuration.
#[derive(Debug, Clone)]
pub enum AuthConfig {
    /// SQL Server authentication (username/password)
    SqlServer { username: String, password: String },

    /// Windows authentication (Integrated Security)
    Integrated,
}

/// Per-server connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections per server
    pub max_connections: u32,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Idle connection timeout
    pub idle_timeout: Duration,
}

/// Run inputs and outputs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Newline-delimited list of server host identifiers
    pub server_list: PathBuf,

    /// Directory the two report files are written to
    pub output_dir: PathBuf,

    /// Number of servers analyzed at once
    pub concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// ## Authentication
    /// - `MSSQL_AUTH_TYPE`: `sql` (default) or `integrated`
    /// - `MSSQL_USER`: SQL Server username (for SQL auth)
    /// - `MSSQL_PASSWORD`: SQL Server password (for SQL auth)
    ///
    /// ## Optional
    /// - `MSSQL_PORT`: Port number (default: 1433)
    /// - `MSSQL_ENCRYPT`: Enable TLS (default: true)
    /// - `MSSQL_TRUST_CERT`: Trust server certificate (default: false)
    /// - `MSSQL_CONNECT_TIMEOUT`: Connection timeout in seconds (default: 30)
    /// - `MSSQL_QUERY_TIMEOUT`: Per-server collection timeout in seconds (default: 60)
    /// - `ADVISOR_SERVER_LIST`: Server list file (default: servers.txt)
    /// - `ADVISOR_OUTPUT_DIR`: Report directory (default: current directory)
    /// - `ADVISOR_CONCURRENCY`: Servers analyzed at once (default: 1)
    ///
    /// Only authentication is checked here; call [`Config::validate`] once any
    /// command line overrides have been applied.
    pub fn from_env() -> Result<Self, AdvisorError> {
        let auth_type = std::env::var("MSSQL_AUTH_TYPE")
            .ok()
            .map(|s| s.to_lowercase());

        let auth = match auth_type.as_deref() {
            Some("integrated") | Some("windows") | Some("sspi") => AuthConfig::Integrated,
            _ => {
                // SQL Server Authentication (default)
                let username = std::env::var("MSSQL_USER").ok();
                let password = std::env::var("MSSQL_PASSWORD").ok();

                match (username, password) {
                    (Some(u), Some(p)) => AuthConfig::SqlServer {
                        username: u,
                        password: p,
                    },
                    (Some(_), None) => {
                        return Err(AdvisorError::config(
                            "MSSQL_PASSWORD is required when MSSQL_USER is set",
                        ))
                    }
                    (None, Some(_)) => {
                        return Err(AdvisorError::config(
                            "MSSQL_USER is required when MSSQL_PASSWORD is set",
                        ))
                    }
                    (None, None) => {
                        return Err(AdvisorError::config(
                            "Authentication required: set MSSQL_USER and MSSQL_PASSWORD, \
                             or use MSSQL_AUTH_TYPE=integrated",
                        ))
                    }
                }
            }
        };

        let port = std::env::var("MSSQL_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let encrypt = std::env::var("MSSQL_ENCRYPT")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(true);

        let trust_server_certificate = std::env::var("MSSQL_TRUST_CERT")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        let connection_timeout_secs = std::env::var("MSSQL_CONNECT_TIMEOUT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS);

        let query_timeout_secs = std::env::var("MSSQL_QUERY_TIMEOUT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS);

        let server_list = std::env::var("ADVISOR_SERVER_LIST")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SERVER_LIST));

        let output_dir = std::env::var("ADVISOR_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let concurrency = std::env::var("ADVISOR_CONCURRENCY")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_CONCURRENCY);

        Ok(Config {
            connection: ConnectionConfig {
                port,
                auth,
                encrypt,
                trust_server_certificate,
                application_name: APPLICATION_NAME.to_string(),
                pool: PoolConfig {
                    connection_timeout: Duration::from_secs(connection_timeout_secs),
                    ..PoolConfig::default()
                },
                query_timeout: Duration::from_secs(query_timeout_secs),
            },
            run: RunConfig {
                server_list,
                output_dir,
                concurrency,
            },
        })
    }

    /// Reject settings that would make the run meaningless.
    pub fn validate(&self) -> Result<(), AdvisorError> {
        if self.run.concurrency == 0 {
            return Err(AdvisorError::config("concurrency must be at least 1"));
        }
        if self.connection.query_timeout.is_zero() {
            return Err(AdvisorError::config("query timeout must be greater than zero"));
        }
        if let AuthConfig::SqlServer { username, .. } = &self.connection.auth {
            if username.trim().is_empty() {
                return Err(AdvisorError::config("MSSQL_USER must not be empty"));
            }
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: CONNECTIONS_PER_SERVER,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            server_list: PathBuf::from(DEFAULT_SERVER_LIST),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ConnectionConfig {
    /// Connection settings for SQL authentication with library defaults.
    pub fn sql_login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            port: DEFAULT_PORT,
            auth: AuthConfig::SqlServer {
                username: username.into(),
                password: password.into(),
            },
            encrypt: true,
            trust_server_certificate: false,
            application_name: APPLICATION_NAME.to_string(),
            pool: PoolConfig::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn test_config() -> Config {
        Config {
            connection: ConnectionConfig::sql_login("audit", "secret"),
            run: RunConfig::default(),
        }
    }

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_run_config_defaults() {
        let run = RunConfig::default();
        assert_eq!(run.server_list, PathBuf::from("servers.txt"));
        assert_eq!(run.concurrency, 1);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = test_config();
        assert!(config.validate().is_ok());

        config.run.concurrency = 0;
        assert!(matches!(config.validate(), Err(AdvisorError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_blank_user() {
        let mut config = test_config();
        config.connection.auth = AuthConfig::SqlServer {
            username: "  ".to_string(),
            password: "x".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_leaves_validation_to_caller() {
        std::env::remove_var("MSSQL_AUTH_TYPE");
        std::env::set_var("MSSQL_USER", "audit");
        std::env::set_var("MSSQL_PASSWORD", "secret");
        std::env::set_var("ADVISOR_CONCURRENCY", "0");

        let loaded = Config::from_env();

        std::env::remove_var("MSSQL_USER");
        std::env::remove_var("MSSQL_PASSWORD");
        std::env::remove_var("ADVISOR_CONCURRENCY");

        let mut config = loaded.expect("zero concurrency is not rejected while loading");
        assert_eq!(config.run.concurrency, 0);
        assert!(config.validate().is_err());

        config.run.concurrency = 4;
        assert!(config.validate().is_ok());
    }
}
