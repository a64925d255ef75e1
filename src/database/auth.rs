//! Client configuration and authentication for SQL Server connections.
//!
//! Builds an ADO.NET-style connection string for one server list entry and
//! hands it to the driver. Supports:
//! - SQL Server authentication (username/password)
//! - Windows integrated authentication (SSPI/Kerberos)

use crate::config::{AuthConfig, ConnectionConfig};
use crate::error::AdvisorError;
use crate::server_list::ServerTarget;
use mssql_client::Config;
use tracing::debug;

/// Create a driver `Config` for a single target server.
pub fn create_config(
    config: &ConnectionConfig,
    target: &ServerTarget,
) -> Result<Config, AdvisorError> {
    let connection_string = connection_string(config, target);
    debug!(
        "Connecting to {} as {}",
        data_source(config, target),
        login_description(&config.auth)
    );

    Config::from_connection_string(&connection_string).map_err(|e| {
        AdvisorError::config(format!(
            "Invalid connection settings for {}: {}",
            target.name, e
        ))
    })
}

/// The `Server=` part: `tcp:host[\instance][,port]`.
///
/// A named instance without an explicit port is resolved through the
/// SQL Server Browser service, so no port is added in that case.
pub fn data_source(config: &ConnectionConfig, target: &ServerTarget) -> String {
    let mut source = format!("tcp:{}", target.host);
    if let Some(instance) = &target.instance {
        source.push('\\');
        source.push_str(instance);
    }
    match (target.port, &target.instance) {
        (Some(port), _) => source.push_str(&format!(",{}", port)),
        (None, None) => source.push_str(&format!(",{}", config.port)),
        (None, Some(_)) => {}
    }
    source
}

/// Full connection string for a target server.
pub fn connection_string(config: &ConnectionConfig, target: &ServerTarget) -> String {
    let mut parts = vec![
        format!("Server={}", data_source(config, target)),
        "Database=master".to_string(),
    ];

    match &config.auth {
        AuthConfig::SqlServer { username, password } => {
            parts.push(format!("User Id={}", quote_value(username)));
            parts.push(format!("Password={}", quote_value(password)));
        }
        AuthConfig::Integrated => parts.push("Integrated Security=true".to_string()),
    }

    parts.push(format!("Encrypt={}", config.encrypt));
    parts.push(format!(
        "TrustServerCertificate={}",
        config.trust_server_certificate
    ));
    parts.push(format!(
        "Application Name={}",
        quote_value(&config.application_name)
    ));
    parts.push(format!(
        "Connect Timeout={}",
        config.pool.connection_timeout.as_secs()
    ));

    parts.join(";")
}

/// Quote a connection string value if it contains separators or quotes.
fn quote_value(value: &str) -> String {
    if value.contains(';') || value.contains('"') || value.contains('=') || value.trim() != value
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn login_description(auth: &AuthConfig) -> String {
    match auth {
        AuthConfig::SqlServer { username, .. } => format!("SQL login '{}'", username),
        AuthConfig::Integrated => "integrated security".to_string(),
    }
}
