//! Connection pool management for SQL Server.
//!
//! Every analyzed server gets its own small pool; it lives as long as that
//! server's collection and is dropped afterwards.

use super::auth::create_config;
use crate::config::ConnectionConfig;
use crate::error::AdvisorError;
use crate::server_list::ServerTarget;
use mssql_driver_pool::{Pool, PoolBuilder};
use tracing::{debug, info};

/// Type alias for the connection pool.
pub type ConnectionPool = Pool;

/// Create a connection pool for one server and verify it with a first connection.
pub async fn create_pool(
    config: &ConnectionConfig,
    target: &ServerTarget,
) -> Result<ConnectionPool, AdvisorError> {
    debug!(
        "Creating connection pool for {} (max: {})",
        target.name, config.pool.max_connections
    );

    let client_config = create_config(config, target)?;

    let pool = PoolBuilder::new()
        .client_config(client_config)
        .min_connections(0)
        .max_connections(config.pool.max_connections)
        .idle_timeout(config.pool.idle_timeout)
        .connection_timeout(config.pool.connection_timeout)
        .build()
        .await
        .map_err(|e| {
            AdvisorError::connection_with_source(
                format!("Failed to create connection pool for {}", target.name),
                e,
            )
        })?;

    // Test the pool by getting a connection
    {
        let _conn = pool.get().await.map_err(|e| {
            AdvisorError::connection(format!(
                "Failed to establish connection to {}: {}",
                target.name, e
            ))
        })?;
        debug!("Initial connection test successful");
    }

    info!("Connected to {}", target.name);
    Ok(pool)
}

/// Get pool health status.
pub fn pool_status(pool: &ConnectionPool) -> PoolStatus {
    let status = pool.status();
    PoolStatus {
        in_use_connections: status.in_use as usize,
        max_connections: status.max as usize,
    }
}

/// Pool status information.
#[derive(Debug, Clone)]
pub struct PoolStatus {
    /// Number of connections currently in use.
    pub in_use_connections: usize,
    /// Maximum allowed connections.
    pub max_connections: usize,
}
