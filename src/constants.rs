//! Centralized constants for the SQL Server configuration advisor.
//!
//! Rule thresholds and default values live here so the policy a run applies
//! can be read in one place.

use std::time::Duration;

// =============================================================================
// Timeout Constants
// =============================================================================

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Default per-server collection timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

/// Default connection timeout as Duration.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration =
    Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS);

/// Default per-server collection timeout as Duration.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS);

// =============================================================================
// Connection Constants
// =============================================================================

/// Default SQL Server port.
pub const DEFAULT_PORT: u16 = 1433;

/// Application name reported to SQL Server.
pub const APPLICATION_NAME: &str = "mssql-config-advisor";

/// Each analyzed server gets a private pool with exactly one connection.
pub const CONNECTIONS_PER_SERVER: u32 = 1;

/// Idle timeout for per-server pools in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Run Constants
// =============================================================================

/// Default server list file.
pub const DEFAULT_SERVER_LIST: &str = "servers.txt";

/// Default report output directory.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Default number of servers analyzed at once.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Upper bound for rows read from the file inventory of a single server.
pub const MAX_FILE_INVENTORY_ROWS: usize = 100_000;

// =============================================================================
// Report Constants
// =============================================================================

/// Header row of the recommendations table.
pub const RECOMMENDATIONS_HEADER: &str =
    "Server Name,Setting,Current Value,Recommended Value,Recommendation";

/// File name prefix of the recommendations table.
pub const RECOMMENDATIONS_FILE_PREFIX: &str = "SQLServerRecommendations";

/// File name prefix of the detailed analysis narrative.
pub const DETAILED_FILE_PREFIX: &str = "SQLServerDetailedAnalysis";

/// Timestamp format embedded in report file names.
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Separator between aggregated fragments of a combined recommendation.
pub const FRAGMENT_SEPARATOR: &str = " | ";

// =============================================================================
// Rule Thresholds
// =============================================================================

/// MAXDOP cap on a single NUMA node.
pub const MAXDOP_SINGLE_NODE_CAP: u32 = 8;

/// MAXDOP cap on multi-node hosts.
pub const MAXDOP_MULTI_NODE_CAP: u32 = 16;

/// Minimum acceptable cost threshold for parallelism.
pub const MIN_COST_THRESHOLD: i32 = 25;

/// Upper bound on the recommended number of tempdb data files.
pub const TEMPDB_MAX_FILES: u32 = 8;

/// Memory (GB) reserved for the operating system by the max server memory rule.
pub const OS_RESERVED_MEMORY_GB: f64 = 4.0;

/// Share of physical memory the engine may take by the max server memory rule.
pub const MAX_SERVER_MEMORY_RATIO: f64 = 0.9;

/// `max server memory (MB)` value meaning "not configured".
pub const UNBOUNDED_MEMORY_MB: i64 = 2_147_483_647;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_durations() {
        assert_eq!(DEFAULT_CONNECTION_TIMEOUT, Duration::from_secs(30));
        assert_eq!(DEFAULT_QUERY_TIMEOUT, Duration::from_secs(60));
    }

    #[test]
    fn test_header_column_order() {
        let columns: Vec<&str> = RECOMMENDATIONS_HEADER.split(',').collect();
        assert_eq!(
            columns,
            vec![
                "Server Name",
                "Setting",
                "Current Value",
                "Recommended Value",
                "Recommendation"
            ]
        );
    }

    #[test]
    fn test_unbounded_sentinel_is_i32_max() {
        assert_eq!(UNBOUNDED_MEMORY_MB, i32::MAX as i64);
    }
}
