//! Fact collection.
//!
//! The runner only sees the [`FactSource`] and [`FactSession`] traits; the
//! SQL Server implementation below runs two fixed diagnostic queries per
//! server and maps their rows into [`ServerFacts`] and [`DatabaseFile`]s.

use super::connection::{create_pool, pool_status};
use super::query::{QueryExecutor, ResultRow};
use crate::config::ConnectionConfig;
use crate::constants::MAX_FILE_INVENTORY_ROWS;
use crate::error::AdvisorError;
use crate::facts::{DatabaseFile, FileType, MaxSize, MemoryModel, ServerFacts};
use crate::server_list::ServerTarget;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Something that can open a collection session against a server.
pub trait FactSource: Send + Sync {
    type Session: FactSession;

    /// Connect to a server. Errors here are connectivity failures.
    fn connect(
        &self,
        target: &ServerTarget,
    ) -> impl Future<Output = Result<Self::Session, AdvisorError>> + Send;
}

/// An open connection to one server.
pub trait FactSession: Send {
    /// Run the consolidated engine/host facts query.
    fn server_facts(
        &self,
        server_name: &str,
    ) -> impl Future<Output = Result<ServerFacts, AdvisorError>> + Send;

    /// Run the per-database file inventory query.
    fn database_files(
        &self,
    ) -> impl Future<Output = Result<Vec<DatabaseFile>, AdvisorError>> + Send;
}

/// Consolidated host and engine facts, one row.
const SERVER_FACTS_QUERY: &str = r#"
    SELECT
        CAST(SERVERPROPERTY('ProductVersion') AS NVARCHAR(128)) AS product_version,
        CAST(SERVERPROPERTY('Edition') AS NVARCHAR(128)) AS edition,
        si.cpu_count AS cpu_count,
        (SELECT COUNT(*) FROM sys.dm_os_nodes
            WHERE node_state_desc <> 'ONLINE DAC') AS numa_node_count,
        si.hyperthread_ratio AS hyperthread_ratio,
        si.socket_count AS socket_count,
        CAST(si.softnuma_configuration_desc AS NVARCHAR(60)) AS soft_numa_description,
        CAST(si.sql_memory_model_desc AS NVARCHAR(60)) AS memory_model,
        CAST(sm.total_physical_memory_kb / 1048576.0 AS FLOAT) AS total_memory_gb,
        CAST(si.committed_kb / 1048576.0 AS FLOAT) AS committed_memory_gb,
        (SELECT CAST(value_in_use AS INT) FROM sys.configurations
            WHERE name = 'max degree of parallelism') AS current_max_dop,
        (SELECT CAST(value_in_use AS INT) FROM sys.configurations
            WHERE name = 'cost threshold for parallelism') AS cost_threshold,
        (SELECT CAST(value_in_use AS BIGINT) FROM sys.configurations
            WHERE name = 'min server memory (MB)') AS min_server_memory_mb,
        (SELECT CAST(value_in_use AS BIGINT) FROM sys.configurations
            WHERE name = 'max server memory (MB)') AS max_server_memory_mb,
        (SELECT CAST(value_in_use AS INT) FROM sys.configurations
            WHERE name = 'backup compression default') AS backup_compression,
        (SELECT TOP 1 CASE instant_file_initialization_enabled WHEN 'Y' THEN 1 ELSE 0 END
            FROM sys.dm_server_services
            WHERE servicename LIKE 'SQL Server (%') AS instant_file_initialization,
        (SELECT COUNT(*) FROM tempdb.sys.database_files
            WHERE type_desc = 'ROWS') AS tempdb_file_count,
        (SELECT COUNT(DISTINCT size) FROM tempdb.sys.database_files
            WHERE type_desc = 'ROWS') AS tempdb_distinct_sizes,
        (SELECT COUNT(*) FROM tempdb.sys.database_files
            WHERE is_percent_growth = 1) AS tempdb_percent_growth_files
    FROM sys.dm_os_sys_info AS si
    CROSS JOIN sys.dm_os_sys_memory AS sm
"#;

/// Every file of every database on the instance.
const DATABASE_FILES_QUERY: &str = r#"
    SELECT
        d.name AS database_name,
        mf.name AS logical_file_name,
        mf.type_desc AS file_type,
        CAST(mf.size * 8.0 / 1024 AS FLOAT) AS current_size_mb,
        CAST(mf.is_percent_growth AS INT) AS is_percent_growth,
        CAST(CASE WHEN mf.is_percent_growth = 1 THEN mf.growth
                  ELSE mf.growth * 8.0 / 1024 END AS FLOAT) AS growth_value,
        CAST(mf.max_size AS BIGINT) AS max_size_pages
    FROM sys.master_files AS mf
    INNER JOIN sys.databases AS d ON d.database_id = mf.database_id
    ORDER BY d.name, mf.file_id
"#;

/// Map the facts query row. Missing or NULL columns stay unknown.
pub fn facts_from_row(server_name: &str, row: &ResultRow) -> ServerFacts {
    ServerFacts {
        server_name: server_name.to_string(),
        product_version: row.string("product_version"),
        edition: row.string("edition"),
        cpu_count: row.u32("cpu_count").filter(|c| *c > 0),
        numa_node_count: row.u32("numa_node_count").filter(|n| *n > 0),
        hyperthread_ratio: row.u32("hyperthread_ratio"),
        socket_count: row.u32("socket_count"),
        soft_numa_description: row.string("soft_numa_description"),
        memory_model: row
            .string("memory_model")
            .map(|desc| MemoryModel::from_desc(&desc)),
        total_memory_gb: row.f64("total_memory_gb").filter(|gb| *gb >= 0.0),
        committed_memory_gb: row.f64("committed_memory_gb").filter(|gb| *gb >= 0.0),
        current_max_dop: row.u32("current_max_dop"),
        cost_threshold_for_parallelism: row.i32("cost_threshold"),
        min_server_memory_mb: row.i64("min_server_memory_mb"),
        max_server_memory_mb: row.i64("max_server_memory_mb"),
        backup_compression_enabled: row.bool("backup_compression"),
        instant_file_initialization_enabled: row.bool("instant_file_initialization"),
        temp_storage_file_count: row.u32("tempdb_file_count"),
        temp_storage_distinct_size_count: row.u32("tempdb_distinct_sizes"),
        temp_storage_percent_growth_file_count: row.u32("tempdb_percent_growth_files"),
    }
}

/// Map one file inventory row; rows without a database or file name are dropped.
/// Other missing or NULL columns stay unknown.
pub fn file_from_row(row: &ResultRow) -> Option<DatabaseFile> {
    let database_name = row.string("database_name")?;
    let logical_file_name = row.string("logical_file_name")?;

    Some(DatabaseFile {
        database_name,
        logical_file_name,
        file_type: row.string("file_type").map(|desc| FileType::from_desc(&desc)),
        current_size_mb: row.f64("current_size_mb"),
        is_percent_growth: row.bool("is_percent_growth"),
        growth_value: row.f64("growth_value"),
        max_size: row.i64("max_size_pages").map(MaxSize::from_pages),
    })
}

/// Fact source backed by live SQL Server connections.
pub struct MssqlFactSource {
    config: Arc<ConnectionConfig>,
}

impl MssqlFactSource {
    pub fn new(config: Arc<ConnectionConfig>) -> Self {
        Self { config }
    }
}

impl FactSource for MssqlFactSource {
    type Session = MssqlSession;

    async fn connect(&self, target: &ServerTarget) -> Result<MssqlSession, AdvisorError> {
        let pool = create_pool(&self.config, target).await?;
        Ok(MssqlSession {
            server: target.name.clone(),
            executor: QueryExecutor::new(pool, MAX_FILE_INVENTORY_ROWS),
        })
    }
}

/// A live session against one server.
pub struct MssqlSession {
    server: String,
    executor: QueryExecutor,
}

impl FactSession for MssqlSession {
    async fn server_facts(&self, server_name: &str) -> Result<ServerFacts, AdvisorError> {
        let result = self.executor.execute(SERVER_FACTS_QUERY).await?;
        let row = result
            .rows
            .first()
            .ok_or_else(|| AdvisorError::collection("Server facts query returned no rows"))?;

        debug!(
            "Collected server facts from {} in {} ms",
            self.server, result.execution_time_ms
        );
        Ok(facts_from_row(server_name, row))
    }

    async fn database_files(&self) -> Result<Vec<DatabaseFile>, AdvisorError> {
        let result = self.executor.execute(DATABASE_FILES_QUERY).await?;
        if result.truncated {
            warn!(
                "File inventory for {} truncated at {} rows",
                self.server, MAX_FILE_INVENTORY_ROWS
            );
        }

        let files: Vec<DatabaseFile> = result.rows.iter().filter_map(file_from_row).collect();
        let status = pool_status(self.executor.pool());
        debug!(
            "Collected {} database file(s) from {} ({} of {} connection(s) in use)",
            files.len(),
            self.server,
            status.in_use_connections,
            status.max_connections
        );
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::types::SqlValue;

    fn facts_row() -> ResultRow {
        let mut row = ResultRow::new();
        row.insert("product_version", SqlValue::String("16.0.4135.4".to_string()));
        row.insert("cpu_count", SqlValue::I32(16));
        row.insert("numa_node_count", SqlValue::I32(1));
        row.insert("hyperthread_ratio", SqlValue::I32(2));
        row.insert("socket_count", SqlValue::I32(1));
        row.insert("memory_model", SqlValue::String("CONVENTIONAL".to_string()));
        row.insert("total_memory_gb", SqlValue::F64(63.9));
        row.insert("current_max_dop", SqlValue::I32(0));
        row.insert("cost_threshold", SqlValue::I32(5));
        row.insert("max_server_memory_mb", SqlValue::I64(2_147_483_647));
        row.insert("backup_compression", SqlValue::I32(0));
        row.insert("instant_file_initialization", SqlValue::I32(1));
        row.insert("tempdb_file_count", SqlValue::I32(1));
        row.insert("tempdb_distinct_sizes", SqlValue::I32(1));
        row.insert("tempdb_percent_growth_files", SqlValue::I32(0));
        row.insert("edition", SqlValue::Null);
        row
    }

    #[test]
    fn test_facts_from_row() {
        let facts = facts_from_row("db01", &facts_row());
        assert_eq!(facts.server_name, "db01");
        assert_eq!(facts.cpu_count, Some(16));
        assert_eq!(facts.memory_model, Some(MemoryModel::Conventional));
        assert_eq!(facts.current_max_dop, Some(0));
        assert_eq!(facts.max_server_memory_unbounded(), Some(true));
        assert_eq!(facts.backup_compression_enabled, Some(false));
        assert_eq!(facts.instant_file_initialization_enabled, Some(true));
        assert_eq!(facts.edition, None);
        // Not present in the row at all
        assert_eq!(facts.committed_memory_gb, None);
        assert_eq!(facts.soft_numa_description, None);
    }

    #[test]
    fn test_zero_cpu_or_node_counts_are_unknown() {
        let mut row = facts_row();
        row.insert("cpu_count", SqlValue::I32(0));
        row.insert("numa_node_count", SqlValue::I32(0));
        let facts = facts_from_row("db01", &row);
        assert_eq!(facts.cpu_count, None);
        assert_eq!(facts.numa_node_count, None);
    }

    #[test]
    fn test_file_from_row() {
        let mut row = ResultRow::new();
        row.insert("database_name", SqlValue::String("Sales".to_string()));
        row.insert("logical_file_name", SqlValue::String("Sales_log".to_string()));
        row.insert("file_type", SqlValue::String("LOG".to_string()));
        row.insert("current_size_mb", SqlValue::F64(512.0));
        row.insert("is_percent_growth", SqlValue::I32(1));
        row.insert("growth_value", SqlValue::F64(10.0));
        row.insert("max_size_pages", SqlValue::I64(-1));

        let file = file_from_row(&row).expect("file");
        assert_eq!(file.file_type, Some(FileType::Log));
        assert_eq!(file.is_percent_growth, Some(true));
        assert_eq!(file.growth_value, Some(10.0));
        assert_eq!(file.max_size, Some(MaxSize::Unlimited));
    }

    #[test]
    fn test_null_file_columns_stay_unknown() {
        let mut row = ResultRow::new();
        row.insert("database_name", SqlValue::String("Sales".to_string()));
        row.insert("logical_file_name", SqlValue::String("Sales_data".to_string()));
        row.insert("file_type", SqlValue::String("ROWS".to_string()));
        row.insert("growth_value", SqlValue::Null);
        row.insert("is_percent_growth", SqlValue::Null);

        let file = file_from_row(&row).expect("file");
        assert_eq!(file.growth_value, None);
        assert_eq!(file.is_percent_growth, None);
        assert_eq!(file.current_size_mb, None);
        assert_eq!(file.max_size, None);

        let recs = crate::engine::evaluate(&ServerFacts::unknown("db01"), &[file]);
        assert!(recs.is_empty(), "unknown growth produced {:?}", recs);
    }

    #[test]
    fn test_file_row_without_name_is_dropped() {
        let mut row = ResultRow::new();
        row.insert("database_name", SqlValue::String("Sales".to_string()));
        row.insert("logical_file_name", SqlValue::Null);
        assert!(file_from_row(&row).is_none());
    }
}
