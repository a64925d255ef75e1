//! Configuration facts gathered from a single server.
//!
//! These records are produced by the fact collector and consumed by the
//! recommendation engine. Anything the server did not report (NULL column,
//! missing DMV on an older version) is `None` and the rules depending on it
//! are skipped.

use crate::constants::UNBOUNDED_MEMORY_MB;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine memory model as reported by `sys.dm_os_sys_info.sql_memory_model_desc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryModel {
    /// Pageable buffer pool.
    Conventional,
    /// Buffer pool pages locked in physical memory.
    LockPages,
    /// Large pages (implies locked pages, reported separately).
    LargePages,
    /// Any value this version of the advisor does not know.
    Other(String),
}

impl MemoryModel {
    /// Parse the DMV description.
    pub fn from_desc(desc: &str) -> Self {
        match desc.trim().to_uppercase().as_str() {
            "CONVENTIONAL" => Self::Conventional,
            "LOCK_PAGES" => Self::LockPages,
            "LARGE_PAGES" => Self::LargePages,
            _ => Self::Other(desc.trim().to_string()),
        }
    }

    /// Description as the DMV reports it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Conventional => "CONVENTIONAL",
            Self::LockPages => "LOCK_PAGES",
            Self::LargePages => "LARGE_PAGES",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for MemoryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host and engine facts for one server, one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerFacts {
    pub server_name: String,
    pub product_version: Option<String>,
    pub edition: Option<String>,
    pub cpu_count: Option<u32>,
    pub numa_node_count: Option<u32>,
    pub hyperthread_ratio: Option<u32>,
    pub socket_count: Option<u32>,
    pub soft_numa_description: Option<String>,
    pub memory_model: Option<MemoryModel>,
    pub total_memory_gb: Option<f64>,
    pub committed_memory_gb: Option<f64>,
    /// 0 means the engine picks the degree of parallelism itself.
    pub current_max_dop: Option<u32>,
    pub cost_threshold_for_parallelism: Option<i32>,
    pub min_server_memory_mb: Option<i64>,
    /// [`UNBOUNDED_MEMORY_MB`] means the setting was never configured.
    pub max_server_memory_mb: Option<i64>,
    pub backup_compression_enabled: Option<bool>,
    pub instant_file_initialization_enabled: Option<bool>,
    pub temp_storage_file_count: Option<u32>,
    pub temp_storage_distinct_size_count: Option<u32>,
    pub temp_storage_percent_growth_file_count: Option<u32>,
}

impl ServerFacts {
    /// An empty fact record for a server; every fact unknown.
    pub fn unknown(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            ..Self::default()
        }
    }

    /// Whether max server memory is left at its unconfigured default.
    pub fn max_server_memory_unbounded(&self) -> Option<bool> {
        self.max_server_memory_mb.map(|mb| mb >= UNBOUNDED_MEMORY_MB)
    }
}

/// Database file type from `sys.master_files.type_desc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    Data,
    Log,
    Other(String),
}

impl FileType {
    pub fn from_desc(desc: &str) -> Self {
        match desc.trim().to_uppercase().as_str() {
            "ROWS" | "DATA" => Self::Data,
            "LOG" => Self::Log,
            _ => Self::Other(desc.trim().to_string()),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => f.write_str("Data"),
            Self::Log => f.write_str("Log"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Growth bound of a database file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MaxSize {
    Unlimited,
    /// Fixed upper bound in MB.
    Fixed(f64),
    NoGrowth,
}

impl MaxSize {
    /// Interpret `sys.master_files.max_size` (8 KB pages; -1 unlimited, 0 no growth).
    pub fn from_pages(pages: i64) -> Self {
        match pages {
            -1 => Self::Unlimited,
            0 => Self::NoGrowth,
            // 268435456 pages is the 2 TB cap log files report for "unlimited"
            268_435_456 => Self::Unlimited,
            p => Self::Fixed(p as f64 * 8.0 / 1024.0),
        }
    }
}

impl fmt::Display for MaxSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("Unlimited"),
            Self::Fixed(mb) => write!(f, "{:.2} MB", mb),
            Self::NoGrowth => f.write_str("No Growth"),
        }
    }
}

/// One row of the per-server file inventory.
///
/// Only the names are required; anything else may be unknown (`None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseFile {
    pub database_name: String,
    pub logical_file_name: String,
    pub file_type: Option<FileType>,
    pub current_size_mb: Option<f64>,
    pub is_percent_growth: Option<bool>,
    /// Percent when `is_percent_growth`, otherwise MB.
    pub growth_value: Option<f64>,
    pub max_size: Option<MaxSize>,
}

impl DatabaseFile {
    /// Human-readable growth setting, e.g. `10%` or `64 MB`.
    pub fn growth_description(&self) -> String {
        match (self.is_percent_growth, self.growth_value) {
            (Some(true), Some(value)) => format!("{}%", value),
            (Some(false), Some(value)) => format!("{} MB", value),
            _ => "Unknown".to_string(),
        }
    }

    /// `Log file Sales_log`, or `File Sales_log` when the type is unknown.
    pub fn label(&self) -> String {
        match &self.file_type {
            Some(file_type) => format!("{} file {}", file_type, self.logical_file_name),
            None => format!("File {}", self.logical_file_name),
        }
    }
}

/// Everything collected from one server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSnapshot {
    pub facts: ServerFacts,
    pub files: Vec<DatabaseFile>,
}
