//! Recommendation records and the setting catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Settings the advisor can flag, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Setting {
    MaxDop,
    MemoryModel,
    CostThreshold,
    TempDb,
    MaxServerMemory,
    BackupCompression,
    InstantFileInitialization,
    FileGrowth,
    FileGrowthDisabled,
    /// Synthetic entry recorded when a server could not be analyzed.
    ConnectionError,
}

impl Setting {
    /// Name written to the recommendations table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxDop => "MAXDOP",
            Self::MemoryModel => "Memory Model",
            Self::CostThreshold => "Cost Threshold for Parallelism",
            Self::TempDb => "TempDB Configuration",
            Self::MaxServerMemory => "Max Server Memory",
            Self::BackupCompression => "Backup Compression",
            Self::InstantFileInitialization => "Instant File Initialization",
            Self::FileGrowth => "File Growth",
            Self::FileGrowthDisabled => "File Growth Disabled",
            Self::ConnectionError => "Connection Error",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recommended change on a single server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub server_name: String,
    pub setting: Setting,
    pub current_value: String,
    pub recommended_value: String,
    pub rationale: String,
}

impl Recommendation {
    pub fn new(
        server_name: impl Into<String>,
        setting: Setting,
        current_value: impl Into<String>,
        recommended_value: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            setting,
            current_value: current_value.into(),
            recommended_value: recommended_value.into(),
            rationale: rationale.into(),
        }
    }

    /// The row recorded for a server that could not be analyzed.
    pub fn connection_error(server_name: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::new(
            server_name,
            Setting::ConnectionError,
            "",
            "",
            error.to_string(),
        )
    }

    /// Fields in recommendations table column order.
    pub fn columns(&self) -> [&str; 5] {
        [
            &self.server_name,
            self.setting.as_str(),
            &self.current_value,
            &self.recommended_value,
            &self.rationale,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order() {
        assert!(Setting::MaxDop < Setting::MemoryModel);
        assert!(Setting::TempDb < Setting::MaxServerMemory);
        assert!(Setting::FileGrowth < Setting::FileGrowthDisabled);
    }

    #[test]
    fn test_connection_error_row() {
        let rec = Recommendation::connection_error("db02", "Connection error: refused");
        assert_eq!(
            rec.columns(),
            ["db02", "Connection Error", "", "", "Connection error: refused"]
        );
    }
}
