//! Report accumulation and output.
//!
//! The builder holds two independent append-only buffers: the
//! recommendations table (CSV) and the detailed analysis narrative. Both are
//! rendered and written once, at the end of a run.

use crate::constants::{
    DETAILED_FILE_PREFIX, RECOMMENDATIONS_FILE_PREFIX, RECOMMENDATIONS_HEADER,
    REPORT_TIMESTAMP_FORMAT,
};
use crate::engine::{recommended_max_dop, Recommendation};
use crate::error::AdvisorError;
use crate::facts::{DatabaseFile, ServerFacts};
use chrono::{DateTime, Local};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::info;

const BLOCK_RULE: &str =
    "==============================================================================";

/// Paths of the two files written for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub recommendations: PathBuf,
    pub detailed: PathBuf,
}

/// Accumulates report content across all processed servers.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    recommendation_rows: Vec<String>,
    detail_lines: Vec<String>,
    servers_detailed: usize,
}

impl ReportBuilder {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append recommendation rows in the order given.
    pub fn append_recommendations<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = &'a Recommendation>,
    {
        self.recommendation_rows.extend(
            entries
                .into_iter()
                .map(|rec| csv_row(&rec.columns())),
        );
    }

    /// Append the fact block and file list of one analyzed server.
    pub fn append_server_detail(&mut self, facts: &ServerFacts, files: &[DatabaseFile]) {
        let lines = &mut self.detail_lines;

        lines.push(BLOCK_RULE.to_string());
        lines.push(format!("Server: {}", facts.server_name));
        lines.push(BLOCK_RULE.to_string());
        push_fact(lines, "Product Version", facts.product_version.as_deref());
        push_fact(lines, "Edition", facts.edition.as_deref());
        push_fact(lines, "CPU Count", facts.cpu_count);
        push_fact(lines, "NUMA Nodes", facts.numa_node_count);
        push_fact(lines, "Hyperthread Ratio", facts.hyperthread_ratio);
        push_fact(lines, "Sockets", facts.socket_count);
        push_fact(lines, "Soft-NUMA", facts.soft_numa_description.as_deref());
        push_fact(lines, "Memory Model", facts.memory_model.as_ref());
        push_fact(
            lines,
            "Total Memory (GB)",
            facts.total_memory_gb.map(|gb| format!("{:.2}", gb)),
        );
        push_fact(
            lines,
            "Committed Memory (GB)",
            facts.committed_memory_gb.map(|gb| format!("{:.2}", gb)),
        );
        push_fact(lines, "Current MAXDOP", facts.current_max_dop);
        push_fact(
            lines,
            "Recommended MAXDOP",
            facts
                .cpu_count
                .zip(facts.numa_node_count)
                .map(|(cpus, nodes)| recommended_max_dop(cpus, nodes)),
        );
        push_fact(
            lines,
            "Cost Threshold for Parallelism",
            facts.cost_threshold_for_parallelism,
        );
        push_fact(lines, "Min Server Memory (MB)", facts.min_server_memory_mb);
        push_fact(lines, "Max Server Memory (MB)", facts.max_server_memory_mb);
        push_fact(
            lines,
            "Backup Compression",
            facts.backup_compression_enabled.map(enabled),
        );
        push_fact(
            lines,
            "Instant File Initialization",
            facts.instant_file_initialization_enabled.map(enabled),
        );
        push_fact(lines, "TempDB Data Files", facts.temp_storage_file_count);
        push_fact(
            lines,
            "TempDB Distinct File Sizes",
            facts.temp_storage_distinct_size_count,
        );
        push_fact(
            lines,
            "TempDB Percent-Growth Files",
            facts.temp_storage_percent_growth_file_count,
        );

        lines.push(String::new());
        lines.push(format!("Database Files ({}):", files.len()));
        for file in files {
            lines.push(format!(
                "  {} | {} | {} | {} | Growth: {} | Max: {}",
                file.database_name,
                file.logical_file_name,
                or_unknown(file.file_type.as_ref()),
                or_unknown(file.current_size_mb.map(|mb| format!("{:.2} MB", mb))),
                file.growth_description(),
                or_unknown(file.max_size.as_ref())
            ));
        }
        lines.push(String::new());

        self.servers_detailed += 1;
    }

    /// Render both buffers: `(recommendations_text, detailed_text)`.
    pub fn render(&self) -> (String, String) {
        let mut recommendations = String::with_capacity(
            RECOMMENDATIONS_HEADER.len() + 1 + self.recommendation_rows.len() * 96,
        );
        recommendations.push_str(RECOMMENDATIONS_HEADER);
        recommendations.push('\n');
        for row in &self.recommendation_rows {
            recommendations.push_str(row);
            recommendations.push('\n');
        }

        let mut detailed = self.detail_lines.join("\n");
        if !detailed.is_empty() {
            detailed.push('\n');
        }

        (recommendations, detailed)
    }

    /// Number of recommendation rows appended so far.
    pub fn recommendation_count(&self) -> usize {
        self.recommendation_rows.len()
    }

    /// Number of server detail blocks appended so far.
    pub fn server_count(&self) -> usize {
        self.servers_detailed
    }

    /// Render and write both files into `dir`, named after `timestamp`.
    pub async fn write_to_dir(
        &self,
        dir: &Path,
        timestamp: DateTime<Local>,
    ) -> Result<ReportFiles, AdvisorError> {
        tokio::fs::create_dir_all(dir).await?;

        let stamp = timestamp.format(REPORT_TIMESTAMP_FORMAT);
        let files = ReportFiles {
            recommendations: dir.join(format!("{}_{}.csv", RECOMMENDATIONS_FILE_PREFIX, stamp)),
            detailed: dir.join(format!("{}_{}.txt", DETAILED_FILE_PREFIX, stamp)),
        };

        let (recommendations, detailed) = self.render();
        tokio::fs::write(&files.recommendations, recommendations).await?;
        tokio::fs::write(&files.detailed, detailed).await?;

        info!(
            "Wrote {} recommendation(s) to {}",
            self.recommendation_count(),
            files.recommendations.display()
        );
        info!(
            "Wrote detailed analysis of {} server(s) to {}",
            self.server_count(),
            files.detailed.display()
        );

        Ok(files)
    }
}

fn push_fact<T: Display>(lines: &mut Vec<String>, label: &str, value: Option<T>) {
    lines.push(format!("{}: {}", label, or_unknown(value)));
}

fn or_unknown<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "Unknown".to_string(), |v| v.to_string())
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

fn csv_row(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote a CSV value when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
