//! The best-practice rule catalog.
//!
//! Every rule is independent and only fires on a non-compliant value. A rule
//! whose input facts are unknown is skipped.

use super::maxdop::recommended_max_dop;
use super::recommendation::{Recommendation, Setting};
use crate::constants::{
    FRAGMENT_SEPARATOR, MAX_SERVER_MEMORY_RATIO, MIN_COST_THRESHOLD, OS_RESERVED_MEMORY_GB,
    TEMPDB_MAX_FILES,
};
use crate::facts::{DatabaseFile, MemoryModel, ServerFacts};

/// Evaluate every rule against one server's facts and file inventory.
///
/// Output is in catalog order; per-file rules emit one entry per offending
/// file in inventory order.
pub fn evaluate(facts: &ServerFacts, files: &[DatabaseFile]) -> Vec<Recommendation> {
    let mut out = Vec::new();

    check_max_dop(facts, &mut out);
    check_memory_model(facts, &mut out);
    check_cost_threshold(facts, &mut out);
    check_tempdb(facts, &mut out);
    check_max_server_memory(facts, &mut out);
    check_backup_compression(facts, &mut out);
    check_instant_file_initialization(facts, &mut out);
    check_percent_growth(facts, files, &mut out);
    check_growth_disabled(facts, files, &mut out);

    out
}

/// Recommended number of tempdb data files for a CPU count.
pub fn recommended_tempdb_files(cpu_count: u32) -> u32 {
    cpu_count.min(TEMPDB_MAX_FILES)
}

/// Recommended ceiling for max server memory, in GB.
pub fn recommended_max_server_memory_gb(total_memory_gb: f64) -> f64 {
    (total_memory_gb - OS_RESERVED_MEMORY_GB).max(total_memory_gb * MAX_SERVER_MEMORY_RATIO)
}

fn push(
    out: &mut Vec<Recommendation>,
    facts: &ServerFacts,
    setting: Setting,
    current: impl Into<String>,
    recommended: impl Into<String>,
    rationale: impl Into<String>,
) {
    out.push(Recommendation::new(
        facts.server_name.clone(),
        setting,
        current,
        recommended,
        rationale,
    ));
}

fn check_max_dop(facts: &ServerFacts, out: &mut Vec<Recommendation>) {
    let (Some(cpus), Some(nodes), Some(current)) =
        (facts.cpu_count, facts.numa_node_count, facts.current_max_dop)
    else {
        return;
    };

    let recommended = recommended_max_dop(cpus, nodes);
    if current != recommended {
        push(
            out,
            facts,
            Setting::MaxDop,
            current.to_string(),
            recommended.to_string(),
            format!(
                "{} logical CPUs across {} NUMA node(s); cap parallel plans at {} workers",
                cpus, nodes, recommended
            ),
        );
    }
}

fn check_memory_model(facts: &ServerFacts, out: &mut Vec<Recommendation>) {
    let Some(model) = &facts.memory_model else {
        return;
    };

    if *model != MemoryModel::LockPages {
        push(
            out,
            facts,
            Setting::MemoryModel,
            model.as_str(),
            MemoryModel::LockPages.as_str(),
            "Grant the service account the Lock Pages in Memory privilege so the buffer pool is not paged out",
        );
    }
}

fn check_cost_threshold(facts: &ServerFacts, out: &mut Vec<Recommendation>) {
    let Some(current) = facts.cost_threshold_for_parallelism else {
        return;
    };

    if current < MIN_COST_THRESHOLD {
        push(
            out,
            facts,
            Setting::CostThreshold,
            current.to_string(),
            MIN_COST_THRESHOLD.to_string(),
            format!(
                "A threshold below {} lets cheap queries go parallel and waste worker threads",
                MIN_COST_THRESHOLD
            ),
        );
    }
}

/// TempDB findings are aggregated into a single row.
fn check_tempdb(facts: &ServerFacts, out: &mut Vec<Recommendation>) {
    let mut current = Vec::new();
    let mut recommended = Vec::new();
    let mut rationale = Vec::new();

    if let (Some(cpus), Some(files)) = (facts.cpu_count, facts.temp_storage_file_count) {
        let target = recommended_tempdb_files(cpus);
        if files != target {
            current.push(format!("{} data files", files));
            recommended.push(format!("{} data files", target));
            rationale.push(format!(
                "Use one tempdb data file per logical CPU, up to {}",
                TEMPDB_MAX_FILES
            ));
        }
    }

    if let Some(sizes) = facts.temp_storage_distinct_size_count {
        if sizes > 1 {
            current.push(format!("{} distinct file sizes", sizes));
            recommended.push("Equal file sizes".to_string());
            rationale.push(
                "Size tempdb data files equally so proportional fill spreads allocations evenly"
                    .to_string(),
            );
        }
    }

    if let Some(percent) = facts.temp_storage_percent_growth_file_count {
        if percent > 0 {
            current.push(format!("{} files with percent growth", percent));
            recommended.push("Fixed-size growth".to_string());
            rationale.push(
                "Percent growth makes tempdb files grow unevenly; use a fixed MB increment"
                    .to_string(),
            );
        }
    }

    if current.is_empty() {
        return;
    }

    push(
        out,
        facts,
        Setting::TempDb,
        current.join(FRAGMENT_SEPARATOR),
        recommended.join(FRAGMENT_SEPARATOR),
        rationale.join(FRAGMENT_SEPARATOR),
    );
}

fn check_max_server_memory(facts: &ServerFacts, out: &mut Vec<Recommendation>) {
    let (Some(max_mb), Some(total_gb)) = (facts.max_server_memory_mb, facts.total_memory_gb)
    else {
        return;
    };

    let target_gb = recommended_max_server_memory_gb(total_gb);
    let unbounded = facts.max_server_memory_unbounded() == Some(true);
    if !unbounded && (max_mb as f64 / 1024.0) <= target_gb {
        return;
    }

    let current = if unbounded {
        format!("Unlimited ({} MB)", max_mb)
    } else {
        format!("{} MB", max_mb)
    };
    let rationale = if unbounded {
        format!(
            "Max server memory is not configured; leave headroom for the OS on this {:.1} GB host",
            total_gb
        )
    } else {
        format!(
            "Max server memory exceeds the larger of total - {} GB and {:.0}% of {:.1} GB",
            OS_RESERVED_MEMORY_GB,
            MAX_SERVER_MEMORY_RATIO * 100.0,
            total_gb
        )
    };

    push(
        out,
        facts,
        Setting::MaxServerMemory,
        current,
        format!(
            "{:.1} GB ({} MB)",
            target_gb,
            (target_gb * 1024.0).floor() as i64
        ),
        rationale,
    );
}

fn check_backup_compression(facts: &ServerFacts, out: &mut Vec<Recommendation>) {
    if facts.backup_compression_enabled == Some(false) {
        push(
            out,
            facts,
            Setting::BackupCompression,
            "Disabled",
            "Enabled",
            "Compressed backups are smaller and usually faster to write and restore",
        );
    }
}

fn check_instant_file_initialization(facts: &ServerFacts, out: &mut Vec<Recommendation>) {
    if facts.instant_file_initialization_enabled == Some(false) {
        push(
            out,
            facts,
            Setting::InstantFileInitialization,
            "Disabled",
            "Enabled",
            "Grant Perform Volume Maintenance Tasks to the service account to skip zero-filling data file growth",
        );
    }
}

fn check_percent_growth(
    facts: &ServerFacts,
    files: &[DatabaseFile],
    out: &mut Vec<Recommendation>,
) {
    for file in files.iter().filter(|f| f.is_percent_growth == Some(true)) {
        push(
            out,
            facts,
            Setting::FileGrowth,
            file.growth_description(),
            "Fixed-size growth (MB)",
            format!(
                "{} in database {} grows by percentage; growth events get larger and slower as the file grows",
                file.label(),
                file.database_name
            ),
        );
    }
}

fn check_growth_disabled(
    facts: &ServerFacts,
    files: &[DatabaseFile],
    out: &mut Vec<Recommendation>,
) {
    for file in files.iter().filter(|f| f.growth_value == Some(0.0)) {
        push(
            out,
            facts,
            Setting::FileGrowthDisabled,
            "0 (growth disabled)",
            "Non-zero growth",
            format!(
                "{} in database {} cannot grow and will fail writes once full",
                file.label(),
                file.database_name
            ),
        );
    }
}
