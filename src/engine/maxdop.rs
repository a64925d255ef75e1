//! MAXDOP sizing.

use crate::constants::{MAXDOP_MULTI_NODE_CAP, MAXDOP_SINGLE_NODE_CAP};

/// Recommended `max degree of parallelism` for a host.
///
/// A single NUMA node is capped at 8. With several nodes the per-node
/// logical CPU count is halved and capped at 16; a node with a single CPU
/// therefore yields 0, which the engine reports as-is.
///
/// A node count of 0 never comes from a real host and is handled like a
/// single node.
pub fn recommended_max_dop(cpu_count: u32, numa_node_count: u32) -> u32 {
    if numa_node_count <= 1 {
        return cpu_count.min(MAXDOP_SINGLE_NODE_CAP);
    }

    let per_node = cpu_count.div_ceil(numa_node_count);
    per_node.min(MAXDOP_MULTI_NODE_CAP).min(per_node / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_node_small_hosts_use_all_cpus() {
        for cpus in 1..=8 {
            assert_eq!(recommended_max_dop(cpus, 1), cpus);
        }
    }

    #[test]
    fn test_single_node_capped_at_eight() {
        assert_eq!(recommended_max_dop(16, 1), 8);
        assert_eq!(recommended_max_dop(32, 1), 8);
    }

    #[test]
    fn test_multi_node_halves_per_node_count() {
        // 16 per node -> min(16, 16, 8)
        assert_eq!(recommended_max_dop(64, 4), 8);
        // 40 per node -> min(40, 16, 20)
        assert_eq!(recommended_max_dop(80, 2), 16);
        // ceil(10 / 3) = 4 -> 2
        assert_eq!(recommended_max_dop(10, 3), 2);
    }

    #[test]
    fn test_multi_node_single_cpu_per_node_yields_zero() {
        assert_eq!(recommended_max_dop(2, 2), 0);
        assert_eq!(recommended_max_dop(4, 4), 0);
    }

    #[test]
    fn test_zero_nodes_treated_as_single_node() {
        assert_eq!(recommended_max_dop(12, 0), 8);
    }
}
