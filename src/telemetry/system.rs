//! On-demand telemetry snapshot
//!
//! Everything is computed when `/stats` is requested; nothing samples in the
//! background. Any OS counter that cannot be read reports zero.

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};

use crate::telemetry::registry::StreamState;

/// Body of the `/stats` endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub listeners: usize,
    /// Percent
    pub cpu: f64,
    /// Megabytes
    pub ram: u64,
    /// KB/s
    pub bandwidth: f64,
}

impl Stats {
    pub fn collect(state: &StreamState) -> Self {
        let snapshot = state.snapshot();
        Self {
            listeners: snapshot.listeners,
            cpu: cpu_usage(),
            ram: process_memory_mb(),
            bandwidth: bandwidth_kbps(snapshot.total_bytes, snapshot.elapsed.as_secs_f64()),
        }
    }
}

/// Lifetime average throughput in KB/s (1 KB = 1024 bytes)
pub fn bandwidth_kbps(total_bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    total_bytes as f64 / elapsed_secs / 1024.0
}

/// System-wide busy ratio from `/proc/stat`.
///
/// This is a single read of the cumulative counters, so it reports the
/// average since boot rather than current load.
pub fn cpu_usage() -> f64 {
    match std::fs::read_to_string("/proc/stat") {
        Ok(text) => cpu_usage_from(&text),
        Err(e) => {
            tracing::debug!("CPU counters unavailable: {}", e);
            0.0
        }
    }
}

/// Parse the aggregate `cpu` line: (user+nice+system) / (user+nice+system+idle)
pub fn cpu_usage_from(proc_stat: &str) -> f64 {
    let Some(line) = proc_stat.lines().next() else {
        return 0.0;
    };
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return 0.0;
    }

    let value = |i: usize| fields[i].parse::<f64>().unwrap_or(0.0);
    let used = value(1) + value(2) + value(3);
    let total = used + value(4);
    if total == 0.0 {
        return 0.0;
    }
    used / total * 100.0
}

/// Resident memory of this process in MB
pub fn process_memory_mb() -> u64 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0;
    };
    let mut system = System::new();
    system.refresh_process(pid);
    process_memory_of(&system, pid) / 1024 / 1024
}

fn process_memory_of(system: &System, pid: Pid) -> u64 {
    system.process(pid).map(|p| p.memory()).unwrap_or(0)
}
