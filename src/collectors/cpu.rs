//! CPU usage sampling.
//!
//! The primary source is one batch iteration of `top`, whose `Cpu(s)` summary
//! line carries the aggregate user and system percentages. When `top` is
//! missing or prints something unexpected, two `/proc/stat` samples taken a
//! short interval apart are used instead.

use regex::Regex;
use std::fs;
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::run_command;
use crate::error::SamplingError;

/// Gap between the two `/proc/stat` samples of the fallback path.
const PROC_STAT_SAMPLE_GAP: Duration = Duration::from_millis(100);

// Matches both "%Cpu(s):  5.0 us,  2.0 sy" and the older "Cpu(s):  5.0%us,  2.0%sy".
static TOP_CPU_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Cpu\(s\):\s*([0-9]+(?:\.[0-9]+)?)\s*%?\s*us,\s*([0-9]+(?:\.[0-9]+)?)\s*%?\s*sy")
        .expect("valid top regex")
});

/// Aggregate CPU counters from the first line of /proc/stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Time spent in user and kernel mode.
    pub fn busy(&self) -> u64 {
        self.user + self.system
    }
}

/// Returns the user+system CPU percentage, rounded to the nearest integer.
pub fn sample_cpu_usage() -> Result<u8, SamplingError> {
    match run_command("top", &["-bn1"]).and_then(|out| parse_top_output(&out)) {
        Ok(percent) => Ok(percent),
        Err(e) => {
            debug!("top sampling failed ({}), falling back to /proc/stat", e);
            sample_proc_stat().inspect_err(|e| warn!("CPU usage unavailable: {}", e))
        }
    }
}

/// Extracts user+system percent from `top -bn1` output.
pub fn parse_top_output(output: &str) -> Result<u8, SamplingError> {
    let caps = output
        .lines()
        .find_map(|line| TOP_CPU_LINE.captures(line))
        .ok_or_else(|| SamplingError::format("top -bn1", "no Cpu(s) summary line"))?;

    let user: f64 = caps[1]
        .parse()
        .map_err(|e| SamplingError::format("top -bn1", format!("bad user value: {e}")))?;
    let system: f64 = caps[2]
        .parse()
        .map_err(|e| SamplingError::format("top -bn1", format!("bad system value: {e}")))?;

    Ok(to_percent(user + system))
}

fn to_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Parses the aggregate `cpu` line of /proc/stat.
pub fn parse_proc_stat(content: &str) -> Result<CpuStat, SamplingError> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| SamplingError::format("/proc/stat", "no aggregate cpu line"))?;

    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| SamplingError::format("/proc/stat", e.to_string()))?;

    if values.len() < 8 {
        return Err(SamplingError::format(
            "/proc/stat",
            format!("expected at least 8 counters, got {}", values.len()),
        ));
    }

    Ok(CpuStat {
        user: values[0],
        nice: values[1],
        system: values[2],
        idle: values[3],
        iowait: values[4],
        irq: values[5],
        softirq: values[6],
        steal: values[7],
    })
}

/// User+system share of the time elapsed between two samples.
pub fn usage_between(prev: &CpuStat, curr: &CpuStat) -> u8 {
    let total = curr.total().saturating_sub(prev.total());
    if total == 0 {
        return 0;
    }
    let busy = curr.busy().saturating_sub(prev.busy());
    to_percent(busy as f64 * 100.0 / total as f64)
}

fn read_proc_stat() -> Result<CpuStat, SamplingError> {
    let content = fs::read_to_string("/proc/stat").map_err(|source| SamplingError::Io {
        path: "/proc/stat".into(),
        source,
    })?;
    parse_proc_stat(&content)
}

fn sample_proc_stat() -> Result<u8, SamplingError> {
    let first = read_proc_stat()?;
    thread::sleep(PROC_STAT_SAMPLE_GAP);
    let second = read_proc_stat()?;
    Ok(usage_between(&first, &second))
}
