//! RAM and swap usage from /proc/meminfo.

use ahash::AHashMap as HashMap;
use serde::Serialize;
use std::fs;

use crate::error::SamplingError;

const MEMINFO_PATH: &str = "/proc/meminfo";
const KIB_PER_MIB: f64 = 1024.0;

/// Memory usage in whole MiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub total_ram_mib: u64,
    pub used_ram_mib: u64,
    pub total_swap_mib: u64,
    pub used_swap_mib: u64,
}

/// Reads /proc/meminfo and derives RAM and swap usage.
pub fn sample_memory() -> Result<MemoryStats, SamplingError> {
    let content = fs::read_to_string(MEMINFO_PATH).map_err(|source| SamplingError::Io {
        path: MEMINFO_PATH.into(),
        source,
    })?;
    parse_meminfo(&content)
}

/// Computes usage from meminfo text.
///
/// used RAM = MemTotal - MemAvailable, used swap = SwapTotal - SwapFree. Both
/// saturate at zero and are rounded to the nearest MiB.
pub fn parse_meminfo(content: &str) -> Result<MemoryStats, SamplingError> {
    let fields: HashMap<&str, u64> = content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let key = parts.next()?.strip_suffix(':')?;
            let value = parts.next()?.parse::<u64>().ok()?;
            Some((key, value))
        })
        .collect();

    let get = |key: &'static str| {
        fields
            .get(key)
            .copied()
            .ok_or(SamplingError::MissingField(key))
    };

    let mem_total = get("MemTotal")?;
    let mem_available = get("MemAvailable")?;
    let swap_total = get("SwapTotal")?;
    let swap_free = get("SwapFree")?;

    Ok(MemoryStats {
        total_ram_mib: kib_to_mib(mem_total),
        used_ram_mib: kib_to_mib(mem_total.saturating_sub(mem_available)),
        total_swap_mib: kib_to_mib(swap_total),
        used_swap_mib: kib_to_mib(swap_total.saturating_sub(swap_free)),
    })
}

fn kib_to_mib(kib: u64) -> u64 {
    (kib as f64 / KIB_PER_MIB).round() as u64
}
