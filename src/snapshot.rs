//! Point-in-time host metrics and their JSON wire format.
//!
//! A [`MetricsSnapshot`] is rebuilt for every request and never stored.
//! Samplers that fail leave their field empty; the wire types render such
//! fields as [`MISSING`] so a partial snapshot is still served with 200.
//!
//! Wire keys are fixed by the display client and the dashboard page:
//!
//! ```text
//! {"Current Time": "Oct 17 09:05:31", "IP Address": "192.168.1.42",
//!  "CPU Usage": "7%", "SoC Temperature": "48.3C",
//!  "Total RAM": "3792MiB", "Used RAM": "512",
//!  "Total Swap": "100MiB", "Used Swap": "0"}
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collectors::{clock, cpu, memory::MemoryStats, netaddr, thermal};
use crate::error::SamplingError;

/// Marker substituted for a value whose sampler failed.
pub const MISSING: &str = "N/A";

/// One bundle of host metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub current_time: String,
    pub ip_address: String,
    pub cpu_usage_percent: Option<u8>,
    pub soc_temperature: Option<String>,
    pub memory: Option<MemoryStats>,
}

/// Source of host metrics.
///
/// The HTTP handlers only talk to this trait, so tests can serve fixed
/// values instead of querying the machine running them.
pub trait Sampler: Send + Sync + 'static {
    fn time(&self) -> String;
    fn network_address(&self) -> String;
    fn cpu_usage(&self) -> Result<u8, SamplingError>;
    fn temperature(&self) -> Result<String, SamplingError>;
    fn memory(&self) -> Result<MemoryStats, SamplingError>;

    fn snapshot_cpu(&self) -> Option<u8> {
        self.cpu_usage()
            .inspect_err(|e| warn!("CPU usage sampling failed: {}", e))
            .ok()
    }

    fn snapshot_temperature(&self) -> Option<String> {
        self.temperature()
            .inspect_err(|e| warn!("temperature sampling failed: {}", e))
            .ok()
    }

    fn snapshot_memory(&self) -> Option<MemoryStats> {
        self.memory()
            .inspect_err(|e| warn!("memory sampling failed: {}", e))
            .ok()
    }

    /// Samples everything, logging and dropping individual failures.
    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            current_time: self.time(),
            ip_address: self.network_address(),
            cpu_usage_percent: self.snapshot_cpu(),
            soc_temperature: self.snapshot_temperature(),
            memory: self.snapshot_memory(),
        }
    }
}

/// Samples the machine the process runs on.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSampler;

impl Sampler for HostSampler {
    fn time(&self) -> String {
        clock::sample_time()
    }

    fn network_address(&self) -> String {
        netaddr::sample_network_address()
    }

    fn cpu_usage(&self) -> Result<u8, SamplingError> {
        cpu::sample_cpu_usage()
    }

    fn temperature(&self) -> Result<String, SamplingError> {
        thermal::sample_temperature()
    }

    fn memory(&self) -> Result<MemoryStats, SamplingError> {
        crate::collectors::memory::sample_memory()
    }
}

/// Body of `/api/time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeMetrics {
    #[serde(rename = "Current Time")]
    pub current_time: String,
}

/// Body of `/api/cpu`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuMetrics {
    #[serde(rename = "CPU Usage")]
    pub cpu_usage: String,
}

/// Body of `/api/mem`. Totals carry a `MiB` suffix, used values do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemMetrics {
    #[serde(rename = "Total RAM")]
    pub total_ram: String,
    #[serde(rename = "Used RAM")]
    pub used_ram: String,
    #[serde(rename = "Total Swap")]
    pub total_swap: String,
    #[serde(rename = "Used Swap")]
    pub used_swap: String,
}

/// Body of `/api/all`, also decoded by the display client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllMetrics {
    #[serde(rename = "Current Time")]
    pub current_time: String,
    #[serde(rename = "IP Address")]
    pub ip_address: String,
    #[serde(rename = "CPU Usage")]
    pub cpu_usage: String,
    #[serde(rename = "SoC Temperature")]
    pub soc_temperature: String,
    #[serde(rename = "Total RAM")]
    pub total_ram: String,
    #[serde(rename = "Used RAM")]
    pub used_ram: String,
    #[serde(rename = "Total Swap")]
    pub total_swap: String,
    #[serde(rename = "Used Swap")]
    pub used_swap: String,
}

/// Formats a CPU percentage as `7%`.
pub fn format_cpu(percent: Option<u8>) -> String {
    match percent {
        Some(p) => format!("{p}%"),
        None => MISSING.to_string(),
    }
}

impl From<Option<MemoryStats>> for MemMetrics {
    fn from(stats: Option<MemoryStats>) -> Self {
        match stats {
            Some(s) => MemMetrics {
                total_ram: format!("{}MiB", s.total_ram_mib),
                used_ram: s.used_ram_mib.to_string(),
                total_swap: format!("{}MiB", s.total_swap_mib),
                used_swap: s.used_swap_mib.to_string(),
            },
            None => MemMetrics {
                total_ram: MISSING.to_string(),
                used_ram: MISSING.to_string(),
                total_swap: MISSING.to_string(),
                used_swap: MISSING.to_string(),
            },
        }
    }
}

impl From<MetricsSnapshot> for AllMetrics {
    fn from(s: MetricsSnapshot) -> Self {
        let mem = MemMetrics::from(s.memory);
        AllMetrics {
            current_time: s.current_time,
            ip_address: s.ip_address,
            cpu_usage: format_cpu(s.cpu_usage_percent),
            soc_temperature: s.soc_temperature.unwrap_or_else(|| MISSING.to_string()),
            total_ram: mem.total_ram,
            used_ram: mem.used_ram,
            total_swap: mem.total_swap,
            used_swap: mem.used_swap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn full_snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            current_time: "Oct 17 09:05:31".into(),
            ip_address: "192.168.1.42".into(),
            cpu_usage_percent: Some(7),
            soc_temperature: Some("48.3C".into()),
            memory: Some(MemoryStats {
                total_ram_mib: 1024,
                used_ram_mib: 512,
                total_swap_mib: 100,
                used_swap_mib: 0,
            }),
        }
    }

    #[test]
    fn test_all_metrics_keys_and_formats() {
        let value = serde_json::to_value(AllMetrics::from(full_snapshot())).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.len(), 8);
        assert_eq!(obj["Current Time"], "Oct 17 09:05:31");
        assert_eq!(obj["IP Address"], "192.168.1.42");
        assert_eq!(obj["CPU Usage"], "7%");
        assert_eq!(obj["SoC Temperature"], "48.3C");
        assert_eq!(obj["Total RAM"], "1024MiB");
        assert_eq!(obj["Used RAM"], "512");
        assert_eq!(obj["Total Swap"], "100MiB");
        assert_eq!(obj["Used Swap"], "0");
    }

    #[test]
    fn test_partial_snapshot_uses_marker() {
        let mut snap = full_snapshot();
        snap.cpu_usage_percent = None;
        snap.soc_temperature = None;
        snap.memory = None;

        let all = AllMetrics::from(snap);
        assert_eq!(all.cpu_usage, MISSING);
        assert_eq!(all.soc_temperature, MISSING);
        assert_eq!(all.total_ram, MISSING);
        assert_eq!(all.used_swap, MISSING);
        assert_eq!(all.current_time, "Oct 17 09:05:31");
    }

    #[test]
    fn test_client_decodes_server_body() {
        let body = serde_json::to_string(&AllMetrics::from(full_snapshot())).unwrap();
        let decoded: AllMetrics = serde_json::from_str(&body).unwrap();
        assert_eq!(decoded.used_ram, "512");
    }

    #[test]
    fn test_decode_rejects_missing_key() {
        let body = r#"{"Current Time": "Oct 17 09:05:31", "IP Address": ""}"#;
        assert!(serde_json::from_str::<AllMetrics>(body).is_err());
    }

    struct Failing;

    impl Sampler for Failing {
        fn time(&self) -> String {
            "Jan 01 00:00:00".into()
        }
        fn network_address(&self) -> String {
            String::new()
        }
        fn cpu_usage(&self) -> Result<u8, SamplingError> {
            Err(SamplingError::format("top -bn1", "no Cpu(s) summary line"))
        }
        fn temperature(&self) -> Result<String, SamplingError> {
            Ok("40.0C".into())
        }
        fn memory(&self) -> Result<MemoryStats, SamplingError> {
            Err(SamplingError::MissingField("MemTotal"))
        }
    }

    #[test]
    fn test_snapshot_survives_sampler_failures() {
        let snap = Failing.snapshot();
        assert_eq!(snap.cpu_usage_percent, None);
        assert_eq!(snap.soc_temperature.as_deref(), Some("40.0C"));
        assert_eq!(snap.memory, None);

        let value: Value = serde_json::to_value(AllMetrics::from(snap)).unwrap();
        assert_eq!(value["CPU Usage"], MISSING);
        assert_eq!(value["IP Address"], "");
    }
}
