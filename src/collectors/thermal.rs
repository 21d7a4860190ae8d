//! SoC temperature collector.
//!
//! The kernel thermal zones under /sys/class/thermal are read first. Boards
//! without a usable zone fall back to the firmware tool `vcgencmd
//! measure_temp`, whose output looks like `temp=48.3'C`.
//!
//! The reading is reported as text with a unit suffix, e.g. `48.3C`.

use std::fs;
use std::path::Path;
use tracing::debug;

use super::run_command;
use crate::error::SamplingError;

const THERMAL_BASE: &str = "/sys/class/thermal";

/// Temperature reading with sensor name.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalReading {
    pub sensor_name: String,
    pub temperature_celsius: f64,
}

impl ThermalReading {
    /// Display form with unit suffix, matching `vcgencmd` precision.
    pub fn display(&self) -> String {
        format!("{:.1}C", self.temperature_celsius)
    }
}

/// Returns the SoC temperature with unit suffix.
pub fn sample_temperature() -> Result<String, SamplingError> {
    match read_soc_zone(Path::new(THERMAL_BASE)) {
        Ok(Some(reading)) => {
            debug!("SoC temperature from {}", reading.sensor_name);
            return Ok(reading.display());
        }
        Ok(None) => debug!("no thermal zone found, trying vcgencmd"),
        Err(e) => debug!("thermal zones unreadable ({}), trying vcgencmd", e),
    }

    let out = run_command("vcgencmd", &["measure_temp"])?;
    parse_vcgencmd(&out)
}

/// Reads the SoC thermal zone below `base`.
///
/// A zone whose `type` names the CPU/SoC wins; otherwise the lowest-numbered
/// zone is used. Returns `Ok(None)` when no zone exposes a temperature.
pub fn read_soc_zone(base: &Path) -> Result<Option<ThermalReading>, SamplingError> {
    if !base.exists() {
        return Ok(None); // No thermal zones available
    }

    let entries = fs::read_dir(base).map_err(|source| SamplingError::Io {
        path: base.display().to_string(),
        source,
    })?;

    let mut zones: Vec<(String, String, f64)> = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        let zone_name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };

        // Only process thermal_zone* directories
        if !zone_name.starts_with("thermal_zone") {
            continue;
        }

        // Read temperature (in millidegrees Celsius)
        let millidegrees = match fs::read_to_string(path.join("temp")) {
            Ok(content) => match content.trim().parse::<i64>() {
                Ok(v) => v,
                Err(_) => continue,
            },
            Err(_) => continue,
        };

        let zone_type = fs::read_to_string(path.join("type"))
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        zones.push((zone_name, zone_type, millidegrees as f64 / 1000.0));
    }

    zones.sort_by(|a, b| zone_index(&a.0).cmp(&zone_index(&b.0)));

    let preferred = zones
        .iter()
        .position(|(_, ty, _)| is_soc_zone(ty))
        .unwrap_or(0);

    Ok(zones
        .into_iter()
        .nth(preferred)
        .map(|(name, _, celsius)| ThermalReading {
            sensor_name: name,
            temperature_celsius: celsius,
        }))
}

fn zone_index(name: &str) -> u32 {
    name.trim_start_matches("thermal_zone")
        .parse()
        .unwrap_or(u32::MAX)
}

fn is_soc_zone(zone_type: &str) -> bool {
    let ty = zone_type.to_ascii_lowercase();
    ty.contains("cpu") || ty.contains("soc")
}

/// Parses `temp=48.3'C` into `48.3C`.
pub fn parse_vcgencmd(output: &str) -> Result<String, SamplingError> {
    let value = output
        .trim()
        .strip_prefix("temp=")
        .ok_or_else(|| SamplingError::format("vcgencmd measure_temp", output.trim()))?;

    let number = value.trim_end_matches("'C");
    number
        .parse::<f64>()
        .map_err(|_| SamplingError::format("vcgencmd measure_temp", output.trim()))?;

    Ok(format!("{number}C"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_zone(base: &Path, name: &str, ty: &str, temp: &str) {
        let dir = base.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("type"), format!("{ty}\n")).unwrap();
        fs::write(dir.join("temp"), format!("{temp}\n")).unwrap();
    }

    #[test]
    fn test_parse_vcgencmd() {
        assert_eq!(parse_vcgencmd("temp=48.3'C\n").unwrap(), "48.3C");
    }

    #[test]
    fn test_parse_vcgencmd_garbage() {
        assert!(parse_vcgencmd("VCHI initialization failed").is_err());
        assert!(parse_vcgencmd("temp=hot'C").is_err());
    }

    #[test]
    fn test_read_soc_zone_prefers_cpu_type() {
        let dir = TempDir::new().unwrap();
        make_zone(dir.path(), "thermal_zone0", "acpitz", "30000");
        make_zone(dir.path(), "thermal_zone1", "cpu-thermal", "51540");
        make_zone(dir.path(), "cooling_device0", "fan", "0");

        let reading = read_soc_zone(dir.path()).unwrap().unwrap();
        assert_eq!(reading.sensor_name, "thermal_zone1");
        assert_eq!(reading.display(), "51.5C");
    }

    #[test]
    fn test_read_soc_zone_falls_back_to_first_zone() {
        let dir = TempDir::new().unwrap();
        make_zone(dir.path(), "thermal_zone10", "x86_pkg", "70000");
        make_zone(dir.path(), "thermal_zone2", "acpitz", "45000");

        let reading = read_soc_zone(dir.path()).unwrap().unwrap();
        assert_eq!(reading.sensor_name, "thermal_zone2");
        assert_eq!(reading.display(), "45.0C");
    }

    #[test]
    fn test_read_soc_zone_missing_base() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(read_soc_zone(&missing).unwrap(), None);
    }
}
