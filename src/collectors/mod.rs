//! Collectors for host metrics.
//!
//! Each collector samples one part of the host state on demand: wall clock,
//! primary network address, CPU usage, SoC temperature and memory/swap usage.
//! Collectors are synchronous and independent of each other; callers running
//! on the async runtime wrap them in `spawn_blocking`.

pub mod clock;
pub mod cpu;
pub mod memory;
pub mod netaddr;
pub mod thermal;

use std::process::Command;

use crate::error::SamplingError;

/// Runs an external command and returns its stdout as text.
pub(crate) fn run_command(program: &str, args: &[&str]) -> Result<String, SamplingError> {
    let command_line = if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    };

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| SamplingError::Spawn {
            command: command_line.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(SamplingError::Exit {
            command: command_line,
            status: output.status.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_missing_binary() {
        let result = run_command("rpi-metrics-no-such-binary", &["-x"]);
        assert!(matches!(result, Err(SamplingError::Spawn { .. })));
    }
}
