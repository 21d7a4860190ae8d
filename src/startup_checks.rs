//! Startup requirement validation for the metrics server.
//!
//! Nothing here is fatal. The server still starts, but the log explains which
//! routes will not work on this host.

use nix::unistd::geteuid;
use std::path::Path;
use tracing::{info, warn};
use which::which;

use crate::config::{default_shutdown_command, default_update_commands, Config};

/// Tools the samplers shell out to.
const SAMPLER_TOOLS: &[&str] = &["hostname", "top"];

/// Logs warnings about missing tools, privileges and secrets.
pub fn validate_requirements(config: &Config) {
    info!("🔍 Validating runtime requirements...");

    if config.api_key.as_deref().map_or(true, str::is_empty) {
        warn!("⚠️  No api_key configured - /api/shutdown and /api/update will reject every request");
        warn!("   Set api_key in the config file or RPI_METRICS_API_KEY");
    }

    for tool in SAMPLER_TOOLS {
        if which(tool).is_err() {
            warn!("⚠️  `{}` not found in PATH - related metrics will report N/A", tool);
        }
    }

    if !Path::new("/proc/meminfo").exists() {
        warn!("⚠️  /proc/meminfo not available - memory metrics will report N/A");
    }

    let shutdown = config
        .shutdown_command
        .clone()
        .unwrap_or_else(default_shutdown_command);
    let update = config
        .update_commands
        .clone()
        .unwrap_or_else(default_update_commands);

    let uses_sudo = std::iter::once(&shutdown)
        .chain(update.iter())
        .any(|argv| argv.first().is_some_and(|p| p == "sudo"));

    if geteuid().is_root() {
        info!("✅ Running as root (uid=0)");
    } else if uses_sudo && which("sudo").is_err() {
        warn!("⚠️  Not running as root and sudo is missing - privileged actions will fail");
    } else if uses_sudo {
        info!("Privileged actions run through sudo; make sure it does not prompt for a password");
    }

    for argv in std::iter::once(&shutdown).chain(update.iter()) {
        if let Some(program) = argv.first() {
            if which(program).is_err() {
                warn!("⚠️  `{}` not found in PATH - `{}` will fail", program, argv.join(" "));
            }
        }
    }
}
