//! Network link supervision for the display client.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::display::{DisplaySurface, Screen};
use crate::collectors::netaddr::sample_network_address;
use crate::config::ClientConfig;

/// Wait between link checks while connecting.
pub const LINK_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Failed checks before the join is issued again.
const REJOIN_AFTER_CHECKS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Something that can bring a network link up and report on it.
pub trait NetworkLink {
    /// Starts joining the network. Returning does not mean the link is up.
    fn join(&mut self) -> anyhow::Result<()>;
    fn is_connected(&mut self) -> bool;
}

/// Wi-Fi through NetworkManager, link state from sysfs.
pub struct NmcliLink {
    interface: String,
    ssid: Option<String>,
    psk: Option<String>,
    skip_join: bool,
    operstate: PathBuf,
}

impl NmcliLink {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            interface: config.wifi_interface.clone(),
            ssid: config.wifi_ssid.clone(),
            psk: config.wifi_psk.clone(),
            skip_join: config.skip_wifi_join,
            operstate: PathBuf::from(format!(
                "/sys/class/net/{}/operstate",
                config.wifi_interface
            )),
        }
    }

    /// The passphrase is never part of the argv; with `--ask` nmcli reads
    /// it from stdin.
    fn join_args(&self, ssid: &str) -> Vec<String> {
        let mut args = Vec::new();
        if self.psk.is_some() {
            args.push("--ask".to_string());
        }
        args.extend(
            ["device", "wifi", "connect", ssid, "ifname", self.interface.as_str()]
                .map(String::from),
        );
        args
    }
}

/// Runs `program`, feeding `secret` on stdin, and fails on a non-zero exit.
fn run_with_secret(program: &str, args: &[String], secret: Option<&str>) -> anyhow::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        if let Some(secret) = secret {
            writeln!(stdin, "{secret}")?;
        }
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        anyhow::bail!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

impl NetworkLink for NmcliLink {
    fn join(&mut self) -> anyhow::Result<()> {
        if self.skip_join {
            return Ok(());
        }
        let Some(ssid) = self.ssid.as_deref() else {
            debug!("No wifi_ssid configured, waiting for {} to come up", self.interface);
            return Ok(());
        };

        info!("Joining {} on {}", ssid, self.interface);
        run_with_secret("nmcli", &self.join_args(ssid), self.psk.as_deref())
    }

    fn is_connected(&mut self) -> bool {
        fs::read_to_string(&self.operstate)
            .map(|s| s.trim() == "up")
            .unwrap_or(false)
    }
}

/// Drives a [`NetworkLink`] through [`LinkState`] and keeps the display
/// informed while the link is down.
pub struct LinkSupervisor<L: NetworkLink> {
    link: L,
    state: LinkState,
    retry_delay: Duration,
}

impl<L: NetworkLink> LinkSupervisor<L> {
    pub fn new(link: L) -> Self {
        Self::with_retry_delay(link, LINK_RETRY_DELAY)
    }

    pub fn with_retry_delay(link: L, retry_delay: Duration) -> Self {
        Self {
            link,
            state: LinkState::Disconnected,
            retry_delay,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Returns once the link is up. A link that dropped since the last call
    /// goes back through `Connecting`, join included.
    pub async fn ensure_connected(&mut self, display: &mut dyn DisplaySurface) {
        if self.state == LinkState::Connected {
            if self.link.is_connected() {
                return;
            }
            warn!("Network link lost, reconnecting");
            self.state = LinkState::Disconnected;
        }

        self.state = LinkState::Connecting;
        if let Err(e) = Screen::awaiting_network().draw(display) {
            debug!("Display error: {}", e);
        }

        let mut checks = 0;
        loop {
            if checks % REJOIN_AFTER_CHECKS == 0 {
                if let Err(e) = self.link.join() {
                    warn!("Network join failed: {}", e);
                }
            }
            if self.link.is_connected() {
                break;
            }
            checks += 1;
            tokio::time::sleep(self.retry_delay).await;
        }

        self.state = LinkState::Connected;
        info!("Network connected, address: {}", sample_network_address());
        if let Err(e) = Screen::connected().draw(display) {
            debug!("Display error: {}", e);
        }
    }
}
