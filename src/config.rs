//! Configuration management for rpi-metrics.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats. One file holds
//! both the server settings and the display client settings (`client:`).

use crate::cli::{Args, ClientArgs, ConfigFormat};
use crate::rate_limit::Quota;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7070;

const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/rpi-metrics/config.yaml",
    "/etc/rpi-metrics/config.yml",
    "/etc/rpi-metrics/config.json",
    "/etc/rpi-metrics/config.toml",
    "./rpi-metrics.yaml",
    "./rpi-metrics.yml",
    "./rpi-metrics.json",
    "./rpi-metrics.toml",
];

/// Requests allowed per window for one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteLimit {
    pub requests: u32,
    pub period_secs: u64,
}

impl RouteLimit {
    const fn new(requests: u32, period_secs: u64) -> Self {
        Self {
            requests,
            period_secs,
        }
    }

    pub fn quota(&self) -> Quota {
        Quota::new(self.requests, Duration::from_secs(self.period_secs))
    }
}

/// Per-route rate limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_read_limit")]
    pub time: RouteLimit,
    #[serde(default = "default_read_limit")]
    pub mem: RouteLimit,
    #[serde(default = "default_read_limit")]
    pub cpu: RouteLimit,
    #[serde(default = "default_all_limit")]
    pub all: RouteLimit,
    #[serde(default = "default_shutdown_limit")]
    pub shutdown: RouteLimit,
    #[serde(default = "default_update_limit")]
    pub update: RouteLimit,
    #[serde(default = "default_dashboard_limit")]
    pub dashboard: RouteLimit,
}

fn default_read_limit() -> RouteLimit {
    RouteLimit::new(15, 60)
}
fn default_all_limit() -> RouteLimit {
    RouteLimit::new(1, 1)
}
fn default_shutdown_limit() -> RouteLimit {
    RouteLimit::new(5, 3600)
}
fn default_update_limit() -> RouteLimit {
    RouteLimit::new(3, 3600)
}
fn default_dashboard_limit() -> RouteLimit {
    RouteLimit::new(1, 2)
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            time: default_read_limit(),
            mem: default_read_limit(),
            cpu: default_read_limit(),
            all: default_all_limit(),
            shutdown: default_shutdown_limit(),
            update: default_update_limit(),
            dashboard: default_dashboard_limit(),
        }
    }
}

impl RateLimitConfig {
    fn entries(&self) -> [(&'static str, &RouteLimit); 7] {
        [
            ("time", &self.time),
            ("mem", &self.mem),
            ("cpu", &self.cpu),
            ("all", &self.all),
            ("shutdown", &self.shutdown),
            ("update", &self.update),
            ("dashboard", &self.dashboard),
        ]
    }
}

/// Display client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the metrics server
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub wifi_ssid: Option<String>,
    #[serde(default)]
    pub wifi_psk: Option<String>,
    #[serde(default = "default_wifi_interface")]
    pub wifi_interface: String,
    /// Only wait for the interface link instead of joining a network
    #[serde(default)]
    pub skip_wifi_join: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Pause after a button-triggered request
    #[serde(default = "default_action_pause_ms")]
    pub action_pause_ms: u64,
    #[serde(default)]
    pub left_button_gpio: u32,
    #[serde(default = "default_right_button_gpio")]
    pub right_button_gpio: u32,
    #[serde(default = "default_gpio_root")]
    pub gpio_root: PathBuf,
}

fn default_server_url() -> String {
    format!("http://{}:{}", DEFAULT_BIND_ADDR, DEFAULT_PORT)
}
fn default_wifi_interface() -> String {
    "wlan0".into()
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_request_timeout_ms() -> u64 {
    5000
}
fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_action_pause_ms() -> u64 {
    2000
}
fn default_right_button_gpio() -> u32 {
    11
}
fn default_gpio_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}

impl ClientConfig {
    /// Fails when polling `/api/all` at this interval would exceed `limit`.
    /// Requests at least `period / requests` apart never share a window.
    pub fn check_pacing(&self, limit: &RouteLimit) -> Result<(), String> {
        if limit.requests == 0 {
            return Ok(());
        }
        let min_ms = limit.period_secs.saturating_mul(1000) / u64::from(limit.requests);
        if self.poll_interval_ms < min_ms {
            return Err(format!(
                "client.poll_interval_ms ({}) is shorter than rate_limits.all allows ({} ms between requests)",
                self.poll_interval_ms, min_ms
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_key: None,
            wifi_ssid: None,
            wifi_psk: None,
            wifi_interface: default_wifi_interface(),
            skip_wifi_join: false,
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            action_pause_ms: default_action_pause_ms(),
            left_button_gpio: 0,
            right_button_gpio: default_right_button_gpio(),
            gpio_root: default_gpio_root(),
        }
    }
}

/// Server configuration plus the client section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    /// Shared secret for /api/shutdown and /api/update
    #[serde(alias = "api-key")]
    pub api_key: Option<String>,

    /// Prefer CF-Connecting-IP over the peer address for rate limiting.
    /// Unset means trust it only on a loopback bind, where the peer is a
    /// local proxy; see [`Config::trusts_proxy_header`].
    #[serde(alias = "trust-proxy-header")]
    pub trust_proxy_header: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,

    // Privileged actions
    #[serde(alias = "shutdown-command")]
    pub shutdown_command: Option<Vec<String>>,
    #[serde(alias = "update-commands")]
    pub update_commands: Option<Vec<Vec<String>>>,

    #[serde(default, alias = "rate-limits")]
    pub rate_limits: RateLimitConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

pub fn default_shutdown_command() -> Vec<String> {
    ["sudo", "shutdown", "+1"].map(String::from).to_vec()
}

pub fn default_update_commands() -> Vec<Vec<String>> {
    vec![
        ["sudo", "apt-get", "update"].map(String::from).to_vec(),
        ["sudo", "apt-get", "upgrade", "-y"].map(String::from).to_vec(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            api_key: None,
            trust_proxy_header: None,
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
            shutdown_command: Some(default_shutdown_command()),
            update_commands: Some(default_update_commands()),
            rate_limits: RateLimitConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    /// Whether `CF-Connecting-IP` keys the rate limiter. Any client that can
    /// reach a public bind directly can pick its own header value, so
    /// without an explicit setting the header is honoured on loopback only.
    pub fn trusts_proxy_header(&self) -> bool {
        self.trust_proxy_header.unwrap_or_else(|| {
            self.bind
                .as_deref()
                .unwrap_or(DEFAULT_BIND_ADDR)
                .parse::<std::net::IpAddr>()
                .map(|ip| ip.is_loopback())
                .unwrap_or(false)
        })
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.port == Some(0) {
        return Err("port must be between 1 and 65535".into());
    }

    if let Some(bind) = cfg.bind.as_deref() {
        bind.parse::<std::net::IpAddr>()
            .map_err(|e| format!("Invalid bind address '{}': {}", bind, e))?;
    }

    for (route, limit) in cfg.rate_limits.entries() {
        if limit.requests == 0 || limit.period_secs == 0 {
            return Err(format!(
                "rate_limits.{} must allow at least one request per non-zero period",
                route
            )
            .into());
        }
    }

    cfg.client.check_pacing(&cfg.rate_limits.all)?;

    if cfg.shutdown_command.as_ref().is_some_and(|c| c.is_empty()) {
        return Err("shutdown_command must not be empty".into());
    }
    if let Some(steps) = &cfg.update_commands {
        if steps.is_empty() || steps.iter().any(|s| s.is_empty()) {
            return Err("update_commands must contain at least one non-empty command".into());
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("TLS {} file not found: {}", what, path).into())
        }
        Err(e) => Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into()),
    }
}

/// Resolves server configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(key) = &args.api_key {
        config.api_key = Some(key.clone());
    }
    if args.no_proxy_header {
        config.trust_proxy_header = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Resolves the display client settings. The client falls back to the
/// server's `api_key` when its own section does not set one.
pub fn resolve_client_config(args: &ClientArgs) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    let mut client = config.client;
    if client.api_key.is_none() {
        client.api_key = config.api_key;
    }

    if let Some(url) = &args.server_url {
        client.server_url = url.clone();
    }
    if let Some(key) = &args.api_key {
        client.api_key = Some(key.clone());
    }
    if let Some(ssid) = &args.wifi_ssid {
        client.wifi_ssid = Some(ssid.clone());
    }
    if let Some(psk) = &args.wifi_psk {
        client.wifi_psk = Some(psk.clone());
    }
    if let Some(iface) = &args.wifi_interface {
        client.wifi_interface = iface.clone();
    }
    if args.no_wifi_join {
        client.skip_wifi_join = true;
    }
    if let Some(ms) = args.interval_ms {
        client.poll_interval_ms = ms;
    }

    client.server_url = client.server_url.trim_end_matches('/').to_string();
    if client.server_url.is_empty() {
        return Err("client.server_url must not be empty".into());
    }
    if client.request_timeout_ms == 0 {
        return Err("client.request_timeout_ms must be greater than zero".into());
    }
    client.check_pacing(&config.rate_limits.all)?;

    Ok(client)
}

/// Loads a config file in any supported format; missing files yield defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        },
    };

    if !path.exists() {
        return Err(format!("Config file not found: {}", path.display()).into());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders a config in the requested format with secrets masked.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    let mut masked = config.clone();
    let mask = |key: &mut Option<String>| {
        if key.as_deref().is_some_and(|k| !k.is_empty()) {
            *key = Some("********".into());
        }
    };
    mask(&mut masked.api_key);
    mask(&mut masked.client.api_key);
    mask(&mut masked.client.wifi_psk);

    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&masked)?,
        ConfigFormat::Toml => toml::to_string_pretty(&masked)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&masked)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
