//! CLI arguments for the metrics server and the display client.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::Level;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// CLI value, then the config file's `log_level`, then `fallback`.
    pub fn resolve(cli: Option<LogLevel>, configured: Option<&str>, fallback: LogLevel) -> LogLevel {
        cli.or_else(|| configured.and_then(|s| LogLevel::from_str(s, true).ok()))
            .unwrap_or(fallback)
    }

    /// Maximum tracing level, `None` when logging is off.
    pub fn as_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Metrics server arguments
#[derive(Parser, Debug)]
#[command(
    name = "rpi-metrics-server",
    about = "Serves live host metrics and shared-secret shutdown/update routes over HTTP",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Shared secret expected in the x-api-key header of privileged routes
    #[arg(long, env = "RPI_METRICS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Ignore CF-Connecting-IP and key rate limits on the peer address only.
    /// A trusted header lets anyone who reaches the port directly pick their
    /// own rate-limit key, so only trust it behind a proxy that overwrites it.
    /// Without this flag or trust_proxy_header the header is trusted on a
    /// loopback bind only.
    #[arg(long)]
    pub no_proxy_header: bool,

    /// Log level [default: info, or log_level from the config file]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample the host once and print the /api/all body
    Sample {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Generate a configuration file with default values
    Config {
        /// Output file path (stdout when omitted)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },
}

/// Display backend for the client
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DisplayKind {
    /// Redraw the 128x64 frame in the terminal
    Terminal,
    /// Emit every frame as a log line
    Log,
}

/// Display client arguments
#[derive(Parser, Debug)]
#[command(
    name = "rpi-metrics-client",
    about = "Polls a metrics server and renders the results on a small display",
    version
)]
pub struct ClientArgs {
    /// Base URL of the metrics server, e.g. http://192.168.1.10:7070
    #[arg(long, env = "RPI_METRICS_SERVER_URL")]
    pub server_url: Option<String>,

    /// Shared secret sent in the x-api-key header
    #[arg(long, env = "RPI_METRICS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Wi-Fi network to join before polling
    #[arg(long, env = "RPI_METRICS_WIFI_SSID")]
    pub wifi_ssid: Option<String>,

    /// Wi-Fi passphrase
    #[arg(long, env = "RPI_METRICS_WIFI_PSK", hide_env_values = true)]
    pub wifi_psk: Option<String>,

    /// Network interface to supervise
    #[arg(long)]
    pub wifi_interface: Option<String>,

    /// Do not join Wi-Fi, only wait for the interface link
    #[arg(long)]
    pub no_wifi_join: bool,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Display backend
    #[arg(long, value_enum, default_value = "terminal")]
    pub display: DisplayKind,

    /// Log level [default: warn]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,
}
