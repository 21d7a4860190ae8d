//! rpi-metrics
//!
//! A small host-metrics service for single-board computers and the display
//! client that polls it.
//!
//! The server samples clock, network address, CPU utilisation, SoC
//! temperature and memory on every request and serves them as JSON. Two
//! privileged routes (`/api/shutdown`, `/api/update`) run host commands when
//! the caller presents the shared secret. Every route sits behind its own
//! per-client fixed-window rate limit.
//!
//! The client ([`client`]) keeps a network link up, fetches `/api/all` on a
//! fixed interval, renders the result on a 128x64 text display and turns two
//! push buttons into shutdown/update requests.

pub mod actions;
pub mod auth;
pub mod cli;
pub mod client;
pub mod collectors;
pub mod config;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod server;
pub mod snapshot;
pub mod startup_checks;
pub mod state;

use tracing::info;

use crate::cli::LogLevel;

/// Installs the global fmt subscriber. `LogLevel::Off` installs nothing.
pub fn setup_logging(level: LogLevel) {
    let Some(max_level) = level.as_level() else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", level);
}
