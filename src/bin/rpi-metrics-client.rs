//! rpi-metrics-client
//!
//! Polls a rpi-metrics server and renders the results on a 128x64 text
//! display. Two buttons send shutdown and update requests.

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::info;

use rpi_metrics::cli::{ClientArgs, DisplayKind, LogLevel};
use rpi_metrics::client::buttons::open_pin;
use rpi_metrics::client::{
    ClientApp, DisplaySurface, LinkSupervisor, LogDisplay, MetricsClient, NmcliLink,
    TerminalDisplay,
};
use rpi_metrics::config::resolve_client_config;
use rpi_metrics::setup_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = ClientArgs::parse();

    let config = resolve_client_config(&args).map_err(|e| anyhow!("{e}"))?;

    setup_logging(LogLevel::resolve(args.log_level, None, LogLevel::Warn));

    info!(
        "Starting rpi-metrics-client {} against {}",
        env!("CARGO_PKG_VERSION"),
        config.server_url
    );

    let api = MetricsClient::new(&config).context("Failed to build HTTP client")?;

    let display: Box<dyn DisplaySurface> = match args.display {
        DisplayKind::Terminal => Box::new(TerminalDisplay::stdout()),
        DisplayKind::Log => Box::new(LogDisplay::default()),
    };

    let link = LinkSupervisor::new(NmcliLink::from_config(&config));
    let shutdown_pin = open_pin(&config.gpio_root, config.left_button_gpio, "shutdown");
    let update_pin = open_pin(&config.gpio_root, config.right_button_gpio, "update");

    ClientApp::new(&config, api, display, link, shutdown_pin, update_pin)
        .run()
        .await;

    Ok(())
}
