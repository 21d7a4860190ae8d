//! rpi-metrics-server
//!
//! Serves live host metrics of a single-board computer as JSON, a small
//! dashboard page, and shared-secret shutdown/update routes.

use clap::Parser;
use std::fs;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use rpi_metrics::cli::{Args, Commands, LogLevel};
use rpi_metrics::config::{
    render_config, resolve_config, show_config, validate_effective_config, Config,
};
use rpi_metrics::snapshot::{AllMetrics, HostSampler, Sampler};
use rpi_metrics::state::AppState;
use rpi_metrics::{server, setup_logging, startup_checks};

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Prints one /api/all body sampled from this host.
fn command_sample(pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let body = AllMetrics::from(HostSampler.snapshot());
    let out = if pretty {
        serde_json::to_string_pretty(&body)?
    } else {
        serde_json::to_string(&body)?
    };
    println!("{out}");
    Ok(())
}

/// Writes a default configuration file.
fn command_config(
    output: Option<&std::path::Path>,
    format: rpi_metrics::cli::ConfigFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let rendered = render_config(&Config::default(), format)?;
    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            println!("✅ Wrote default configuration to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    if let Some(command) = &args.command {
        return match command {
            Commands::Sample { pretty } => command_sample(*pretty),
            Commands::Config { output, format } => command_config(output.as_deref(), *format),
        };
    }

    let config = load_validated_config(&args)?;

    setup_logging(LogLevel::resolve(
        args.log_level,
        config.log_level.as_deref(),
        LogLevel::Info,
    ));

    info!("Starting rpi-metrics-server {}", env!("CARGO_PKG_VERSION"));

    startup_checks::validate_requirements(&config);

    let state = Arc::new(AppState::from_config(&config));

    server::run(&config, state, shutdown_signal()).await?;

    info!("rpi-metrics-server stopped gracefully");
    Ok(())
}
