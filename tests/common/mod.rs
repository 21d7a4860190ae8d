//! Shared fixtures: fixed samplers, counting actions and a live server.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rpi_metrics::actions::SystemActions;
use rpi_metrics::collectors::memory::MemoryStats;
use rpi_metrics::config::{Config, RouteLimit};
use rpi_metrics::error::{ActionError, SamplingError};
use rpi_metrics::server::build_router;
use rpi_metrics::snapshot::Sampler;
use rpi_metrics::state::AppState;
use tokio::net::TcpListener;

pub const API_KEY: &str = "correct-horse";

/// Serves the same readings every time.
pub struct FixedSampler;

impl Sampler for FixedSampler {
    fn time(&self) -> String {
        "Oct 17 09:05:31".into()
    }

    fn network_address(&self) -> String {
        "192.168.1.42".into()
    }

    fn cpu_usage(&self) -> Result<u8, SamplingError> {
        Ok(7)
    }

    fn temperature(&self) -> Result<String, SamplingError> {
        Ok("48.3C".into())
    }

    fn memory(&self) -> Result<MemoryStats, SamplingError> {
        Ok(MemoryStats {
            total_ram_mib: 3792,
            used_ram_mib: 512,
            total_swap_mib: 100,
            used_swap_mib: 0,
        })
    }
}

/// Clock and address work, everything else fails.
pub struct BrokenSampler;

impl Sampler for BrokenSampler {
    fn time(&self) -> String {
        "Oct 17 09:05:31".into()
    }

    fn network_address(&self) -> String {
        String::new()
    }

    fn cpu_usage(&self) -> Result<u8, SamplingError> {
        Err(SamplingError::format("top -bn1", "no Cpu(s) line"))
    }

    fn temperature(&self) -> Result<String, SamplingError> {
        Err(SamplingError::format("vcgencmd measure_temp", "empty output"))
    }

    fn memory(&self) -> Result<MemoryStats, SamplingError> {
        Err(SamplingError::MissingField("MemTotal"))
    }
}

/// Counts invocations instead of touching the host.
#[derive(Default)]
pub struct CountingActions {
    pub shutdowns: AtomicUsize,
    pub updates: AtomicUsize,
    pub fail_second_update_step: bool,
}

impl CountingActions {
    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl SystemActions for CountingActions {
    fn shutdown(&self) -> Result<(), ActionError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update(&self) -> Vec<Result<(), ActionError>> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let second = if self.fail_second_update_step {
            Err(ActionError::Exit {
                command: "apt-get upgrade -y".into(),
                status: "exit status: 100".into(),
            })
        } else {
            Ok(())
        };
        vec![Ok(()), second]
    }
}

/// Config with the test secret and limits loose enough not to interfere.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.api_key = Some(API_KEY.into());
    let loose = RouteLimit {
        requests: 100,
        period_secs: 60,
    };
    let limits = &mut config.rate_limits;
    limits.time = loose;
    limits.mem = loose;
    limits.cpu = loose;
    limits.all = loose;
    limits.shutdown = loose;
    limits.update = loose;
    limits.dashboard = loose;
    config
}

/// Starts the router on an ephemeral port and returns its base URL.
pub async fn spawn_server(
    config: &Config,
    sampler: Arc<dyn Sampler>,
    actions: Arc<dyn SystemActions>,
) -> String {
    let state = Arc::new(AppState::new(config, sampler, actions));
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{addr}")
}
