//! Route table and HTTP serving.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, MethodRouter},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::{Config, RouteLimit, DEFAULT_BIND_ADDR, DEFAULT_PORT};
use crate::handlers::{
    all_handler, cpu_handler, mem_handler, root_handler, shutdown_handler, time_handler,
    update_handler,
};
use crate::rate_limit::{enforce, RateLimiter, RouteGuard};
use crate::state::SharedState;

/// How often expired rate-limit windows are dropped.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Builds the router with every route behind its own rate limit.
pub fn build_router(state: SharedState) -> Router {
    let limits = &state.rate_limits;

    Router::new()
        .route(
            "/",
            limited(&state, "dashboard", &limits.dashboard, get(root_handler)),
        )
        .route(
            "/api/time",
            limited(&state, "time", &limits.time, get(time_handler)),
        )
        .route(
            "/api/mem",
            limited(&state, "mem", &limits.mem, get(mem_handler)),
        )
        .route(
            "/api/cpu",
            limited(&state, "cpu", &limits.cpu, get(cpu_handler)),
        )
        .route(
            "/api/all",
            limited(&state, "all", &limits.all, get(all_handler)),
        )
        .route(
            "/api/shutdown",
            limited(&state, "shutdown", &limits.shutdown, post(shutdown_handler)),
        )
        .route(
            "/api/update",
            limited(&state, "update", &limits.update, post(update_handler)),
        )
        .with_state(state.clone())
}

/// Puts `method_router` behind the rate limit of `route`.
fn limited(
    state: &SharedState,
    route: &'static str,
    limit: &RouteLimit,
    method_router: MethodRouter<SharedState>,
) -> MethodRouter<SharedState> {
    let guard = RouteGuard {
        route,
        quota: limit.quota(),
        limiter: state.limiter.clone(),
        trust_proxy_header: state.trust_proxy_header,
    };
    method_router.route_layer(from_fn_with_state(guard, enforce))
}

/// Periodically drops expired rate-limit windows.
pub fn spawn_limiter_pruning(limiter: Arc<RateLimiter>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = limiter.prune(Instant::now());
            if removed > 0 {
                debug!(
                    "Pruned {} expired rate-limit windows, {} still tracked",
                    removed,
                    limiter.tracked_clients()
                );
            }
        }
    })
}

/// Serves the router until `shutdown_signal` resolves.
pub async fn run<F>(
    config: &Config,
    state: SharedState,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let pruner = spawn_limiter_pruning(state.limiter.clone());
    let app = build_router(state);

    if config.enable_tls.unwrap_or(false) {
        // Paths are checked by validate_effective_config() before we get here
        let (Some(cert_path), Some(key_path)) =
            (config.tls_cert_path.as_ref(), config.tls_key_path.as_ref())
        else {
            return Err("TLS enabled without tls_cert_path/tls_key_path".into());
        };

        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        info!("rpi-metrics listening on https://{}:{}", bind_ip_str, port);

        let server = axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>());

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    pruner.abort();
                    return Err(e.into());
                }
            }
            _ = shutdown_signal => {
                info!("Shutdown signal received, exiting...");
            }
        }
    } else {
        let listener = TcpListener::bind(addr).await?;
        info!("rpi-metrics listening on http://{}:{}", bind_ip_str, port);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| {
            error!("Server error: {}", e);
            e
        })?;
    }

    pruner.abort();
    Ok(())
}
