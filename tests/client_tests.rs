//! Display client tests against a live server.

mod common;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use common::{spawn_server, test_config, CountingActions, FixedSampler, API_KEY};
use rpi_metrics::client::buttons::Pin;
use rpi_metrics::client::{ClientApp, FrameBuffer, LinkSupervisor, MetricsClient, NetworkLink};
use rpi_metrics::config::{ClientConfig, Config, RouteLimit};
use rpi_metrics::error::ClientError;
use tokio::net::TcpListener;

struct AlwaysUp;

impl NetworkLink for AlwaysUp {
    fn join(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        true
    }
}

/// Pressed for the first `n` reads.
struct PressedFor(u32);

impl Pin for PressedFor {
    fn is_low(&mut self) -> io::Result<bool> {
        if self.0 > 0 {
            self.0 -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

fn client_config(server_url: String) -> ClientConfig {
    ClientConfig {
        server_url,
        api_key: Some(API_KEY.into()),
        action_pause_ms: 0,
        ..ClientConfig::default()
    }
}

fn app(
    config: &ClientConfig,
    shutdown: PressedFor,
    update: PressedFor,
) -> ClientApp<FrameBuffer, AlwaysUp, PressedFor> {
    ClientApp::new(
        config,
        MetricsClient::new(config).unwrap(),
        FrameBuffer::new(),
        LinkSupervisor::with_retry_delay(AlwaysUp, Duration::from_millis(1)),
        shutdown,
        update,
    )
}

/// A URL nothing listens on.
async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn fixed_server() -> (String, Arc<CountingActions>) {
    let actions = Arc::new(CountingActions::default());
    let url = spawn_server(&test_config(), Arc::new(FixedSampler), actions.clone()).await;
    (url, actions)
}

#[tokio::test]
async fn test_fetch_all_decodes_snapshot() {
    let (url, _) = fixed_server().await;
    let client = MetricsClient::new(&client_config(url)).unwrap();

    let data = client.fetch_all().await.unwrap();
    assert_eq!(data.cpu_usage, "7%");
    assert_eq!(data.total_ram, "3792MiB");
    assert_eq!(data.used_ram, "512");
}

#[tokio::test]
async fn test_fetch_all_maps_errors() {
    let client = MetricsClient::new(&client_config(dead_url().await)).unwrap();
    assert!(matches!(
        client.fetch_all().await,
        Err(ClientError::Transport(_))
    ));

    let app = Router::new()
        .route("/api/all", get(|| async { "{\"Current Time\": \"Oct" }))
        .route("/api/cpu", get(|| async { "{}" }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let client = MetricsClient::new(&client_config(format!("http://{addr}"))).unwrap();
    assert!(matches!(
        client.fetch_all().await,
        Err(ClientError::MalformedBody(_))
    ));

    // No privileged routes on this server
    match client.send_shutdown().await {
        Err(ClientError::HttpStatus { code, .. }) => assert_eq!(code, 404),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_tick_renders_five_lines() {
    let (url, actions) = fixed_server().await;
    let mut app = app(&client_config(url), PressedFor(0), PressedFor(0));

    app.tick().await;

    let lines = app.display().lines();
    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines.iter().map(|l| l.y).collect::<Vec<_>>(),
        vec![0, 12, 26, 38, 50]
    );
    assert_eq!(
        app.display().texts(),
        vec![
            "Oct 17 09:05:31",
            "192.168.1.42",
            "CPU: 7% 48.3C",
            "RAM: 512/3792MiB",
            "VM: 0/100MiB",
        ]
    );
    assert_eq!(actions.shutdown_count(), 0);
}

#[tokio::test]
async fn test_unreachable_server_shows_one_error_line() {
    let mut app = app(&client_config(dead_url().await), PressedFor(0), PressedFor(0));

    app.tick().await;

    assert_eq!(app.display().texts(), vec!["Conn Err"]);
}

#[tokio::test]
async fn test_rate_limited_fetch_is_reported() {
    let mut config = test_config();
    config.rate_limits.all = RouteLimit {
        requests: 1,
        period_secs: 60,
    };
    let url = spawn_server(&config, Arc::new(FixedSampler), Arc::new(CountingActions::default())).await;
    let mut app = app(&client_config(url), PressedFor(0), PressedFor(0));

    app.tick().await;
    assert_eq!(app.display().lines().len(), 5);

    app.tick().await;
    assert_eq!(app.display().texts(), vec!["HTTP 429"]);
}

#[tokio::test]
async fn test_default_client_stays_within_default_limits() {
    let server_config = Config {
        api_key: Some(API_KEY.into()),
        ..Config::default()
    };
    let actions = Arc::new(CountingActions::default());
    let url = spawn_server(&server_config, Arc::new(FixedSampler), actions).await;

    let config = ClientConfig {
        server_url: url,
        ..ClientConfig::default()
    };
    let mut app = app(&config, PressedFor(0), PressedFor(0));

    for _ in 0..3 {
        app.tick().await;
        let texts = app.display().texts();
        assert_eq!(texts.len(), 5, "unexpected frame: {texts:?}");
        assert!(!texts.iter().any(|t| t.contains("429")));
        tokio::time::sleep(app.poll_interval()).await;
    }
}

#[tokio::test]
async fn test_shutdown_button_sends_one_request() {
    let (url, actions) = fixed_server().await;
    // Held across three polls
    let mut app = app(&client_config(url), PressedFor(3), PressedFor(0));

    app.tick().await;
    assert_eq!(app.display().texts(), vec!["Server shutting", "down in 1 min"]);

    app.tick().await;
    app.tick().await;
    assert_eq!(actions.shutdown_count(), 1);
    assert_eq!(actions.update_count(), 0);
}

#[tokio::test]
async fn test_update_button_posts_to_update_route() {
    let (url, actions) = fixed_server().await;
    let mut app = app(&client_config(url), PressedFor(0), PressedFor(1));

    app.tick().await;

    assert_eq!(app.display().texts(), vec!["Server is", "updating..."]);
    assert_eq!(actions.update_count(), 1);
    assert_eq!(actions.shutdown_count(), 0);
}

#[tokio::test]
async fn test_wrong_key_shows_http_status() {
    let (url, actions) = fixed_server().await;
    let config = ClientConfig {
        api_key: Some("guess".into()),
        ..client_config(url)
    };
    let mut app = app(&config, PressedFor(1), PressedFor(0));

    app.tick().await;

    assert_eq!(app.display().texts(), vec!["FAILED: HTTP 401", "Unauthorized"]);
    assert_eq!(actions.shutdown_count(), 0);
}

#[tokio::test]
async fn test_action_transport_error() {
    let mut app = app(&client_config(dead_url().await), PressedFor(1), PressedFor(0));

    app.tick().await;

    assert_eq!(
        app.display().texts(),
        vec!["Error occurred", "when sending req"]
    );
}
