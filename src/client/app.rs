//! The display client's main loop.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::api::MetricsClient;
use super::buttons::{Button, Pin};
use super::display::{DisplaySurface, Screen};
use super::link::{LinkSupervisor, NetworkLink};
use crate::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shutdown,
    Update,
}

/// Owns every client resource; one task drives it.
pub struct ClientApp<D, L, P>
where
    D: DisplaySurface,
    L: NetworkLink,
    P: Pin,
{
    api: MetricsClient,
    display: D,
    link: LinkSupervisor<L>,
    shutdown_button: Button<P>,
    update_button: Button<P>,
    poll_interval: Duration,
    action_pause: Duration,
}

impl<D, L, P> ClientApp<D, L, P>
where
    D: DisplaySurface,
    L: NetworkLink,
    P: Pin,
{
    pub fn new(
        config: &ClientConfig,
        api: MetricsClient,
        display: D,
        link: LinkSupervisor<L>,
        shutdown_pin: P,
        update_pin: P,
    ) -> Self {
        Self {
            api,
            display,
            link,
            shutdown_button: Button::new("shutdown", shutdown_pin),
            update_button: Button::new("update", update_pin),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            action_pause: Duration::from_millis(config.action_pause_ms),
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Wait between the end of one tick and the start of the next.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Polls forever at the configured interval.
    pub async fn run(mut self) {
        info!(
            "Polling {} every {:?}",
            self.api.base_url(),
            self.poll_interval
        );
        loop {
            self.tick().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One iteration: link check, fetch, render, buttons.
    pub async fn tick(&mut self) {
        self.link.ensure_connected(&mut self.display).await;

        let screen = match self.api.fetch_all().await {
            Ok(data) => Screen::metrics(&data),
            Err(e) => {
                warn!("Fetching metrics failed: {}", e);
                Screen::fetch_error(&e)
            }
        };
        self.show(&screen);

        if self.shutdown_button.poll() {
            self.perform(Action::Shutdown).await;
        }
        if self.update_button.poll() {
            self.perform(Action::Update).await;
        }
    }

    /// Sends one privileged request and leaves its outcome on screen for
    /// the action pause.
    pub async fn perform(&mut self, action: Action) {
        info!("{:?} button pressed", action);

        let outcome = match action {
            Action::Shutdown => {
                self.show(&Screen::sending_shutdown());
                self.api
                    .send_shutdown()
                    .await
                    .map(|_| Screen::shutdown_accepted())
            }
            Action::Update => {
                self.show(&Screen::sending_update());
                self.api
                    .send_update()
                    .await
                    .map(|_| Screen::update_accepted())
            }
        };

        let screen = outcome.unwrap_or_else(|e| {
            warn!("{:?} request failed: {}", action, e);
            Screen::action_failed(&e)
        });
        self.show(&screen);

        tokio::time::sleep(self.action_pause).await;
    }

    fn show(&mut self, screen: &Screen) {
        if let Err(e) = screen.draw(&mut self.display) {
            debug!("Display error: {}", e);
        }
    }
}
