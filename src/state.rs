//! Application state management for the server.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers. Nothing in it changes per request except the
//! rate limiter's counters.

use std::sync::Arc;
use std::time::Instant;

use crate::actions::{CommandActions, SystemActions};
use crate::config::{default_shutdown_command, default_update_commands, Config, RateLimitConfig};
use crate::rate_limit::RateLimiter;
use crate::snapshot::{HostSampler, Sampler};

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// State shared across requests.
pub struct AppState {
    pub sampler: Arc<dyn Sampler>,
    pub actions: Arc<dyn SystemActions>,
    /// Shared secret for privileged routes; `None` refuses them all.
    pub api_key: Option<String>,
    pub limiter: Arc<RateLimiter>,
    pub rate_limits: RateLimitConfig,
    pub trust_proxy_header: bool,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Builds state that samples this host and runs configured commands.
    pub fn from_config(config: &Config) -> Self {
        let actions = CommandActions::new(
            config
                .shutdown_command
                .clone()
                .unwrap_or_else(default_shutdown_command),
            config
                .update_commands
                .clone()
                .unwrap_or_else(default_update_commands),
        );

        Self::new(config, Arc::new(HostSampler), Arc::new(actions))
    }

    pub fn new(
        config: &Config,
        sampler: Arc<dyn Sampler>,
        actions: Arc<dyn SystemActions>,
    ) -> Self {
        Self {
            sampler,
            actions,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            limiter: Arc::new(RateLimiter::new()),
            rate_limits: config.rate_limits.clone(),
            trust_proxy_header: config.trusts_proxy_header(),
            start_time: Instant::now(),
        }
    }
}
