//! HTTP endpoint handlers for the server.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: Dashboard page
//! - `/api/time`, `/api/mem`, `/api/cpu`, `/api/all`: Host metrics as JSON
//! - `/api/shutdown`, `/api/update`: Privileged actions (shared secret)

pub mod control;
pub mod metrics;
pub mod root;

// Re-export handlers
pub use control::{shutdown_handler, update_handler};
pub use metrics::{all_handler, cpu_handler, mem_handler, time_handler};
pub use root::root_handler;
