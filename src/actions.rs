//! Privileged host actions: scheduled shutdown and package update.
//!
//! Commands are plain argv lists from the configuration; by default
//! `sudo shutdown +1` and `sudo apt-get update` followed by
//! `sudo apt-get upgrade -y`. Update steps always all run, a failing step
//! does not stop the ones after it.

use std::process::Command;
use tracing::{debug, info, warn};

use crate::error::ActionError;

/// Privileged operations behind the authenticated routes.
pub trait SystemActions: Send + Sync + 'static {
    /// Schedules a shutdown.
    fn shutdown(&self) -> Result<(), ActionError>;

    /// Runs every update step in order, returning one result per step.
    fn update(&self) -> Vec<Result<(), ActionError>>;
}

/// Runs configured OS commands.
#[derive(Debug, Clone)]
pub struct CommandActions {
    shutdown: Vec<String>,
    update: Vec<Vec<String>>,
}

impl CommandActions {
    pub fn new(shutdown: Vec<String>, update: Vec<Vec<String>>) -> Self {
        Self { shutdown, update }
    }
}

impl SystemActions for CommandActions {
    fn shutdown(&self) -> Result<(), ActionError> {
        if self.shutdown.is_empty() {
            return Err(ActionError::NotConfigured("shutdown"));
        }
        run_step(&self.shutdown)
    }

    fn update(&self) -> Vec<Result<(), ActionError>> {
        if self.update.is_empty() {
            return vec![Err(ActionError::NotConfigured("update"))];
        }
        self.update.iter().map(|argv| run_step(argv)).collect()
    }
}

fn run_step(argv: &[String]) -> Result<(), ActionError> {
    let command_line = argv.join(" ");
    let (program, args) = argv
        .split_first()
        .ok_or(ActionError::NotConfigured("command"))?;

    info!("Running `{}`", command_line);
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| ActionError::Spawn {
            command: command_line.clone(),
            source,
        })?;

    debug!(
        "`{}` stdout: {}",
        command_line,
        String::from_utf8_lossy(&output.stdout).trim()
    );

    if output.status.success() {
        Ok(())
    } else {
        warn!(
            "`{}` failed with {}: {}",
            command_line,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Err(ActionError::Exit {
            command: command_line,
            status: output.status.to_string(),
        })
    }
}
