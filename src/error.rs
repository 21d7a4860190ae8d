//! Error types shared by the server and the display client.

use thiserror::Error;

/// Failure of a single host sampler.
///
/// Sampling errors never abort a response; handlers substitute
/// [`crate::snapshot::MISSING`] for the affected field.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Exit { command: String, status: String },

    #[error("unexpected output from {source_name}: {detail}")]
    Format { source_name: String, detail: String },

    #[error("field {0} missing from /proc/meminfo")]
    MissingField(&'static str),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SamplingError {
    pub fn format(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Format {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }
}

/// Failure of a privileged host action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Exit { command: String, status: String },

    #[error("no command configured for {0}")]
    NotConfigured(&'static str),

    #[error("action task failed: {0}")]
    Join(String),
}

/// Errors seen by the display client when talking to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("HTTP {code}: {body}")]
    HttpStatus { code: u16, body: String },

    #[error("malformed response body: {0}")]
    MalformedBody(String),

    #[error("rate limited by server")]
    RateLimited,

    #[error("unauthorized")]
    Unauthorized,
}

impl ClientError {
    /// Short text shown on the display in place of metrics.
    pub fn short_message(&self) -> String {
        match self {
            ClientError::Transport(_) => "Conn Err".to_string(),
            ClientError::HttpStatus { code, .. } => format!("HTTP {code}"),
            ClientError::MalformedBody(_) => "Invalid JSON".to_string(),
            ClientError::RateLimited => "HTTP 429".to_string(),
            ClientError::Unauthorized => "Unauthorized".to_string(),
        }
    }

    /// HTTP status behind the error, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::HttpStatus { code, .. } => Some(*code),
            ClientError::RateLimited => Some(429),
            ClientError::Unauthorized => Some(401),
            ClientError::Transport(_) | ClientError::MalformedBody(_) => None,
        }
    }

    /// Second display line under a failed action.
    pub fn detail(&self) -> &str {
        match self {
            ClientError::HttpStatus { body, .. } => body,
            ClientError::RateLimited => "Rate limited",
            ClientError::Unauthorized => "Unauthorized",
            ClientError::Transport(_) | ClientError::MalformedBody(_) => "",
        }
    }
}
