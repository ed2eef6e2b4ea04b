//! Error types for remote calls.

use thiserror::Error;

/// Errors from the reputation and firewall services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request to {service} failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RemoteError {
    pub(crate) fn transport(service: &'static str, err: reqwest::Error) -> Self {
        RemoteError::Transport {
            service,
            message: err.to_string(),
        }
    }
}
