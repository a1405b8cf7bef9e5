use std::time::Duration;
use thiserror::Error;

/// The call could not complete: network failure, unexpected HTTP status or an unreadable body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Outcome of a gateway-mediated call that did not yield a payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0}")]
    Transport(String),
    /// The backend answered with `success: false`; the message is shown verbatim.
    #[error("{0}")]
    Application(String),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("request cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Timeouts and cancellations count as transport failures.
    pub fn is_transport(&self) -> bool {
        !matches!(self, GatewayError::Application(_))
    }
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        GatewayError::Transport(err.message)
    }
}
