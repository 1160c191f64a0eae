//! Error taxonomy for the monitor
//!
//! Every failure the presentation layer can observe maps onto one of these
//! variants. Messages are free text meant for direct display in a
//! notification; there are no structured error codes.

use thiserror::Error;
use tracing::{debug, warn};

/// Main error type shared by the client, push channels, UI services and pages
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The request never produced a response (DNS, connect, body read)
    #[error("{method} {path} failed: {message}")]
    Transport {
        method: String,
        path: String,
        message: String,
    },

    /// The server answered with a non-2xx status
    #[error("{method} {path} failed: HTTP {status}: {reason}")]
    HttpStatus {
        method: String,
        path: String,
        status: u16,
        reason: String,
    },

    /// The server answered `{success: false, error}`
    #[error("{0}")]
    Rejected(String),

    /// The payload did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// A render target does not exist on the surface
    #[error("Anchor not found: {0}")]
    MissingAnchor(String),

    /// Push-channel failures (open, read, closed inbox)
    #[error("Push channel error: {0}")]
    Push(String),

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local file output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Create a transport error
    pub fn transport<S: Into<String>>(method: &str, path: &str, message: S) -> Self {
        Self::Transport {
            method: method.to_string(),
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status<S: Into<String>>(method: &str, path: &str, status: u16, reason: S) -> Self {
        Self::HttpStatus {
            method: method.to_string(),
            path: path.to_string(),
            status,
            reason: reason.into(),
        }
    }

    /// Create a rejection from an `{success: false}` envelope
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::Rejected(message.into())
    }

    /// Create a decode error
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode(message.into())
    }

    /// Create a missing-anchor error
    pub fn missing_anchor<S: Into<String>>(anchor: S) -> Self {
        Self::MissingAnchor(anchor.into())
    }

    /// Create a push-channel error
    pub fn push<S: Into<String>>(message: S) -> Self {
        Self::Push(message.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// True when no HTTP response was received
    pub fn is_transport(&self) -> bool {
        matches!(self, MonitorError::Transport { .. })
    }

    /// True for non-2xx responses
    pub fn is_http_status(&self) -> bool {
        matches!(self, MonitorError::HttpStatus { .. })
    }

    /// Status code of an HTTP error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            MonitorError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text suitable for a notification: `"<context>: <detail>"`
    pub fn user_message(&self, context: &str) -> String {
        format!("{context}: {self}")
    }

    /// Log the error at a level matching its kind
    pub fn log_error(&self, context: &str) {
        match self {
            MonitorError::MissingAnchor(anchor) => {
                debug!(anchor = %anchor, "{context}: render target missing");
            }
            other => warn!(error = %other, "{context}"),
        }
    }
}

/// Result alias used across the workspace
pub type MonitorResult<T> = Result<T, MonitorError>;
