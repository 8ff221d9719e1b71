//! Store error type.
//!
//! Transport failures surface with the upstream numeric status when the
//! cluster returned one; logical not-found outcomes are NOT errors here —
//! the adapter translates them into in-band results (`GetResult::found`,
//! `DeleteOutcome::NotFound`).

use thiserror::Error;

/// Errors from document store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The cluster could not be reached or replied with a failure status.
    #[error("search cluster transport error{}: {message}", status_suffix(.status))]
    Transport {
        /// Upstream HTTP status, when one was received.
        status: Option<u16>,
        message: String,
    },

    /// The cluster replied with a body the adapter could not decode.
    #[error("failed to decode search cluster response: {0}")]
    Response(String),

    /// The client could not be constructed from the supplied configuration.
    #[error("invalid search cluster configuration: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

impl StoreError {
    /// Create a transport error with a known upstream status.
    pub fn transport(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a transport error without an upstream status.
    pub fn transport_unknown(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Create a response-decoding error.
    pub fn response(message: impl Into<String>) -> Self {
        Self::Response(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Upstream status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<opensearch::Error> for StoreError {
    fn from(err: opensearch::Error) -> Self {
        Self::Transport {
            status: err.status_code().map(|code| code.as_u16()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_displays_status_when_known() {
        let err = StoreError::transport(503, "service unavailable");
        assert_eq!(
            err.to_string(),
            "search cluster transport error (status 503): service unavailable"
        );
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn transport_error_without_status() {
        let err = StoreError::transport_unknown("connection refused");
        assert_eq!(
            err.to_string(),
            "search cluster transport error: connection refused"
        );
        assert_eq!(err.status(), None);
    }
}
