//! Error types for the search client.
//!
//! # Design
//! Callers see two kinds of failure: a `Validation` error raised locally
//! before any I/O when a required argument is missing, and a `Transport`
//! error carrying the HTTP status and the message the server put in its
//! `{"error": ...}` envelope (or a synthesized status line). A 2xx body that
//! is not JSON is a defect and surfaces as `Json`, never as `Transport`.

use thiserror::Error;

/// Status reported for errors that did not come from a real HTTP response.
pub const DEFAULT_STATUS: u16 = 500;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by `ApiClient` and the endpoint groups.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required argument was absent; raised before touching the network.
    #[error("{message}")]
    Validation { message: String },

    /// The server answered with a non-2xx status, or the exchange itself
    /// failed.
    #[error("{message}")]
    Transport { message: String, status: u16 },

    /// A request body could not be encoded, or a successful response body
    /// was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Json,
}

impl ApiError {
    /// Build the error raised when an endpoint method is called without one of
    /// its required arguments.
    pub fn missing_parameter(param: &str, operation: &str) -> Self {
        ApiError::Validation {
            message: format!("Missing the required parameter `{param}` when calling `{operation}`"),
        }
    }

    pub fn transport(message: impl Into<String>, status: u16) -> Self {
        ApiError::Transport {
            message: message.into(),
            status,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Transport { .. } => ErrorKind::Transport,
            ApiError::Json(_) => ErrorKind::Json,
        }
    }

    /// HTTP status of the failing response, or 500 when the error was not
    /// derived from one.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Transport { status, .. } => *status,
            _ => DEFAULT_STATUS,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}
