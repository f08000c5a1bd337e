//! Error types for the board client.

use std::collections::HashMap;

use thiserror::Error;

/// Field-level validation messages keyed by field name.
pub type FieldErrors = HashMap<String, Vec<String>>;

/// Failure of a token refresh.
///
/// This is `Clone` because a single refresh outcome is handed to every
/// request waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// No refresh token is stored; nothing to exchange.
    #[error("no refresh token available")]
    NoToken,

    /// The session was logged out or replaced while the refresh was in flight;
    /// its result was discarded.
    #[error("session changed during token refresh")]
    Superseded,

    /// The refresh endpoint was unreachable or refused the token.
    #[error("refresh rejected: {message}")]
    RemoteRejected {
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
    },
}

/// Common error type for the board client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network or HTTP transport error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Json(String),

    /// Credentials were rejected at sign-in.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Input was rejected, locally or by the server.
    #[error("validation error: {}", format_fields(.0))]
    Validation(FieldErrors),

    /// Token refresh failed; the session has been cleared.
    #[error("session expired: {0}")]
    Refresh(#[from] RefreshError),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Any other non-success status from the API.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether the caller should send the user back to sign-in.
    pub fn requires_signin(&self) -> bool {
        matches!(self, ClientError::Refresh(_))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Json(e.to_string())
    }
}

fn format_fields(fields: &FieldErrors) -> String {
    let mut names: Vec<&String> = fields.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| format!("{}: {}", name, fields[name].join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for board client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
